//! sv_core: Core ids, entities, and ordering helpers for vote apportionment.
//!
//! This crate is **I/O-free**. It defines stable types used across the
//! workspace (`sv_algo`, `sv_io`, `sv_pipeline`, `sv_report`, `sv_cli`).
//!
//! - Row ids: `EventId`, `BodyId`, `ApplicationId`, `UserId`
//! - Categories: `EventType`, `BodyType`, `ParticipantType`, `DistributionType`
//! - Applications, patches, and the bodies a patch touches
//! - Deterministic delegate roster ordering
//!
//! Serialization derives are gated behind the `serde` feature.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain validation & parsing.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidId,
        InvalidToken,
        InvalidOrder,
        DomainOutOfRange(&'static str),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidId => write!(f, "invalid id"),
                CoreError::InvalidToken => write!(f, "invalid token"),
                CoreError::InvalidOrder => write!(f, "participant order must be >= 1"),
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
            }
        }
    }

    #[cfg(feature = "std")]
    impl std::error::Error for CoreError {}
}

pub mod ids;
pub mod entities;
pub mod determinism;

pub use errors::CoreError;
pub use determinism::{sort_roster_canonical, RosterEntry, StableOrd};
pub use ids::{ApplicationId, BodyId, EventId, UserId};
pub use entities::{
    affected_bodies, AntennaVoteRecord, Application, ApplicationPatch, Body, BodyType, DelegateVoteRecord,
    DistributionType, Event, EventType, ParticipantType,
};
