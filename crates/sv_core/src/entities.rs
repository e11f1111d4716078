//! crates/sv_core/src/entities.rs
//! Domain entities: events, bodies, applications, and the two vote records.
//!
//! Wire tokens (datastore strings and JSON) are fixed per enum below; they are
//! the same strings the core membership service and the statutory frontend use.

use alloc::vec;
use alloc::vec::Vec;
use alloc::string::String;
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::CoreError;
use crate::ids::{ApplicationId, BodyId, EventId, UserId};

/// Define a closed enum with explicit wire tokens (Display/FromStr + optional serde).
macro_rules! token_enum {
    ($(#[$m:meta])* $name:ident => { $($variant:ident = $token:expr),+ $(,)? }) => {
        $(#[$m])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub enum $name {
            $(
                #[cfg_attr(feature = "serde", serde(rename = $token))]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[inline]
            pub fn as_str(self) -> &'static str {
                match self { $($name::$variant => $token),+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }

        impl FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok($name::$variant),)+
                    _ => Err(CoreError::InvalidToken),
                }
            }
        }
    };
}

token_enum!(
    /// Event category. Only `agora` (the statutory assembly) weighs votes by membership.
    EventType => {
        Agora = "agora",
        Epm = "epm",
        Spm = "spm",
    }
);

impl EventType {
    #[inline]
    pub fn is_assembly(self) -> bool {
        matches!(self, EventType::Agora)
    }
}

token_enum!(
    /// Body category as reported by the core service.
    BodyType => {
        Antenna = "antenna",
        ContactAntenna = "contact antenna",
        Contact = "contact",
        WorkingGroup = "working group",
        Committee = "committee",
        Project = "project",
        Partner = "partner",
        Other = "other",
    }
);

impl BodyType {
    #[inline]
    pub fn is_antenna(self) -> bool {
        matches!(self, BodyType::Antenna)
    }
}

token_enum!(
    ParticipantType => {
        Delegate = "delegate",
        Envoy = "envoy",
        Visitor = "visitor",
        Observer = "observer",
    }
);

token_enum!(
    /// The two parallel vote distributions kept per body.
    DistributionType => {
        OnEvent = "on-event",
        OffEvent = "off-event",
    }
);

impl DistributionType {
    /// Eligibility filter for this distribution.
    ///
    /// - off-event: confirmed, non-cancelled delegates.
    /// - on-event: the same, additionally registered on-site and not departed.
    pub fn admits(self, app: &Application) -> bool {
        let confirmed_delegate = app.participant_type == Some(ParticipantType::Delegate)
            && !app.cancelled
            && app.confirmed;
        match self {
            DistributionType::OffEvent => confirmed_delegate,
            DistributionType::OnEvent => confirmed_delegate && app.registered && !app.departed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    pub id: EventId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub event_type: EventType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Body {
    pub id: BodyId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub body_type: BodyType,
}

/// An applicant's registration for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Application {
    pub id: ApplicationId,
    pub event_id: EventId,
    pub user_id: UserId,
    pub body_id: BodyId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub participant_type: Option<ParticipantType>,
    /// Rank among the body's delegates, 1-based.
    #[cfg_attr(feature = "serde", serde(default))]
    pub participant_order: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cancelled: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub confirmed: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub registered: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub departed: bool,
}

/// Partial update of an application. `None` leaves a field untouched; for the
/// nullable fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct ApplicationPatch {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub body_id: Option<BodyId>,
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "deserialize_present", skip_serializing_if = "Option::is_none")
    )]
    pub participant_type: Option<Option<ParticipantType>>,
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "deserialize_present", skip_serializing_if = "Option::is_none")
    )]
    pub participant_order: Option<Option<u32>>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub cancelled: Option<bool>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub confirmed: Option<bool>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub registered: Option<bool>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub departed: Option<bool>,
}

/// A present JSON key (even `null`) becomes `Some(..)`; an absent key stays `None`.
#[cfg(feature = "serde")]
fn deserialize_present<'de, T, D>(d: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(d).map(Some)
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        *self == ApplicationPatch::default()
    }
}

impl Application {
    /// Return a copy with `patch` applied. Rejects a participant order of 0.
    pub fn apply(&self, patch: &ApplicationPatch) -> Result<Application, CoreError> {
        let mut next = self.clone();
        if let Some(body_id) = patch.body_id {
            next.body_id = body_id;
        }
        if let Some(pt) = patch.participant_type {
            next.participant_type = pt;
        }
        if let Some(order) = patch.participant_order {
            if order == Some(0) {
                return Err(CoreError::InvalidOrder);
            }
            next.participant_order = order;
        }
        if let Some(v) = patch.cancelled {
            next.cancelled = v;
        }
        if let Some(v) = patch.confirmed {
            next.confirmed = v;
        }
        if let Some(v) = patch.registered {
            next.registered = v;
        }
        if let Some(v) = patch.departed {
            next.departed = v;
        }
        Ok(next)
    }

    /// Fields that feed the delegate eligibility filters and roster order.
    fn vote_inputs(&self) -> (Option<ParticipantType>, Option<u32>, bool, bool, bool, bool) {
        (
            self.participant_type,
            self.participant_order,
            self.cancelled,
            self.confirmed,
            self.registered,
            self.departed,
        )
    }

    /// Whether this application counts in *some* distribution right now.
    pub fn is_vote_eligible(&self) -> bool {
        DistributionType::ALL.iter().any(|d| d.admits(self))
    }
}

/// Bodies whose votes must be recomputed after `before` became `after`.
///
/// A transfer touches both bodies (old first). Otherwise the single body is
/// returned when any eligibility/order input changed, and nothing when not.
pub fn affected_bodies(before: &Application, after: &Application) -> Vec<BodyId> {
    if before.body_id != after.body_id {
        return vec![before.body_id, after.body_id];
    }
    if before.vote_inputs() != after.vote_inputs() {
        vec![after.body_id]
    } else {
        Vec::new()
    }
}

/// Voting weight of one body at one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AntennaVoteRecord {
    pub event_id: EventId,
    pub body_id: BodyId,
    pub votes: u32,
}

/// One delegate's share of the body's weight within one distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DelegateVoteRecord {
    pub event_id: EventId,
    pub body_id: BodyId,
    pub application_id: ApplicationId,
    pub user_id: UserId,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub distribution: DistributionType,
    pub votes: u32,
}
