//! sv_report: per-event vote report (model, builder, renderer).
//!
//! Rules:
//! - Read-only. The report reflects what is persisted; nothing is recomputed.
//! - Bodies appear in ascending id; delegate lines in application id order.
//! - Stable section order and field names (JSON keeps struct order).

#![deny(unsafe_code)]

use rusqlite::Connection;
use serde::Serialize;
use sv_core::{ApplicationId, BodyId, BodyType, DelegateVoteRecord, DistributionType, EventId, EventType, UserId};
use sv_io::{directory, membership, votes, IoError};
use thiserror::Error;

pub mod render_json;

pub use render_json::{render_json, to_json_value};

// ===== Errors =====
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Store(#[from] IoError),
    #[error("render: {0}")]
    Render(String),
}

// ===== Model =====
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VotesReport {
    pub cover: SectionCover,
    pub bodies: Vec<BodySection>,
    pub totals: SectionTotals,
    pub consistency: SectionConsistency,
    pub integrity: SectionIntegrity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SectionCover {
    pub event_id: EventId,
    pub event_name: String,
    pub event_type: EventType,
    /// Whether this event type weighs votes by membership at all.
    pub weighted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DelegateLine {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub votes: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BodySection {
    pub body_id: BodyId,
    pub name: String,
    pub body_type: BodyType,
    pub member_count: Option<u32>,
    pub antenna_votes: u32,
    pub on_event: Vec<DelegateLine>,
    pub off_event: Vec<DelegateLine>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SectionTotals {
    pub bodies: usize,
    pub antenna_votes: u64,
    pub on_event_delegates: usize,
    pub on_event_votes: u64,
    pub off_event_delegates: usize,
    pub off_event_votes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub body_id: BodyId,
    pub distribution: DistributionType,
    pub antenna_votes: u32,
    pub delegate_votes: u64,
}

/// Bodies whose delegate rows do not add up to their antenna votes.
/// Only distributions that have rows are checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SectionConsistency {
    pub pass: bool,
    pub mismatches: Vec<Mismatch>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SectionIntegrity {
    pub votes_sha256: String,
    pub engine_name: String,
    pub engine_version: String,
}

// ===== API =====

/// Build the report for `event_id` from persisted vote state.
pub fn build_event_report(conn: &Connection, event_id: EventId) -> Result<VotesReport, ReportError> {
    let event = directory::load_event(conn, event_id)?;
    let delegate_rows = votes::delegate_votes_for_event(conn, event_id)?;

    let mut bodies = Vec::new();
    for antenna in votes::antenna_votes_for_event(conn, event_id)? {
        let body = directory::load_body(conn, antenna.body_id)?;
        let mine: Vec<&DelegateVoteRecord> = delegate_rows.iter().filter(|r| r.body_id == body.id).collect();
        bodies.push(BodySection {
            body_id: body.id,
            name: body.name,
            body_type: body.body_type,
            member_count: membership::member_count(conn, event_id, antenna.body_id)?,
            antenna_votes: antenna.votes,
            on_event: lines(&mine, DistributionType::OnEvent),
            off_event: lines(&mine, DistributionType::OffEvent),
        });
    }

    let totals = totals_of(&bodies);
    let consistency = check_consistency(&bodies);
    let integrity = SectionIntegrity {
        votes_sha256: votes::votes_digest(conn, event_id)?,
        engine_name: env!("CARGO_PKG_NAME").to_string(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Ok(VotesReport {
        cover: SectionCover {
            event_id: event.id,
            event_name: event.name,
            event_type: event.event_type,
            weighted: event.event_type.is_assembly(),
        },
        bodies,
        totals,
        consistency,
        integrity,
    })
}

// ===== Helpers =====

fn lines(rows: &[&DelegateVoteRecord], dist: DistributionType) -> Vec<DelegateLine> {
    rows.iter()
        .filter(|r| r.distribution == dist)
        .map(|r| DelegateLine { application_id: r.application_id, user_id: r.user_id, votes: r.votes })
        .collect()
}

fn sum(lines: &[DelegateLine]) -> u64 {
    lines.iter().map(|l| u64::from(l.votes)).sum()
}

fn totals_of(bodies: &[BodySection]) -> SectionTotals {
    bodies.iter().fold(SectionTotals::default(), |mut t, b| {
        t.bodies += 1;
        t.antenna_votes += u64::from(b.antenna_votes);
        t.on_event_delegates += b.on_event.len();
        t.on_event_votes += sum(&b.on_event);
        t.off_event_delegates += b.off_event.len();
        t.off_event_votes += sum(&b.off_event);
        t
    })
}

fn check_consistency(bodies: &[BodySection]) -> SectionConsistency {
    let mut mismatches = Vec::new();
    for b in bodies {
        for (dist, lines) in [(DistributionType::OnEvent, &b.on_event), (DistributionType::OffEvent, &b.off_event)] {
            if lines.is_empty() {
                continue;
            }
            let delegate_votes = sum(lines);
            if delegate_votes != u64::from(b.antenna_votes) {
                mismatches.push(Mismatch { body_id: b.body_id, distribution: dist, antenna_votes: b.antenna_votes, delegate_votes });
            }
        }
    }
    SectionConsistency { pass: mismatches.is_empty(), mismatches }
}
