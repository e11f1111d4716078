//! Dataset import: read a local JSON document of events, bodies,
//! applications, and membership snapshots, validate it against the embedded
//! Draft-07 schema, then write it into the datastore.
//!
//! `apply_dataset` never begins a transaction; callers wrap it together with
//! the recalculation of every imported event.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sv_core::{Application, Body, BodyId, Event, EventId, UserId};
use tracing::{debug, info};

use crate::applications::{find_application, insert_application, write_application};
use crate::directory::{upsert_body, upsert_event};
use crate::hasher::sha256_hex;
use crate::membership::{replace_snapshot, MemberEntry};
use crate::schema::{self, SchemaKind};
use crate::{IoError, IoResult};

/// Upper bound on an input file; larger files are rejected, not truncated.
const MAX_INPUT_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipUpload {
    pub event_id: EventId,
    pub body_id: BodyId,
    pub members: Vec<MemberEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub events: Vec<Event>,
    pub bodies: Vec<Body>,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub memberships: Vec<MembershipUpload>,
}

/// A parsed dataset plus the SHA-256 of the file bytes it came from.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub dataset: Dataset,
    pub sha256: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub events: usize,
    pub bodies: usize,
    pub applications: usize,
    pub memberships: usize,
}

pub fn read_bounded(path: &Path) -> IoResult<Vec<u8>> {
    let f = File::open(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let mut buf = Vec::new();
    f.take(MAX_INPUT_BYTES + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > MAX_INPUT_BYTES {
        return Err(IoError::Invalid(format!(
            "{} exceeds {} bytes",
            path.display(),
            MAX_INPUT_BYTES
        )));
    }
    Ok(buf)
}

/// Schema-check then deserialize.
pub fn parse_dataset(bytes: &[u8]) -> IoResult<Dataset> {
    let raw: Value = serde_json::from_slice(bytes)?;
    schema::validate_value(SchemaKind::Dataset, &raw)?;
    let ds: Dataset = serde_json::from_value(raw)
        .map_err(|e| IoError::Json { pointer: "/".into(), msg: e.to_string() })?;
    check_references(&ds)?;
    Ok(ds)
}

pub fn load_dataset(path: &Path) -> IoResult<LoadedDataset> {
    let bytes = read_bounded(path)?;
    let dataset = parse_dataset(&bytes)?;
    let sha256 = sha256_hex(&bytes);
    debug!(path = %path.display(), %sha256, "dataset parsed");
    Ok(LoadedDataset { dataset, sha256 })
}

/// Parse a members upload (bare JSON array).
pub fn load_members(path: &Path) -> IoResult<Vec<MemberEntry>> {
    let raw: Value = serde_json::from_slice(&read_bounded(path)?)?;
    schema::validate_value(SchemaKind::Members, &raw)?;
    serde_json::from_value(raw).map_err(|e| IoError::Json { pointer: "/".into(), msg: e.to_string() })
}

/// In-document uniqueness checks the schema cannot express.
fn check_references(ds: &Dataset) -> IoResult<()> {
    let mut seen_users: Vec<(EventId, UserId)> =
        ds.applications.iter().map(|a| (a.event_id, a.user_id)).collect();
    seen_users.sort_unstable();
    if let Some(w) = seen_users.windows(2).find(|w| w[0] == w[1]) {
        return Err(IoError::Invalid(format!(
            "user {} applies twice to event {}",
            w[0].1, w[0].0
        )));
    }

    let mut snapshots: Vec<(EventId, BodyId)> = ds.memberships.iter().map(|m| (m.event_id, m.body_id)).collect();
    snapshots.sort_unstable();
    if let Some(w) = snapshots.windows(2).find(|w| w[0] == w[1]) {
        return Err(IoError::Invalid(format!(
            "body {} has two membership snapshots for event {}",
            w[0].1, w[0].0
        )));
    }
    Ok(())
}

/// Write `ds` into the store. Events and bodies are upserted, applications
/// inserted or overwritten, snapshots replaced.
pub fn apply_dataset(conn: &Connection, ds: &Dataset) -> IoResult<ImportSummary> {
    for e in &ds.events {
        upsert_event(conn, e)?;
    }
    for b in &ds.bodies {
        upsert_body(conn, b)?;
    }
    for a in &ds.applications {
        if find_application(conn, a.id)?.is_some() {
            write_application(conn, a)?;
        } else {
            insert_application(conn, a)?;
        }
    }
    for m in &ds.memberships {
        replace_snapshot(conn, m.event_id, m.body_id, &m.members)?;
    }

    let summary = ImportSummary {
        events: ds.events.len(),
        bodies: ds.bodies.len(),
        applications: ds.applications.len(),
        memberships: ds.memberships.len(),
    };
    info!(
        events = summary.events,
        bodies = summary.bodies,
        applications = summary.applications,
        memberships = summary.memberships,
        "dataset applied"
    );
    Ok(summary)
}
