//! Membership snapshots: the roster a body uploads for an event.
//!
//! A snapshot is replaced wholesale. `member_count` distinguishes "no
//! snapshot" (`None`) from an uploaded empty roster (`Some(0)`).

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sv_core::{BodyId, EventId, UserId};
use tracing::debug;

use crate::{IoError, IoResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberEntry {
    #[serde(default)]
    pub member_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
}

/// Size of the current snapshot for (event, body), or `None` if none was uploaded.
pub fn member_count(conn: &Connection, event: EventId, body: BodyId) -> IoResult<Option<u32>> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM memberships WHERE event_id = ?1 AND body_id = ?2",
            params![event.get(), body.get()],
            |_| Ok(()),
        )
        .optional()?;
    if exists.is_none() {
        return Ok(None);
    }
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM membership_members WHERE event_id = ?1 AND body_id = ?2",
        params![event.get(), body.get()],
        |r| r.get(0),
    )?;
    let n = u32::try_from(n).map_err(|_| IoError::Invalid(format!("member count {n} out of range")))?;
    Ok(Some(n))
}

/// Replace the snapshot for (event, body). Runs inside the caller's transaction.
pub fn replace_snapshot(conn: &Connection, event: EventId, body: BodyId, members: &[MemberEntry]) -> IoResult<()> {
    // Deleting the header cascades to its member rows.
    conn.execute(
        "DELETE FROM memberships WHERE event_id = ?1 AND body_id = ?2",
        params![event.get(), body.get()],
    )?;
    conn.execute(
        "INSERT INTO memberships (event_id, body_id) VALUES (?1, ?2)",
        params![event.get(), body.get()],
    )?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO membership_members (event_id, body_id, member_id, first_name, last_name)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for m in members {
        stmt.execute(params![
            event.get(),
            body.get(),
            m.member_id.map(UserId::get),
            m.first_name,
            m.last_name
        ])?;
    }
    debug!(event_id = event.get(), body_id = body.get(), members = members.len(), "membership snapshot replaced");
    Ok(())
}
