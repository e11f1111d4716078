//! crates/sv_io/src/votes.rs
//! Antenna and delegate vote tables.
//!
//! Only the recalculation pipeline writes here. Reads come back in a fixed
//! order (body, distribution token, application) so digests and reports are
//! reproducible.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use sv_core::{AntennaVoteRecord, BodyId, DelegateVoteRecord, EventId};

use crate::columns::{id_at, token_at, u32_at};
use crate::hasher::sha256_canonical;
use crate::IoResult;

fn antenna_from_row(r: &Row<'_>) -> rusqlite::Result<AntennaVoteRecord> {
    Ok(AntennaVoteRecord { event_id: id_at(r, 0)?, body_id: id_at(r, 1)?, votes: u32_at(r, 2)? })
}

fn delegate_from_row(r: &Row<'_>) -> rusqlite::Result<DelegateVoteRecord> {
    Ok(DelegateVoteRecord {
        event_id: id_at(r, 0)?,
        body_id: id_at(r, 1)?,
        application_id: id_at(r, 2)?,
        user_id: id_at(r, 3)?,
        distribution: token_at(r, 4)?,
        votes: u32_at(r, 5)?,
    })
}

/* ---------------------------- antenna_votes ---------------------------- */

/// Current antenna votes for (event, body); `None` if never computed.
pub fn antenna_votes(conn: &Connection, event: EventId, body: BodyId) -> IoResult<Option<u32>> {
    Ok(conn
        .query_row(
            "SELECT event_id, body_id, votes FROM antenna_votes WHERE event_id = ?1 AND body_id = ?2",
            params![event.get(), body.get()],
            antenna_from_row,
        )
        .optional()?
        .map(|rec| rec.votes))
}

/// Create or overwrite the antenna record in one statement.
pub fn upsert_antenna_votes(conn: &Connection, event: EventId, body: BodyId, votes: u32) -> IoResult<()> {
    conn.execute(
        "INSERT INTO antenna_votes (event_id, body_id, votes) VALUES (?1, ?2, ?3)
         ON CONFLICT (event_id, body_id) DO UPDATE SET votes = excluded.votes",
        params![event.get(), body.get(), votes],
    )?;
    Ok(())
}

pub fn antenna_votes_for_event(conn: &Connection, event: EventId) -> IoResult<Vec<AntennaVoteRecord>> {
    let mut stmt =
        conn.prepare("SELECT event_id, body_id, votes FROM antenna_votes WHERE event_id = ?1 ORDER BY body_id")?;
    let rows = stmt.query_map([event.get()], antenna_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/* ---------------------------- delegate_votes ---------------------------- */

/// Remove every delegate record of (event, body), both distributions.
pub fn delete_delegate_votes(conn: &Connection, event: EventId, body: BodyId) -> IoResult<usize> {
    Ok(conn.execute(
        "DELETE FROM delegate_votes WHERE event_id = ?1 AND body_id = ?2",
        params![event.get(), body.get()],
    )?)
}

/// Remove every delegate record of `event`, across all bodies.
pub fn delete_event_delegate_votes(conn: &Connection, event: EventId) -> IoResult<usize> {
    Ok(conn.execute("DELETE FROM delegate_votes WHERE event_id = ?1", params![event.get()])?)
}

pub fn insert_delegate_vote(conn: &Connection, rec: &DelegateVoteRecord) -> IoResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO delegate_votes (event_id, body_id, application_id, user_id, type, votes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    stmt.execute(params![
        rec.event_id.get(),
        rec.body_id.get(),
        rec.application_id.get(),
        rec.user_id.get(),
        rec.distribution.as_str(),
        rec.votes
    ])?;
    Ok(())
}

pub fn delegate_votes_for_body(conn: &Connection, event: EventId, body: BodyId) -> IoResult<Vec<DelegateVoteRecord>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, body_id, application_id, user_id, type, votes FROM delegate_votes
         WHERE event_id = ?1 AND body_id = ?2 ORDER BY type, application_id",
    )?;
    let rows = stmt.query_map(params![event.get(), body.get()], delegate_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn delegate_votes_for_event(conn: &Connection, event: EventId) -> IoResult<Vec<DelegateVoteRecord>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, body_id, application_id, user_id, type, votes FROM delegate_votes
         WHERE event_id = ?1 ORDER BY body_id, type, application_id",
    )?;
    let rows = stmt.query_map([event.get()], delegate_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/* ---------------------------- event-wide views ---------------------------- */

/// Bodies that have a snapshot, an application, or an antenna record at `event`.
pub fn bodies_with_vote_inputs(conn: &Connection, event: EventId) -> IoResult<Vec<BodyId>> {
    let mut stmt = conn.prepare(
        "SELECT body_id FROM memberships WHERE event_id = ?1
         UNION SELECT body_id FROM applications WHERE event_id = ?1
         UNION SELECT body_id FROM antenna_votes WHERE event_id = ?1
         ORDER BY body_id",
    )?;
    let rows = stmt.query_map([event.get()], |r| id_at::<BodyId>(r, 0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

#[derive(Serialize)]
struct VoteState {
    antenna: Vec<AntennaVoteRecord>,
    delegates: Vec<DelegateVoteRecord>,
}

/// SHA-256 of the persisted vote state of `event` (canonical JSON).
///
/// Row ids are left out, so two recalculations over unchanged inputs give the
/// same digest even though delegate rows were recreated.
pub fn votes_digest(conn: &Connection, event: EventId) -> IoResult<String> {
    let state = VoteState {
        antenna: antenna_votes_for_event(conn, event)?,
        delegates: delegate_votes_for_event(conn, event)?,
    };
    sha256_canonical(&state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applications::insert_application;
    use crate::config::open_in_memory;
    use crate::directory::{upsert_body, upsert_event};
    use crate::membership::replace_snapshot;
    use sv_core::{
        Application, ApplicationId, Body, BodyType, DistributionType, Event, EventType, ParticipantType, UserId,
    };

    const E: i64 = 1;

    fn seeded() -> Connection {
        let conn = open_in_memory().unwrap();
        upsert_event(&conn, &Event { id: EventId::new(E).unwrap(), name: "Agora".into(), event_type: EventType::Agora })
            .unwrap();
        for id in [10, 11, 12] {
            upsert_body(&conn, &Body { id: BodyId::new(id).unwrap(), name: format!("B{id}"), body_type: BodyType::Antenna })
                .unwrap();
        }
        conn
    }

    fn ev() -> EventId {
        EventId::new(E).unwrap()
    }

    fn body(id: i64) -> BodyId {
        BodyId::new(id).unwrap()
    }

    fn add_app(conn: &Connection, id: i64, body_id: i64) {
        insert_application(
            conn,
            &Application {
                id: ApplicationId::new(id).unwrap(),
                event_id: ev(),
                user_id: UserId::new(id + 100).unwrap(),
                body_id: body(body_id),
                participant_type: Some(ParticipantType::Delegate),
                participant_order: Some(1),
                cancelled: false,
                confirmed: true,
                registered: false,
                departed: false,
            },
        )
        .unwrap();
    }

    fn record(app: i64, dist: DistributionType, votes: u32) -> DelegateVoteRecord {
        DelegateVoteRecord {
            event_id: ev(),
            body_id: body(10),
            application_id: ApplicationId::new(app).unwrap(),
            user_id: UserId::new(app + 100).unwrap(),
            distribution: dist,
            votes,
        }
    }

    #[test]
    fn antenna_upsert_updates_in_place() {
        let conn = seeded();
        assert_eq!(antenna_votes(&conn, ev(), body(10)).unwrap(), None);
        upsert_antenna_votes(&conn, ev(), body(10), 4).unwrap();
        upsert_antenna_votes(&conn, ev(), body(10), 7).unwrap();
        assert_eq!(antenna_votes(&conn, ev(), body(10)).unwrap(), Some(7));
        assert_eq!(antenna_votes_for_event(&conn, ev()).unwrap().len(), 1);
    }

    #[test]
    fn delegate_rows_delete_and_read_back_ordered() {
        let conn = seeded();
        add_app(&conn, 1, 10);
        add_app(&conn, 2, 10);
        insert_delegate_vote(&conn, &record(2, DistributionType::OnEvent, 3)).unwrap();
        insert_delegate_vote(&conn, &record(2, DistributionType::OffEvent, 2)).unwrap();
        insert_delegate_vote(&conn, &record(1, DistributionType::OffEvent, 3)).unwrap();

        let got = delegate_votes_for_body(&conn, ev(), body(10)).unwrap();
        let keys: Vec<(&str, i64)> =
            got.iter().map(|r| (r.distribution.as_str(), r.application_id.get())).collect();
        assert_eq!(keys, vec![("off-event", 1), ("off-event", 2), ("on-event", 2)]);

        // Same (event, application, type) twice is rejected.
        assert!(insert_delegate_vote(&conn, &record(1, DistributionType::OffEvent, 1)).is_err());

        assert_eq!(delete_delegate_votes(&conn, ev(), body(10)).unwrap(), 3);
        assert!(delegate_votes_for_event(&conn, ev()).unwrap().is_empty());
    }

    #[test]
    fn event_wide_delete_spans_bodies() {
        let conn = seeded();
        add_app(&conn, 1, 10);
        add_app(&conn, 2, 11);
        insert_delegate_vote(&conn, &record(1, DistributionType::OffEvent, 1)).unwrap();
        let mut other = record(2, DistributionType::OffEvent, 1);
        other.body_id = body(11);
        insert_delegate_vote(&conn, &other).unwrap();

        assert_eq!(delete_event_delegate_votes(&conn, ev()).unwrap(), 2);
        assert!(delegate_votes_for_event(&conn, ev()).unwrap().is_empty());
    }

    #[test]
    fn vote_inputs_union_bodies() {
        let conn = seeded();
        replace_snapshot(&conn, ev(), body(12), &[]).unwrap();
        add_app(&conn, 1, 11);
        upsert_antenna_votes(&conn, ev(), body(12), 0).unwrap();
        let ids: Vec<i64> = bodies_with_vote_inputs(&conn, ev()).unwrap().iter().map(|b| b.get()).collect();
        assert_eq!(ids, vec![11, 12]);
    }

    #[test]
    fn digest_ignores_row_ids() {
        let conn = seeded();
        add_app(&conn, 1, 10);
        upsert_antenna_votes(&conn, ev(), body(10), 2).unwrap();
        insert_delegate_vote(&conn, &record(1, DistributionType::OffEvent, 2)).unwrap();
        let before = votes_digest(&conn, ev()).unwrap();

        delete_delegate_votes(&conn, ev(), body(10)).unwrap();
        insert_delegate_vote(&conn, &record(1, DistributionType::OffEvent, 2)).unwrap();
        assert_eq!(votes_digest(&conn, ev()).unwrap(), before);

        upsert_antenna_votes(&conn, ev(), body(10), 3).unwrap();
        assert_ne!(votes_digest(&conn, ev()).unwrap(), before);
    }
}
