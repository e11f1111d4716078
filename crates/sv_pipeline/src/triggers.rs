//! Trigger call sites: writes that change a vote input, each committed in
//! the same transaction as the recalculation it requires.
//!
//! Referenced rows are loaded before the first write, so a missing event,
//! body, or application fails with `NotFound` and nothing is written.

use std::collections::BTreeSet;

use rusqlite::{Connection, Transaction};
use serde::Serialize;
use sv_core::{affected_bodies, Application, ApplicationId, ApplicationPatch, BodyId, EventId, EventType};
use sv_io::import::{apply_dataset, Dataset, ImportSummary};
use sv_io::membership::{self, MemberEntry};
use sv_io::{applications, directory};
use tracing::{debug, info};

use crate::recalculate::{recalculate_antenna_votes_tx, recalculate_event_tx, AntennaOutcome, EventOutcome};
use crate::{with_write_tx, PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationUpdate {
    pub application: Application,
    /// One entry per recomputed body (old body first on a transfer).
    pub recalculated: Vec<AntennaOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub summary: ImportSummary,
    pub events: Vec<EventOutcome>,
}

fn recalculate_bodies(tx: &Transaction<'_>, event_id: EventId, bodies: &[BodyId]) -> PipelineResult<Vec<AntennaOutcome>> {
    if bodies.is_empty() {
        return Ok(Vec::new());
    }
    let event = directory::load_event(tx, event_id)?;
    bodies
        .iter()
        .map(|&id| {
            let body = directory::load_body(tx, id)?;
            recalculate_antenna_votes_tx(tx, &event, &body)
        })
        .collect()
}

/// Apply `patch` to application `id` and recompute every body it touches.
pub fn update_application(
    conn: &mut Connection,
    id: ApplicationId,
    patch: &ApplicationPatch,
) -> PipelineResult<ApplicationUpdate> {
    let out = with_write_tx(conn, |tx| {
        let before = applications::load_application(tx, id)?;
        let after = before.apply(patch)?;
        if after.body_id != before.body_id {
            directory::load_body(tx, after.body_id)?;
        }
        applications::write_application(tx, &after)?;

        let bodies = affected_bodies(&before, &after);
        debug!(application_id = id.get(), bodies = bodies.len(), "application updated");
        let recalculated = recalculate_bodies(tx, after.event_id, &bodies)?;
        Ok(ApplicationUpdate { application: after, recalculated })
    })?;
    info!(
        application_id = id.get(),
        recalculated = out.recalculated.len(),
        "application update committed"
    );
    Ok(out)
}

/// Insert a new application; an already vote-eligible one recomputes its body.
pub fn create_application(conn: &mut Connection, app: &Application) -> PipelineResult<ApplicationUpdate> {
    if app.participant_order == Some(0) {
        return Err(PipelineError::Invalid("participant order must be >= 1".into()));
    }
    with_write_tx(conn, |tx| {
        directory::load_event(tx, app.event_id)?;
        directory::load_body(tx, app.body_id)?;
        applications::insert_application(tx, app)?;

        let bodies = if app.is_vote_eligible() { vec![app.body_id] } else { Vec::new() };
        let recalculated = recalculate_bodies(tx, app.event_id, &bodies)?;
        Ok(ApplicationUpdate { application: app.clone(), recalculated })
    })
}

/// Replace the membership snapshot of (event, body) and recompute the antenna.
pub fn upload_membership(
    conn: &mut Connection,
    event_id: EventId,
    body_id: BodyId,
    members: &[MemberEntry],
) -> PipelineResult<AntennaOutcome> {
    let out = with_write_tx(conn, |tx| {
        let event = directory::load_event(tx, event_id)?;
        let body = directory::load_body(tx, body_id)?;
        membership::replace_snapshot(tx, event_id, body_id, members)?;
        recalculate_antenna_votes_tx(tx, &event, &body)
    })?;
    info!(
        event_id = event_id.get(),
        body_id = body_id.get(),
        members = members.len(),
        votes = out.votes,
        "membership upload committed"
    );
    Ok(out)
}

/// Change an event's type and recompute all of its bodies.
pub fn change_event_type(conn: &mut Connection, event_id: EventId, event_type: EventType) -> PipelineResult<EventOutcome> {
    with_write_tx(conn, |tx| {
        directory::set_event_type(tx, event_id, event_type)?;
        let event = directory::load_event(tx, event_id)?;
        recalculate_event_tx(tx, &event)
    })
}

/// Load a dataset and recompute every event it mentions.
pub fn import_dataset(conn: &mut Connection, dataset: &Dataset) -> PipelineResult<ImportOutcome> {
    let touched: BTreeSet<EventId> = dataset
        .events
        .iter()
        .map(|e| e.id)
        .chain(dataset.applications.iter().map(|a| a.event_id))
        .chain(dataset.memberships.iter().map(|m| m.event_id))
        .collect();

    let out = with_write_tx(conn, |tx| {
        let summary = apply_dataset(tx, dataset)?;
        let mut events = Vec::with_capacity(touched.len());
        for &id in &touched {
            let event = directory::load_event(tx, id)?;
            events.push(recalculate_event_tx(tx, &event)?);
        }
        Ok(ImportOutcome { summary, events })
    })?;
    info!(events = out.events.len(), "dataset import committed");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sv_core::{Body, BodyType, Event, ParticipantType, UserId};
    use sv_io::config::open_in_memory;
    use sv_io::votes;

    fn ids() -> (EventId, BodyId) {
        (EventId::new(1).unwrap(), BodyId::new(10).unwrap())
    }

    fn seeded() -> Connection {
        let conn = open_in_memory().unwrap();
        let (e, b) = ids();
        directory::upsert_event(&conn, &Event { id: e, name: "Agora".into(), event_type: EventType::Agora }).unwrap();
        directory::upsert_body(&conn, &Body { id: b, name: "A".into(), body_type: BodyType::Antenna }).unwrap();
        conn
    }

    fn members(n: usize) -> Vec<MemberEntry> {
        (0..n)
            .map(|i| MemberEntry { member_id: None, first_name: format!("f{i}"), last_name: "l".into() })
            .collect()
    }

    fn observer(id: i64) -> Application {
        let (e, b) = ids();
        Application {
            id: ApplicationId::new(id).unwrap(),
            event_id: e,
            user_id: UserId::new(id).unwrap(),
            body_id: b,
            participant_type: Some(ParticipantType::Observer),
            participant_order: None,
            cancelled: false,
            confirmed: true,
            registered: false,
            departed: false,
        }
    }

    #[test]
    fn upload_sets_antenna_votes() {
        let mut conn = seeded();
        let (e, b) = ids();
        let out = upload_membership(&mut conn, e, b, &members(51)).unwrap();
        assert_eq!(out.votes, 3);
        assert_eq!(votes::antenna_votes(&conn, e, b).unwrap(), Some(3));
    }

    #[test]
    fn upload_for_unknown_body_writes_nothing() {
        let mut conn = seeded();
        let (e, _) = ids();
        let err = upload_membership(&mut conn, e, BodyId::new(99).unwrap(), &members(3)).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { what: "body", id: 99 }));
        assert!(votes::antenna_votes_for_event(&conn, e).unwrap().is_empty());
    }

    #[test]
    fn irrelevant_patch_recomputes_nothing() {
        let mut conn = seeded();
        let app = observer(1);
        let created = create_application(&mut conn, &app).unwrap();
        assert!(created.recalculated.is_empty());

        let patch = ApplicationPatch { participant_order: Some(Some(3)), ..Default::default() };
        let upd = update_application(&mut conn, app.id, &patch).unwrap();
        // Order is a vote input even for observers, so the body is recomputed.
        assert_eq!(upd.recalculated.len(), 1);

        let noop = update_application(&mut conn, app.id, &ApplicationPatch::default()).unwrap();
        assert!(noop.recalculated.is_empty());
    }

    #[test]
    fn zero_order_rejected_without_write() {
        let mut conn = seeded();
        let app = observer(1);
        create_application(&mut conn, &app).unwrap();
        let patch = ApplicationPatch { participant_order: Some(Some(0)), ..Default::default() };
        assert!(matches!(update_application(&mut conn, app.id, &patch), Err(PipelineError::Invalid(_))));
        assert_eq!(applications::load_application(&conn, app.id).unwrap(), app);
    }

    #[test]
    fn event_type_change_zeroes_weights() {
        let mut conn = seeded();
        let (e, b) = ids();
        upload_membership(&mut conn, e, b, &members(25)).unwrap();
        let out = change_event_type(&mut conn, e, EventType::Spm).unwrap();
        assert_eq!(out.bodies.len(), 1);
        assert_eq!(votes::antenna_votes(&conn, e, b).unwrap(), Some(0));
    }
}
