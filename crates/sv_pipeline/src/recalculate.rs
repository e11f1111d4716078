//! RECALCULATE: antenna weight and per-distribution delegate shares.
//!
//! Order inside one transaction:
//! 1. member count of the snapshot (none → 0 votes)
//! 2. antenna votes via the bracket table, upserted
//! 3. delegate rows of the body destroyed
//! 4. per distribution: roster in canonical order, largest-remainder split,
//!    one row per delegate (empty roster → no rows)

use rusqlite::{Connection, Transaction};
use serde::Serialize;
use sv_algo::{apportion, compute_antenna_votes};
use sv_core::{ApplicationId, Body, BodyId, DelegateVoteRecord, DistributionType, Event, EventId, UserId};
use sv_io::{applications, directory, membership, votes};
use tracing::{debug, info};

use crate::{with_write_tx, PipelineResult};

/// One delegate's computed share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DelegateShare {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub votes: u32,
}

/// What a delegate recalculation wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegateOutcome {
    pub event_id: EventId,
    pub body_id: BodyId,
    /// Antenna votes that were distributed; `None` when no antenna record
    /// existed and nothing was touched.
    pub antenna_votes: Option<u32>,
    pub on_event: Vec<DelegateShare>,
    pub off_event: Vec<DelegateShare>,
}

impl DelegateOutcome {
    pub fn shares(&self, distribution: DistributionType) -> &[DelegateShare] {
        match distribution {
            DistributionType::OnEvent => &self.on_event,
            DistributionType::OffEvent => &self.off_event,
        }
    }

    fn shares_mut(&mut self, distribution: DistributionType) -> &mut Vec<DelegateShare> {
        match distribution {
            DistributionType::OnEvent => &mut self.on_event,
            DistributionType::OffEvent => &mut self.off_event,
        }
    }
}

/// What an antenna recalculation wrote (including its delegate step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AntennaOutcome {
    pub event_id: EventId,
    pub body_id: BodyId,
    pub member_count: Option<u32>,
    pub votes: u32,
    pub delegates: DelegateOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventOutcome {
    pub event_id: EventId,
    pub bodies: Vec<AntennaOutcome>,
}

/* ----------------------------- antenna votes ----------------------------- */

/// Recompute (event, body) antenna votes and its delegate rows in one transaction.
pub fn recalculate_antenna_votes(conn: &mut Connection, event: &Event, body: &Body) -> PipelineResult<AntennaOutcome> {
    let out = with_write_tx(conn, |tx| recalculate_antenna_votes_tx(tx, event, body))?;
    info!(
        event_id = event.id.get(),
        body_id = body.id.get(),
        votes = out.votes,
        "antenna votes committed"
    );
    Ok(out)
}

/// Same as [`recalculate_antenna_votes`], inside the caller's transaction.
pub fn recalculate_antenna_votes_tx(tx: &Transaction<'_>, event: &Event, body: &Body) -> PipelineResult<AntennaOutcome> {
    let member_count = membership::member_count(tx, event.id, body.id)?;
    let votes = compute_antenna_votes(event.event_type, body.body_type, member_count);
    votes::upsert_antenna_votes(tx, event.id, body.id, votes)?;
    debug!(
        event_id = event.id.get(),
        body_id = body.id.get(),
        ?member_count,
        votes,
        "antenna votes upserted"
    );

    let delegates = recalculate_delegate_votes_tx(tx, event, body.id)?;
    Ok(AntennaOutcome { event_id: event.id, body_id: body.id, member_count, votes, delegates })
}

/* ----------------------------- delegate votes ----------------------------- */

/// Redistribute the stored antenna votes of (event, body) in one transaction.
pub fn recalculate_delegate_votes(conn: &mut Connection, event: &Event, body: BodyId) -> PipelineResult<DelegateOutcome> {
    let out = with_write_tx(conn, |tx| recalculate_delegate_votes_tx(tx, event, body))?;
    info!(
        event_id = event.id.get(),
        body_id = body.get(),
        on_event = out.on_event.len(),
        off_event = out.off_event.len(),
        "delegate votes committed"
    );
    Ok(out)
}

/// Same as [`recalculate_delegate_votes`], inside the caller's transaction.
///
/// Without an antenna record there is nothing to distribute: existing rows
/// are left as they are.
pub fn recalculate_delegate_votes_tx(tx: &Transaction<'_>, event: &Event, body: BodyId) -> PipelineResult<DelegateOutcome> {
    let mut out = DelegateOutcome {
        event_id: event.id,
        body_id: body,
        antenna_votes: None,
        on_event: Vec::new(),
        off_event: Vec::new(),
    };
    let Some(total) = votes::antenna_votes(tx, event.id, body)? else {
        debug!(event_id = event.id.get(), body_id = body.get(), "no antenna record; delegate votes untouched");
        return Ok(out);
    };
    out.antenna_votes = Some(total);

    let removed = votes::delete_delegate_votes(tx, event.id, body)?;
    debug!(event_id = event.id.get(), body_id = body.get(), removed, "delegate votes cleared");

    for &distribution in DistributionType::ALL {
        let roster = applications::eligible_delegates(tx, event.id, body, distribution)?;
        if roster.is_empty() {
            continue;
        }
        for (entry, share) in apportion(total, &roster) {
            votes::insert_delegate_vote(
                tx,
                &DelegateVoteRecord {
                    event_id: event.id,
                    body_id: body,
                    application_id: entry.application_id,
                    user_id: entry.user_id,
                    distribution,
                    votes: share,
                },
            )?;
            out.shares_mut(distribution).push(DelegateShare {
                application_id: entry.application_id,
                user_id: entry.user_id,
                votes: share,
            });
        }
    }
    Ok(out)
}

/// Load (event, body) inside the write transaction, then recompute it.
pub fn recalculate_antenna_votes_by_id(
    conn: &mut Connection,
    event_id: EventId,
    body_id: BodyId,
) -> PipelineResult<AntennaOutcome> {
    let out = with_write_tx(conn, |tx| {
        let event = directory::load_event(tx, event_id)?;
        let body = directory::load_body(tx, body_id)?;
        recalculate_antenna_votes_tx(tx, &event, &body)
    })?;
    info!(event_id = event_id.get(), body_id = body_id.get(), votes = out.votes, "antenna votes committed");
    Ok(out)
}

/* ------------------------------- whole event ------------------------------- */

/// Recompute every body with vote inputs at `event` in one transaction.
pub fn recalculate_event(conn: &mut Connection, event: &Event) -> PipelineResult<EventOutcome> {
    let out = with_write_tx(conn, |tx| recalculate_event_tx(tx, event))?;
    info!(event_id = event.id.get(), bodies = out.bodies.len(), "event votes committed");
    Ok(out)
}

/// Load the event and recompute all of its bodies in one transaction.
pub fn recalculate_event_by_id(conn: &mut Connection, event_id: EventId) -> PipelineResult<EventOutcome> {
    let out = with_write_tx(conn, |tx| {
        let event = directory::load_event(tx, event_id)?;
        recalculate_event_tx(tx, &event)
    })?;
    info!(event_id = event_id.get(), bodies = out.bodies.len(), "event votes committed");
    Ok(out)
}

/// Same as [`recalculate_event`], inside the caller's transaction.
///
/// Clears every delegate row of the event first, including rows left under
/// the old body of a moved application. A body holding rows always has an
/// antenna record, so every cleared body is rebuilt.
pub fn recalculate_event_tx(tx: &Transaction<'_>, event: &Event) -> PipelineResult<EventOutcome> {
    let removed = votes::delete_event_delegate_votes(tx, event.id)?;
    debug!(event_id = event.id.get(), removed, "event delegate votes cleared");
    let mut bodies = Vec::new();
    for body_id in votes::bodies_with_vote_inputs(tx, event.id)? {
        let body = directory::load_body(tx, body_id)?;
        bodies.push(recalculate_antenna_votes_tx(tx, event, &body)?);
    }
    Ok(EventOutcome { event_id: event.id, bodies })
}
