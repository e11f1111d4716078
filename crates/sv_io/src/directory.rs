//! Events and bodies known to the datastore.
//!
//! Bodies mirror the external core service's directory (id, name, type); they
//! are written by dataset import and read by the recalculation pipeline.

use rusqlite::{params, Connection, OptionalExtension, Row};
use sv_core::{Body, BodyId, Event, EventId, EventType};

use crate::columns::{id_at, token_at};
use crate::{IoError, IoResult};

fn event_from_row(r: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event { id: id_at(r, 0)?, name: r.get(1)?, event_type: token_at(r, 2)? })
}

fn body_from_row(r: &Row<'_>) -> rusqlite::Result<Body> {
    Ok(Body { id: id_at(r, 0)?, name: r.get(1)?, body_type: token_at(r, 2)? })
}

pub fn find_event(conn: &Connection, id: EventId) -> IoResult<Option<Event>> {
    Ok(conn
        .query_row("SELECT id, name, event_type FROM events WHERE id = ?1", [id.get()], event_from_row)
        .optional()?)
}

pub fn load_event(conn: &Connection, id: EventId) -> IoResult<Event> {
    find_event(conn, id)?.ok_or(IoError::NotFound { what: "event", id: id.get() })
}

pub fn find_body(conn: &Connection, id: BodyId) -> IoResult<Option<Body>> {
    Ok(conn
        .query_row("SELECT id, name, body_type FROM bodies WHERE id = ?1", [id.get()], body_from_row)
        .optional()?)
}

pub fn load_body(conn: &Connection, id: BodyId) -> IoResult<Body> {
    find_body(conn, id)?.ok_or(IoError::NotFound { what: "body", id: id.get() })
}

pub fn upsert_event(conn: &Connection, event: &Event) -> IoResult<()> {
    conn.execute(
        "INSERT INTO events (id, name, event_type) VALUES (?1, ?2, ?3)
         ON CONFLICT (id) DO UPDATE SET name = excluded.name, event_type = excluded.event_type",
        params![event.id.get(), event.name, event.event_type.as_str()],
    )?;
    Ok(())
}

pub fn upsert_body(conn: &Connection, body: &Body) -> IoResult<()> {
    conn.execute(
        "INSERT INTO bodies (id, name, body_type) VALUES (?1, ?2, ?3)
         ON CONFLICT (id) DO UPDATE SET name = excluded.name, body_type = excluded.body_type",
        params![body.id.get(), body.name, body.body_type.as_str()],
    )?;
    Ok(())
}

/// Change an event's type. Errors with `NotFound` if the event is unknown.
pub fn set_event_type(conn: &Connection, id: EventId, event_type: EventType) -> IoResult<()> {
    let n = conn.execute(
        "UPDATE events SET event_type = ?2 WHERE id = ?1",
        params![id.get(), event_type.as_str()],
    )?;
    if n == 0 {
        return Err(IoError::NotFound { what: "event", id: id.get() });
    }
    Ok(())
}
