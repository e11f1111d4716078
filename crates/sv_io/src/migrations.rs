//! Relational schema for the statutory votes datastore.
//!
//! `init_schema` is idempotent. `events` and `bodies` mirror what the core
//! service knows; `antenna_votes` and `delegate_votes` are written only by the
//! recalculation pipeline.

use rusqlite::Connection;
use tracing::debug;

use crate::IoResult;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id          INTEGER PRIMARY KEY CHECK (id > 0),
    name        TEXT    NOT NULL,
    event_type  TEXT    NOT NULL CHECK (event_type IN ('agora', 'epm', 'spm'))
);

CREATE TABLE IF NOT EXISTS bodies (
    id          INTEGER PRIMARY KEY CHECK (id > 0),
    name        TEXT    NOT NULL,
    body_type   TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS applications (
    id                 INTEGER PRIMARY KEY CHECK (id > 0),
    event_id           INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    user_id            INTEGER NOT NULL CHECK (user_id > 0),
    body_id            INTEGER NOT NULL REFERENCES bodies(id),
    participant_type   TEXT,
    participant_order  INTEGER CHECK (participant_order IS NULL OR participant_order >= 1),
    cancelled          INTEGER NOT NULL DEFAULT 0,
    confirmed          INTEGER NOT NULL DEFAULT 0,
    registered         INTEGER NOT NULL DEFAULT 0,
    departed           INTEGER NOT NULL DEFAULT 0,
    UNIQUE (event_id, user_id)
);
CREATE INDEX IF NOT EXISTS applications_event_body ON applications(event_id, body_id);

CREATE TABLE IF NOT EXISTS memberships (
    event_id    INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    body_id     INTEGER NOT NULL REFERENCES bodies(id),
    PRIMARY KEY (event_id, body_id)
);

CREATE TABLE IF NOT EXISTS membership_members (
    event_id    INTEGER NOT NULL,
    body_id     INTEGER NOT NULL,
    member_id   INTEGER,
    first_name  TEXT    NOT NULL,
    last_name   TEXT    NOT NULL,
    FOREIGN KEY (event_id, body_id) REFERENCES memberships(event_id, body_id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS membership_members_event_body ON membership_members(event_id, body_id);

CREATE TABLE IF NOT EXISTS antenna_votes (
    event_id    INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    body_id     INTEGER NOT NULL REFERENCES bodies(id),
    votes       INTEGER NOT NULL CHECK (votes >= 0),
    PRIMARY KEY (event_id, body_id)
);

CREATE TABLE IF NOT EXISTS delegate_votes (
    id              INTEGER PRIMARY KEY,
    event_id        INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    body_id         INTEGER NOT NULL,
    application_id  INTEGER NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
    user_id         INTEGER NOT NULL,
    type            TEXT    NOT NULL CHECK (type IN ('on-event', 'off-event')),
    votes           INTEGER NOT NULL CHECK (votes >= 0),
    UNIQUE (event_id, application_id, type)
);
CREATE INDEX IF NOT EXISTS delegate_votes_event_body ON delegate_votes(event_id, body_id);
"#;

/// Create every table and index if missing.
pub fn init_schema(conn: &Connection) -> IoResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    debug!("datastore schema ensured");
    Ok(())
}
