//! crates/sv_io/src/applications.rs
//! Event applications: CRUD plus the eligible-delegate roster query.

use rusqlite::{params, Connection, OptionalExtension, Row};
use sv_core::{
    sort_roster_canonical, Application, ApplicationId, BodyId, DistributionType, EventId, ParticipantType,
    RosterEntry,
};

use crate::columns::{id_at, opt_token_at, opt_u32_at};
use crate::{IoError, IoResult};

const SELECT_COLUMNS: &str = "SELECT id, event_id, user_id, body_id, participant_type, participant_order,
        cancelled, confirmed, registered, departed
 FROM applications";

fn application_from_row(r: &Row<'_>) -> rusqlite::Result<Application> {
    Ok(Application {
        id: id_at(r, 0)?,
        event_id: id_at(r, 1)?,
        user_id: id_at(r, 2)?,
        body_id: id_at(r, 3)?,
        participant_type: opt_token_at(r, 4)?,
        participant_order: opt_u32_at(r, 5)?,
        cancelled: r.get(6)?,
        confirmed: r.get(7)?,
        registered: r.get(8)?,
        departed: r.get(9)?,
    })
}

pub fn find_application(conn: &Connection, id: ApplicationId) -> IoResult<Option<Application>> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
    Ok(conn.query_row(&sql, [id.get()], application_from_row).optional()?)
}

pub fn load_application(conn: &Connection, id: ApplicationId) -> IoResult<Application> {
    find_application(conn, id)?.ok_or(IoError::NotFound { what: "application", id: id.get() })
}

/// Insert a new application. Duplicate ids or (event, user) pairs fail with a
/// constraint error.
pub fn insert_application(conn: &Connection, app: &Application) -> IoResult<()> {
    conn.execute(
        "INSERT INTO applications (id, event_id, user_id, body_id, participant_type, participant_order,
                                   cancelled, confirmed, registered, departed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            app.id.get(),
            app.event_id.get(),
            app.user_id.get(),
            app.body_id.get(),
            app.participant_type.map(ParticipantType::as_str),
            app.participant_order,
            app.cancelled,
            app.confirmed,
            app.registered,
            app.departed
        ],
    )?;
    Ok(())
}

/// Overwrite the mutable fields of an existing application.
pub fn write_application(conn: &Connection, app: &Application) -> IoResult<()> {
    let n = conn.execute(
        "UPDATE applications
            SET body_id = ?2, participant_type = ?3, participant_order = ?4,
                cancelled = ?5, confirmed = ?6, registered = ?7, departed = ?8
          WHERE id = ?1",
        params![
            app.id.get(),
            app.body_id.get(),
            app.participant_type.map(ParticipantType::as_str),
            app.participant_order,
            app.cancelled,
            app.confirmed,
            app.registered,
            app.departed
        ],
    )?;
    if n == 0 {
        return Err(IoError::NotFound { what: "application", id: app.id.get() });
    }
    Ok(())
}

/// Applications of one event, ascending id.
pub fn list_applications(conn: &Connection, event: EventId) -> IoResult<Vec<Application>> {
    let sql = format!("{SELECT_COLUMNS} WHERE event_id = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([event.get()], application_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Delegates of (event, body) admitted by `distribution`, in roster order.
///
/// SQL narrows to the body's delegates; the distribution's own predicate does
/// the final filtering so there is a single definition of eligibility.
pub fn eligible_delegates(
    conn: &Connection,
    event: EventId,
    body: BodyId,
    distribution: DistributionType,
) -> IoResult<Vec<RosterEntry>> {
    let sql = format!("{SELECT_COLUMNS} WHERE event_id = ?1 AND body_id = ?2 AND participant_type = ?3");
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(
        params![event.get(), body.get(), ParticipantType::Delegate.as_str()],
        application_from_row,
    )?;

    let mut roster = Vec::new();
    for app in rows {
        let app = app?;
        if distribution.admits(&app) {
            roster.push(RosterEntry::from(&app));
        }
    }
    sort_roster_canonical(&mut roster);
    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::open_in_memory;
    use crate::directory::{upsert_body, upsert_event};
    use sv_core::{Body, BodyType, Event, EventType, UserId};

    fn seeded() -> Connection {
        let conn = open_in_memory().unwrap();
        upsert_event(&conn, &Event { id: EventId::new(1).unwrap(), name: "Agora".into(), event_type: EventType::Agora })
            .unwrap();
        for id in [10, 11] {
            upsert_body(&conn, &Body { id: BodyId::new(id).unwrap(), name: format!("B{id}"), body_type: BodyType::Antenna })
                .unwrap();
        }
        conn
    }

    fn delegate(id: i64, body: i64, order: Option<u32>) -> Application {
        Application {
            id: ApplicationId::new(id).unwrap(),
            event_id: EventId::new(1).unwrap(),
            user_id: UserId::new(100 + id).unwrap(),
            body_id: BodyId::new(body).unwrap(),
            participant_type: Some(ParticipantType::Delegate),
            participant_order: order,
            cancelled: false,
            confirmed: true,
            registered: false,
            departed: false,
        }
    }

    #[test]
    fn roundtrip_and_update() {
        let conn = seeded();
        let mut app = delegate(1, 10, Some(2));
        insert_application(&conn, &app).unwrap();
        assert_eq!(load_application(&conn, app.id).unwrap(), app);

        app.body_id = BodyId::new(11).unwrap();
        app.participant_type = None;
        app.participant_order = None;
        write_application(&conn, &app).unwrap();
        assert_eq!(load_application(&conn, app.id).unwrap(), app);
        assert_eq!(list_applications(&conn, app.event_id).unwrap(), vec![app]);
    }

    #[test]
    fn write_unknown_is_not_found() {
        let conn = seeded();
        let err = write_application(&conn, &delegate(99, 10, None)).unwrap_err();
        assert!(matches!(err, IoError::NotFound { what: "application", id: 99 }));
    }

    #[test]
    fn roster_filters_and_orders() {
        let conn = seeded();
        let mut cancelled = delegate(1, 10, Some(1));
        cancelled.cancelled = true;
        let mut on_site = delegate(2, 10, Some(3));
        on_site.registered = true;
        let unordered = delegate(3, 10, None);
        let first = delegate(4, 10, Some(2));
        let elsewhere = delegate(5, 11, Some(1));
        let mut observer = delegate(6, 10, Some(1));
        observer.participant_type = Some(ParticipantType::Observer);
        for a in [&cancelled, &on_site, &unordered, &first, &elsewhere, &observer] {
            insert_application(&conn, a).unwrap();
        }

        let e = EventId::new(1).unwrap();
        let b = BodyId::new(10).unwrap();
        let off: Vec<i64> = eligible_delegates(&conn, e, b, DistributionType::OffEvent)
            .unwrap()
            .iter()
            .map(|r| r.application_id.get())
            .collect();
        assert_eq!(off, vec![4, 2, 3]);

        let on = eligible_delegates(&conn, e, b, DistributionType::OnEvent).unwrap();
        assert_eq!(on.len(), 1);
        assert_eq!(on[0].application_id, on_site.id);
        assert_eq!(on[0].user_id, on_site.user_id);
    }
}
