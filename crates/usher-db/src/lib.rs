//! Storage layer for the usher check-in platform.
//!
//! Provides persistence for events and registrations using `rusqlite`, and
//! implements the race-safe check-in transition on top of it.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared without external synchronization. Multiple `Database` instances
//! may open the same file concurrently (including from separate processes);
//! check-in correctness does not depend on in-process locking. The busy
//! timeout set at open bounds how long a contended call can block before it
//! surfaces as a transient error.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC format, so lexicographic
//! ordering matches chronological ordering. The `registrations.credential`
//! column carries a global UNIQUE constraint; this, together with the
//! conditional UPDATE used by [`Database::check_in`], is what makes
//! at-most-once check-in hold across sessions and devices.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use usher_core::checkin::{AttendanceTally, CheckIn, CheckInError, CheckInOutcome};
use usher_core::credential::Credential;
use usher_core::model::{Event, Registration};
use usher_core::types::{CheckInStatus, EventId, OrganizerId, RegistrationId};

/// How long a contended statement may wait before reporting busy.
const BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {id}: {timestamp}")]
    TimestampParse {
        id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row no longer satisfies the domain invariants.
    #[error("invalid row {id}: {message}")]
    InvalidRow { id: String, message: String },
    /// The referenced event does not exist.
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    /// The generated credential collided with an existing one. Callers may
    /// regenerate and retry.
    #[error("credential already in use")]
    CredentialTaken,
    /// The email is already registered for this event.
    #[error("{email} is already registered for this event")]
    AlreadyRegistered { email: String },
    /// The event has reached its capacity.
    #[error("event is at capacity ({capacity})")]
    EventFull { capacity: u32 },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is initialized on first open; initialization is
    /// idempotent.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database, destroyed when the connection closes.
    ///
    /// Useful for testing. Note that in-memory databases are per-connection,
    /// so they cannot exercise cross-connection races.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<(), DbError> {
        self.conn.busy_timeout(BUSY_TIMEOUT)?;
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                organizer_id TEXT NOT NULL,
                title TEXT NOT NULL,
                starts_at TEXT NOT NULL,
                location TEXT NOT NULL,
                capacity INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_organizer ON events(organizer_id);

            -- Registrations: one row per attendee per event.
            -- status: 0 = pending, 1 = checked in
            -- checked_in_at: set exactly once, by the conditional check-in
            -- update; never cleared.
            CREATE TABLE IF NOT EXISTS registrations (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT,
                credential TEXT NOT NULL UNIQUE,
                status INTEGER NOT NULL DEFAULT 0,
                checked_in_at TEXT,
                registered_at TEXT NOT NULL,
                FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_registrations_event ON registrations(event_id);
            CREATE INDEX IF NOT EXISTS idx_registrations_email ON registrations(event_id, email);
            ",
        )?;
        Ok(())
    }

    /// Inserts a new event.
    pub fn create_event(&mut self, event: &Event) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO events (id, organizer_id, title, starts_at, location, capacity, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                event.id.as_str(),
                event.organizer.as_str(),
                event.title,
                format_timestamp(event.starts_at),
                event.location,
                event.capacity,
                format_timestamp(event.created_at),
            ],
        )?;
        tracing::debug!(event = %event.id, "event created");
        Ok(())
    }

    /// Fetches an event by ID, filtered by owner.
    ///
    /// Returns `None` both when the event is absent and when it is owned by
    /// a different organizer; callers cannot tell the two apart.
    pub fn get_event(
        &self,
        id: &EventId,
        organizer: &OrganizerId,
    ) -> Result<Option<Event>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, organizer_id, title, starts_at, location, capacity, created_at
                FROM events
                WHERE id = ? AND organizer_id = ?
                ",
                params![id.as_str(), organizer.as_str()],
                event_row,
            )
            .optional()?;
        row.map(into_event).transpose()
    }

    /// Lists an organizer's events, soonest first.
    pub fn list_events(&self, organizer: &OrganizerId) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, organizer_id, title, starts_at, location, capacity, created_at
            FROM events
            WHERE organizer_id = ?
            ORDER BY starts_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(params![organizer.as_str()], event_row)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(into_event(row?)?);
        }
        Ok(events)
    }

    /// Updates an event's editable fields, filtered by owner.
    ///
    /// Returns `false` when no row matched (absent or foreign event).
    pub fn update_event(&mut self, event: &Event) -> Result<bool, DbError> {
        let updated = self.conn.execute(
            "
            UPDATE events
            SET title = ?, starts_at = ?, location = ?, capacity = ?
            WHERE id = ? AND organizer_id = ?
            ",
            params![
                event.title,
                format_timestamp(event.starts_at),
                event.location,
                event.capacity,
                event.id.as_str(),
                event.organizer.as_str(),
            ],
        )?;
        Ok(updated > 0)
    }

    /// Deletes an event and, via cascade, all of its registrations.
    ///
    /// Returns `false` when no row matched (absent or foreign event).
    pub fn delete_event(&mut self, id: &EventId, organizer: &OrganizerId) -> Result<bool, DbError> {
        let deleted = self.conn.execute(
            "DELETE FROM events WHERE id = ? AND organizer_id = ?",
            params![id.as_str(), organizer.as_str()],
        )?;
        if deleted > 0 {
            tracing::debug!(event = %id, "event deleted");
        }
        Ok(deleted > 0)
    }

    /// Inserts a registration, enforcing capacity and per-event email
    /// uniqueness inside one transaction.
    ///
    /// A violation of the global credential unique constraint maps to
    /// [`DbError::CredentialTaken`]; callers may regenerate the credential
    /// and retry.
    pub fn register(&mut self, registration: &Registration) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;

        let capacity: Option<u32> = tx
            .query_row(
                "SELECT capacity FROM events WHERE id = ?",
                params![registration.event_id.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| DbError::UnknownEvent(registration.event_id.as_str().to_string()))?;

        if let Some(capacity) = capacity {
            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM registrations WHERE event_id = ?",
                params![registration.event_id.as_str()],
                |row| row.get(0),
            )?;
            if count >= i64::from(capacity) {
                return Err(DbError::EventFull { capacity });
            }
        }

        let email_taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM registrations WHERE event_id = ? AND email = ?)",
            params![registration.event_id.as_str(), registration.email],
            |row| row.get(0),
        )?;
        if email_taken {
            return Err(DbError::AlreadyRegistered {
                email: registration.email.clone(),
            });
        }

        let inserted = tx.execute(
            "
            INSERT INTO registrations
            (id, event_id, name, email, phone, credential, status, checked_in_at, registered_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                registration.id.as_str(),
                registration.event_id.as_str(),
                registration.name,
                registration.email,
                registration.phone,
                registration.credential.as_str(),
                registration.status.as_flag(),
                registration.checked_in_at.map(format_timestamp),
                format_timestamp(registration.registered_at),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(error) if is_credential_conflict(&error) => return Err(DbError::CredentialTaken),
            Err(error) => return Err(error.into()),
        }

        tx.commit()?;
        tracing::debug!(
            registration = %registration.id,
            event = %registration.event_id,
            "attendee registered"
        );
        Ok(())
    }

    /// Looks up the unique registration matching `(event, credential)`.
    ///
    /// Both keys are always required, so a credential from another event can
    /// never resolve here.
    pub fn get_registration(
        &self,
        event: &EventId,
        credential: &Credential,
    ) -> Result<Option<Registration>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, event_id, name, email, phone, credential, status, checked_in_at, registered_at
                FROM registrations
                WHERE event_id = ? AND credential = ?
                ",
                params![event.as_str(), credential.as_str()],
                registration_row,
            )
            .optional()?;
        row.map(into_registration).transpose()
    }

    /// Lists an event's registrations, oldest first, filtered by owner.
    pub fn list_registrations(
        &self,
        event: &EventId,
        organizer: &OrganizerId,
    ) -> Result<Vec<Registration>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT r.id, r.event_id, r.name, r.email, r.phone, r.credential,
                   r.status, r.checked_in_at, r.registered_at
            FROM registrations r
            JOIN events e ON e.id = r.event_id
            WHERE r.event_id = ? AND e.organizer_id = ?
            ORDER BY r.registered_at ASC, r.id ASC
            ",
        )?;
        let rows = stmt.query_map(params![event.as_str(), organizer.as_str()], registration_row)?;
        let mut registrations = Vec::new();
        for row in rows {
            registrations.push(into_registration(row?)?);
        }
        Ok(registrations)
    }

    /// Attendance counts for one event.
    fn attendance_counts(&self, event: &EventId) -> Result<AttendanceTally, DbError> {
        let (total, checked_in): (i64, i64) = self.conn.query_row(
            "
            SELECT COUNT(*), COALESCE(SUM(status), 0)
            FROM registrations
            WHERE event_id = ?
            ",
            params![event.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(AttendanceTally {
            total: u64::try_from(total).unwrap_or_default(),
            checked_in: u64::try_from(checked_in).unwrap_or_default(),
        })
    }

    /// Confirms the organizer owns the event.
    ///
    /// Absent and foreign events are indistinguishable here, so event
    /// existence never leaks to non-owners.
    fn authorize(&self, event: &EventId, organizer: &OrganizerId) -> Result<(), CheckInError> {
        let owned: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM events WHERE id = ? AND organizer_id = ?",
                params![event.as_str(), organizer.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| storage_error(DbError::Sqlite(e)))?;
        if owned.is_some() {
            Ok(())
        } else {
            Err(CheckInError::Unauthorized)
        }
    }

    /// Resolves a decoded credential and applies the single race-safe
    /// `pending -> checked_in` transition.
    ///
    /// The commit is a conditional single-row UPDATE keyed on the current
    /// status, enforced by SQLite's row-level atomicity. Two near-
    /// simultaneous scans of one credential therefore produce exactly one
    /// success and one duplicate, across connections and processes. The
    /// operation never performs an unconditional write to check-in state,
    /// which is also what makes retrying after a transient error safe.
    pub fn check_in(
        &mut self,
        event: &EventId,
        organizer: &OrganizerId,
        credential: &Credential,
    ) -> Result<CheckInOutcome, CheckInError> {
        self.check_in_at(event, organizer, credential, Utc::now())
    }

    fn check_in_at(
        &mut self,
        event: &EventId,
        organizer: &OrganizerId,
        credential: &Credential,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, CheckInError> {
        self.authorize(event, organizer)?;

        let Some(registration) = self
            .get_registration(event, credential)
            .map_err(storage_error)?
        else {
            tracing::debug!(event = %event, "credential did not resolve");
            return Ok(CheckInOutcome::NotFound);
        };

        if registration.status.is_checked_in() {
            return Ok(CheckInOutcome::Duplicate(registration));
        }

        let updated = self
            .conn
            .execute(
                "
                UPDATE registrations
                SET status = 1, checked_in_at = ?
                WHERE id = ? AND status = 0
                ",
                params![format_timestamp(now), registration.id.as_str()],
            )
            .map_err(|e| storage_error(DbError::Sqlite(e)))?;

        // Re-read for the authoritative snapshot. Zero rows updated means a
        // concurrent commit won the race between our read and this write.
        let Some(current) = self
            .get_registration(event, credential)
            .map_err(storage_error)?
        else {
            return Ok(CheckInOutcome::NotFound);
        };

        if updated == 0 {
            tracing::debug!(registration = %current.id, "lost check-in race, reporting duplicate");
            return Ok(CheckInOutcome::Duplicate(current));
        }

        tracing::info!(registration = %current.id, event = %event, "attendee checked in");
        Ok(CheckInOutcome::Success(current))
    }
}

impl CheckIn for Database {
    fn check_in(
        &mut self,
        event: &EventId,
        organizer: &OrganizerId,
        credential: &Credential,
    ) -> Result<CheckInOutcome, CheckInError> {
        self.check_in_at(event, organizer, credential, Utc::now())
    }

    fn attendance(
        &self,
        event: &EventId,
        organizer: &OrganizerId,
    ) -> Result<AttendanceTally, CheckInError> {
        self.authorize(event, organizer)?;
        self.attendance_counts(event).map_err(storage_error)
    }
}

fn storage_error(error: DbError) -> CheckInError {
    CheckInError::Storage(Box::new(error))
}

/// Recognizes a UNIQUE violation on `registrations.credential`.
fn is_credential_conflict(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(failure, Some(message)) => {
            failure.code == rusqlite::ErrorCode::ConstraintViolation
                && message.contains("registrations.credential")
        }
        _ => false,
    }
}

#[derive(Debug)]
struct EventRow {
    id: String,
    organizer: String,
    title: String,
    starts_at: String,
    location: String,
    capacity: Option<u32>,
    created_at: String,
}

fn event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        organizer: row.get(1)?,
        title: row.get(2)?,
        starts_at: row.get(3)?,
        location: row.get(4)?,
        capacity: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn into_event(row: EventRow) -> Result<Event, DbError> {
    let starts_at = parse_timestamp(&row.starts_at, &row.id)?;
    let created_at = parse_timestamp(&row.created_at, &row.id)?;
    Ok(Event {
        id: EventId::new(&*row.id).map_err(|e| invalid_row(&row.id, &e))?,
        organizer: OrganizerId::new(row.organizer).map_err(|e| invalid_row(&row.id, &e))?,
        title: row.title,
        starts_at,
        location: row.location,
        capacity: row.capacity,
        created_at,
    })
}

#[derive(Debug)]
struct RegistrationRow {
    id: String,
    event_id: String,
    name: String,
    email: String,
    phone: Option<String>,
    credential: String,
    status: i64,
    checked_in_at: Option<String>,
    registered_at: String,
}

fn registration_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RegistrationRow> {
    Ok(RegistrationRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        credential: row.get(5)?,
        status: row.get(6)?,
        checked_in_at: row.get(7)?,
        registered_at: row.get(8)?,
    })
}

fn into_registration(row: RegistrationRow) -> Result<Registration, DbError> {
    let registered_at = parse_timestamp(&row.registered_at, &row.id)?;
    let checked_in_at = row
        .checked_in_at
        .as_deref()
        .map(|ts| parse_timestamp(ts, &row.id))
        .transpose()?;
    Ok(Registration {
        id: RegistrationId::new(&*row.id).map_err(|e| invalid_row(&row.id, &e))?,
        event_id: EventId::new(row.event_id).map_err(|e| invalid_row(&row.id, &e))?,
        name: row.name,
        email: row.email,
        phone: row.phone,
        credential: Credential::new(row.credential).map_err(|e| invalid_row(&row.id, &e))?,
        status: CheckInStatus::from_flag(row.status),
        checked_in_at,
        registered_at,
    })
}

fn invalid_row(id: &str, error: &dyn std::fmt::Display) -> DbError {
    DbError::InvalidRow {
        id: id.to_string(),
        message: error.to_string(),
    }
}

fn parse_timestamp(timestamp: &str, id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use usher_core::checkin::ScanResult;

    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn organizer() -> OrganizerId {
        OrganizerId::new("org-1").unwrap()
    }

    fn sample_event(capacity: Option<u32>) -> Event {
        Event::new(
            organizer(),
            "RustConf",
            ts("2026-09-01T09:00:00Z"),
            "Main hall",
            capacity,
            ts("2026-08-01T00:00:00Z"),
        )
        .unwrap()
    }

    fn sample_registration(event: &Event, name: &str) -> Registration {
        Registration::new(
            event.id.clone(),
            name,
            format!("{name}@example.com"),
            None,
            ts("2026-08-02T00:00:00Z"),
        )
        .unwrap()
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        let events_columns = table_columns(&db.conn, "events");
        assert_eq!(
            events_columns,
            vec![
                "id",
                "organizer_id",
                "title",
                "starts_at",
                "location",
                "capacity",
                "created_at",
            ]
        );

        let registrations_columns = table_columns(&db.conn, "registrations");
        assert_eq!(
            registrations_columns,
            vec![
                "id",
                "event_id",
                "name",
                "email",
                "phone",
                "credential",
                "status",
                "checked_in_at",
                "registered_at",
            ]
        );

        let foreign_keys = foreign_keys(&db.conn, "registrations");
        assert_eq!(foreign_keys.len(), 1);
        assert_eq!(
            foreign_keys[0],
            (
                "events".to_string(),
                "event_id".to_string(),
                "id".to_string(),
                "CASCADE".to_string(),
            )
        );
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn foreign_keys(conn: &Connection, table: &str) -> Vec<(String, String, String, String)> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA foreign_key_list({table})"))
            .expect("prepare foreign_key_list");
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .expect("query foreign_key_list");
        rows.map(|row| row.expect("foreign_key_list row")).collect()
    }

    #[test]
    fn get_event_is_owner_filtered() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(None);
        db.create_event(&event).unwrap();

        let found = db.get_event(&event.id, &organizer()).unwrap();
        assert_eq!(found, Some(event.clone()));

        let other = OrganizerId::new("org-2").unwrap();
        assert_eq!(db.get_event(&event.id, &other).unwrap(), None);
    }

    #[test]
    fn list_events_orders_by_start() {
        let mut db = Database::open_in_memory().unwrap();
        let mut early = sample_event(None);
        early.starts_at = ts("2026-09-01T09:00:00Z");
        let mut late = sample_event(None);
        late.starts_at = ts("2026-10-01T09:00:00Z");
        db.create_event(&late).unwrap();
        db.create_event(&early).unwrap();

        let events = db.list_events(&organizer()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, early.id);
        assert_eq!(events[1].id, late.id);
    }

    #[test]
    fn update_event_is_owner_filtered() {
        let mut db = Database::open_in_memory().unwrap();
        let mut event = sample_event(None);
        db.create_event(&event).unwrap();

        event.title = "RustConf 2026".to_string();
        assert!(db.update_event(&event).unwrap());

        event.organizer = OrganizerId::new("org-2").unwrap();
        event.title = "Hijacked".to_string();
        assert!(!db.update_event(&event).unwrap());

        let stored = db.get_event(&event.id, &organizer()).unwrap().unwrap();
        assert_eq!(stored.title, "RustConf 2026");
    }

    #[test]
    fn delete_event_cascades_to_registrations() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(None);
        db.create_event(&event).unwrap();
        db.register(&sample_registration(&event, "ada")).unwrap();

        assert!(db.delete_event(&event.id, &organizer()).unwrap());

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM registrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn list_registrations_is_ordered_and_owner_filtered() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(None);
        db.create_event(&event).unwrap();

        let mut first = sample_registration(&event, "ada");
        first.registered_at = ts("2026-08-02T00:00:00Z");
        let mut second = sample_registration(&event, "grace");
        second.registered_at = ts("2026-08-03T00:00:00Z");
        db.register(&second).unwrap();
        db.register(&first).unwrap();

        let registrations = db.list_registrations(&event.id, &organizer()).unwrap();
        assert_eq!(registrations.len(), 2);
        assert_eq!(registrations[0].name, "ada");
        assert_eq!(registrations[1].name, "grace");

        let intruder = OrganizerId::new("org-2").unwrap();
        assert!(db.list_registrations(&event.id, &intruder).unwrap().is_empty());
    }

    #[test]
    fn register_rejects_unknown_event() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(None);
        let registration = sample_registration(&event, "ada");
        let result = db.register(&registration);
        assert!(matches!(result, Err(DbError::UnknownEvent(_))));
    }

    #[test]
    fn register_rejects_duplicate_email() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(None);
        db.create_event(&event).unwrap();
        db.register(&sample_registration(&event, "ada")).unwrap();

        let again = sample_registration(&event, "ada");
        let result = db.register(&again);
        assert!(matches!(result, Err(DbError::AlreadyRegistered { .. })));
    }

    #[test]
    fn register_rejects_credential_collision() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(None);
        db.create_event(&event).unwrap();
        let first = sample_registration(&event, "ada");
        db.register(&first).unwrap();

        let mut clash = sample_registration(&event, "grace");
        clash.credential = first.credential.clone();
        let result = db.register(&clash);
        assert!(matches!(result, Err(DbError::CredentialTaken)));
    }

    #[test]
    fn register_enforces_capacity() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(Some(2));
        db.create_event(&event).unwrap();
        db.register(&sample_registration(&event, "ada")).unwrap();
        db.register(&sample_registration(&event, "grace")).unwrap();

        let result = db.register(&sample_registration(&event, "linus"));
        assert!(matches!(result, Err(DbError::EventFull { capacity: 2 })));

        let tally = db.attendance_counts(&event.id).unwrap();
        assert_eq!(tally, AttendanceTally { total: 2, checked_in: 0 });
    }

    #[test]
    fn check_in_unknown_credential_is_not_found() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(None);
        db.create_event(&event).unwrap();
        db.register(&sample_registration(&event, "ada")).unwrap();

        let garbage = Credential::new("garbage").unwrap();
        let outcome = db.check_in(&event.id, &organizer(), &garbage).unwrap();
        assert_eq!(outcome, CheckInOutcome::NotFound);

        let tally = db.attendance_counts(&event.id).unwrap();
        assert_eq!(tally.checked_in, 0);
    }

    #[test]
    fn check_in_transitions_pending_registration() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(None);
        db.create_event(&event).unwrap();
        let registration = sample_registration(&event, "ada");
        db.register(&registration).unwrap();

        let now = ts("2026-09-01T09:15:00Z");
        let outcome = db
            .check_in_at(&event.id, &organizer(), &registration.credential, now)
            .unwrap();

        let CheckInOutcome::Success(snapshot) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(snapshot.status, CheckInStatus::CheckedIn);
        assert_eq!(snapshot.checked_in_at, Some(now));
        assert!(snapshot.checked_in_at.unwrap() >= snapshot.registered_at);

        // The persisted row matches the reported snapshot.
        let stored = db
            .get_registration(&event.id, &registration.credential)
            .unwrap()
            .unwrap();
        assert_eq!(stored, snapshot);
    }

    #[test]
    fn repeat_check_in_is_duplicate_without_mutation() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(None);
        db.create_event(&event).unwrap();
        let registration = sample_registration(&event, "ada");
        db.register(&registration).unwrap();

        let first = ts("2026-09-01T09:15:00Z");
        let later = ts("2026-09-01T10:00:00Z");
        db.check_in_at(&event.id, &organizer(), &registration.credential, first)
            .unwrap();
        let outcome = db
            .check_in_at(&event.id, &organizer(), &registration.credential, later)
            .unwrap();

        let CheckInOutcome::Duplicate(snapshot) = outcome else {
            panic!("expected duplicate, got {outcome:?}");
        };
        // Original timestamp preserved; the later clock never lands.
        assert_eq!(snapshot.checked_in_at, Some(first));
    }

    #[test]
    fn check_in_is_scoped_to_the_event() {
        let mut db = Database::open_in_memory().unwrap();
        let event_a = sample_event(None);
        let event_b = sample_event(None);
        db.create_event(&event_a).unwrap();
        db.create_event(&event_b).unwrap();
        let registration = sample_registration(&event_a, "ada");
        db.register(&registration).unwrap();

        // Same organizer owns both events; the credential still only
        // resolves within its own event.
        let outcome = db
            .check_in(&event_b.id, &organizer(), &registration.credential)
            .unwrap();
        assert_eq!(outcome, CheckInOutcome::NotFound);

        let stored = db
            .get_registration(&event_a.id, &registration.credential)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, CheckInStatus::Pending);
    }

    #[test]
    fn check_in_requires_ownership() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(None);
        db.create_event(&event).unwrap();
        let registration = sample_registration(&event, "ada");
        db.register(&registration).unwrap();

        let intruder = OrganizerId::new("org-2").unwrap();
        let result = db.check_in(&event.id, &intruder, &registration.credential);
        assert!(matches!(result, Err(CheckInError::Unauthorized)));

        // An absent event reports the same error as a foreign one.
        let ghost = EventId::new("no-such-event").unwrap();
        let result = db.check_in(&ghost, &organizer(), &registration.credential);
        assert!(matches!(result, Err(CheckInError::Unauthorized)));
    }

    #[test]
    fn attendance_is_ownership_checked() {
        let mut db = Database::open_in_memory().unwrap();
        let event = sample_event(None);
        db.create_event(&event).unwrap();
        db.register(&sample_registration(&event, "ada")).unwrap();

        let tally = CheckIn::attendance(&db, &event.id, &organizer()).unwrap();
        assert_eq!(tally, AttendanceTally { total: 1, checked_in: 0 });

        let intruder = OrganizerId::new("org-2").unwrap();
        let result = CheckIn::attendance(&db, &event.id, &intruder);
        assert!(matches!(result, Err(CheckInError::Unauthorized)));
    }

    #[test]
    fn concurrent_check_ins_yield_exactly_one_success() {
        const SCANNERS: usize = 8;

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("usher.db");

        let mut db = Database::open(&path).unwrap();
        let event = sample_event(None);
        db.create_event(&event).unwrap();
        let registration = sample_registration(&event, "ada");
        db.register(&registration).unwrap();
        drop(db);

        let barrier = Arc::new(Barrier::new(SCANNERS));
        let mut handles = Vec::new();
        for _ in 0..SCANNERS {
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            let event_id = event.id.clone();
            let credential = registration.credential.clone();
            handles.push(std::thread::spawn(move || {
                let mut db = Database::open(&path).unwrap();
                barrier.wait();
                db.check_in(&event_id, &organizer(), &credential).unwrap()
            }));
        }

        let outcomes: Vec<CheckInOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let successes: Vec<_> = outcomes
            .iter()
            .filter(|o| o.result() == ScanResult::Success)
            .collect();
        let duplicates = outcomes
            .iter()
            .filter(|o| o.result() == ScanResult::Duplicate)
            .count();
        assert_eq!(successes.len(), 1, "outcomes: {outcomes:?}");
        assert_eq!(duplicates, SCANNERS - 1);

        // The persisted timestamp is the one the winning scan reported.
        let winner = successes[0].registration().unwrap();
        let db = Database::open(&path).unwrap();
        let stored = db
            .get_registration(&event.id, &registration.credential)
            .unwrap()
            .unwrap();
        assert_eq!(stored.checked_in_at, winner.checked_in_at);
        assert_eq!(stored.status, CheckInStatus::CheckedIn);
    }
}
