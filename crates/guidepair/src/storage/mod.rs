//! Storage layer for guidepair.
//!
//! This module provides `SQLite`-based persistence for events, people,
//! sign-ups and each event's pairing document, and implements
//! [`PersistenceGateway`] on top of it.

pub mod migrations;
pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::assignment::PairingAssignment;
use crate::error::{Error, Result};
use crate::gateway::PersistenceGateway;
use crate::pace::Pace;
use crate::roster::{Person, PersonId, Role, Roster, RosterMember, RsvpStatus, SignUp};

/// An event as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Day of the event, if set.
    pub date: Option<NaiveDate>,
    /// Fingerprint of the last saved pairing document.
    pub pairings_hash: Option<String>,
    /// When pairings were last saved.
    pub pairings_saved_at: Option<DateTime<Utc>>,
}

impl Event {
    /// A new event with no pairings.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, date: Option<NaiveDate>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            date,
            pairings_hash: None,
            pairings_saved_at: None,
        }
    }
}

/// `SQLite`-backed store.
///
/// The connection sits behind a mutex so the store can be shared with async
/// callers; no lock is ever held across an await point.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
    /// Whether `maybe` sign-ups join the roster.
    include_maybe: bool,
}

impl Storage {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// then brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            include_maybe: true,
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
            include_maybe: true,
        })
    }

    /// Choose whether `maybe` sign-ups take part in pairing.
    #[must_use]
    pub fn with_include_maybe(mut self, include_maybe: bool) -> Self {
        self.include_maybe = include_maybe;
        self
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Insert or update an event's name and date. Stored pairings are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn add_event(&self, event: &Event) -> Result<()> {
        let date = event.date.map(|d| d.to_string());
        self.conn()?.execute(
            r"
            INSERT INTO events (id, name, event_date) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, event_date = excluded.event_date
            ",
            params![event.id, event.name, date],
        )?;
        debug!(event_id = %event.id, "Event stored");
        Ok(())
    }

    /// Get an event by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_event(&self, id: &str) -> Result<Option<Event>> {
        let event = self
            .conn()?
            .query_row(
                r"
                SELECT id, name, event_date, pairings_hash, pairings_saved_at
                FROM events WHERE id = ?1
                ",
                [id],
                Self::row_to_event,
            )
            .optional()?;
        Ok(event)
    }

    /// All events, soonest first; undated events last.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_events(&self) -> Result<Vec<Event>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, name, event_date, pairings_hash, pairings_saved_at
            FROM events ORDER BY event_date IS NULL, event_date, id
            ",
        )?;
        let events = stmt
            .query_map([], Self::row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// Insert or update a person.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn add_person(&self, person: &Person) -> Result<()> {
        let (minutes, seconds) = match person.pace {
            Some(pace) => (Some(pace.minutes), Some(pace.seconds)),
            None => (None, None),
        };
        self.conn()?.execute(
            r"
            INSERT INTO people (id, display_name, role, pace_minutes, pace_seconds)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                role = excluded.role,
                pace_minutes = excluded.pace_minutes,
                pace_seconds = excluded.pace_seconds
            ",
            params![
                person.id.as_str(),
                person.display_name,
                person.role.to_string(),
                minutes,
                seconds,
            ],
        )?;
        debug!(person = %person.id, "Person stored");
        Ok(())
    }

    /// Get a person by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the stored role is unknown.
    pub fn get_person(&self, id: &PersonId) -> Result<Option<Person>> {
        let row = self
            .conn()?
            .query_row(
                r"
                SELECT id, display_name, role, pace_minutes, pace_seconds
                FROM people WHERE id = ?1
                ",
                [id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<u32>>(3)?,
                        row.get::<_, Option<u32>>(4)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, display_name, role, minutes, seconds)| -> Result<Person> {
            Ok(Person {
                id: PersonId::new(id),
                display_name,
                role: role.parse()?,
                pace: pace_from_columns(minutes, seconds),
            })
        })
        .transpose()
    }

    /// Insert or update a sign-up. The event and person must exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotFound`] or [`Error::PersonNotFound`] for
    /// unknown ids, or an error if the database operation fails.
    pub fn add_signup(&self, signup: &SignUp) -> Result<()> {
        if self.get_event(&signup.event_id)?.is_none() {
            return Err(Error::EventNotFound(signup.event_id.clone()));
        }
        if self.get_person(&signup.person_id)?.is_none() {
            return Err(Error::PersonNotFound(signup.person_id.to_string()));
        }

        self.conn()?.execute(
            r"
            INSERT INTO signups (event_id, person_id, role, status, signed_up_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(event_id, person_id)
            DO UPDATE SET role = excluded.role, status = excluded.status
            ",
            params![
                signup.event_id,
                signup.person_id.as_str(),
                signup.role.to_string(),
                signup.status.to_string(),
                timestamp(),
            ],
        )?;
        debug!(event_id = %signup.event_id, person = %signup.person_id, "Sign-up stored");
        Ok(())
    }

    /// The roster for an event, in sign-up order.
    ///
    /// Rows with an unrecognised role or status are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotFound`] for an unknown event, or an error if
    /// the database operation fails.
    pub fn roster(&self, event_id: &str) -> Result<Roster> {
        if self.get_event(event_id)?.is_none() {
            return Err(Error::EventNotFound(event_id.to_string()));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT p.id, p.display_name, s.role, s.status, p.pace_minutes, p.pace_seconds
            FROM signups s JOIN people p ON p.id = s.person_id
            WHERE s.event_id = ?1
            ORDER BY s.signed_up_at, s.rowid
            ",
        )?;

        let rows = stmt
            .query_map([event_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<u32>>(4)?,
                    row.get::<_, Option<u32>>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut members = Vec::with_capacity(rows.len());
        for (id, display_name, role, status, minutes, seconds) in rows {
            let (Ok(role), Ok(status)) = (role.parse::<Role>(), status.parse::<RsvpStatus>()) else {
                warn!(event_id, person = %id, %role, %status, "Skipping unreadable sign-up");
                continue;
            };
            members.push(RosterMember {
                id: PersonId::new(id),
                display_name,
                role,
                pace: pace_from_columns(minutes, seconds),
                status,
            });
        }

        Ok(Roster::with_maybe(members, self.include_maybe))
    }

    /// The event's stored pairing document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotFound`] for an unknown event, or an error if
    /// the stored document cannot be read.
    pub fn pairings(&self, event_id: &str) -> Result<PairingAssignment> {
        let stored: Option<Option<String>> = self
            .conn()?
            .query_row("SELECT pairings FROM events WHERE id = ?1", [event_id], |row| {
                row.get(0)
            })
            .optional()?;

        match stored {
            None => Err(Error::EventNotFound(event_id.to_string())),
            Some(None) => Ok(PairingAssignment::new()),
            Some(Some(json)) => PairingAssignment::from_json(&json),
        }
    }

    /// Replace the event's pairing document in a single write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotFound`] for an unknown event, or an error if
    /// the write fails.
    pub fn save_pairings(&self, event_id: &str, pairings: &PairingAssignment) -> Result<()> {
        let json = pairings.to_json()?;
        let hash = pairings.fingerprint();

        let affected = self.conn()?.execute(
            r"
            UPDATE events SET pairings = ?2, pairings_hash = ?3, pairings_saved_at = ?4
            WHERE id = ?1
            ",
            params![event_id, json, hash, timestamp()],
        )?;

        if affected == 0 {
            return Err(Error::EventNotFound(event_id.to_string()));
        }
        info!(event_id, groups = pairings.group_count(), hash = &hash[..16], "Pairings written");
        Ok(())
    }

    /// Look up a person's display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn person_name(&self, id: &PersonId) -> Result<Option<String>> {
        let name = self
            .conn()?
            .query_row(
                "SELECT display_name FROM people WHERE id = ?1",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    /// Display names for everyone in a pairing document.
    ///
    /// Ids with no stored person fall back to the roster, then to the id.
    ///
    /// # Errors
    ///
    /// Returns an error if any lookup fails.
    pub fn pairing_names(
        &self,
        pairings: &PairingAssignment,
        roster: &Roster,
    ) -> Result<HashMap<PersonId, String>> {
        let mut names = HashMap::new();
        for (head, entry) in pairings.entries() {
            for id in std::iter::once(head).chain(entry.members()) {
                if names.contains_key(id) {
                    continue;
                }
                let name = match self.person_name(id)? {
                    Some(name) => name,
                    None => roster.display_name(id).to_string(),
                };
                names.insert(id.clone(), name);
            }
        }
        Ok(names)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.conn()?;
        let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |row| row.get(0))?) };

        let events = count("SELECT COUNT(*) FROM events")?;
        let people = count("SELECT COUNT(*) FROM people")?;
        let signups = count("SELECT COUNT(*) FROM signups")?;
        let events_with_pairings =
            count("SELECT COUNT(*) FROM events WHERE pairings IS NOT NULL AND pairings != '{}'")?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            events,
            people,
            signups,
            events_with_pairings,
            db_size_bytes,
        })
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<Event> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let date: Option<String> = row.get(2)?;
        let pairings_hash: Option<String> = row.get(3)?;
        let saved_at: Option<String> = row.get(4)?;

        let date = date.and_then(|d| match d.parse::<NaiveDate>() {
            Ok(date) => Some(date),
            Err(_) => {
                warn!(event_id = %id, date = %d, "Ignoring unreadable event date");
                None
            }
        });
        let pairings_saved_at = saved_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(Event {
            id,
            name,
            date,
            pairings_hash,
            pairings_saved_at,
        })
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn pace_from_columns(minutes: Option<u32>, seconds: Option<u32>) -> Option<Pace> {
    match (minutes, seconds) {
        (Some(minutes), seconds) => Some(Pace::new(minutes, seconds.unwrap_or(0))),
        (None, _) => None,
    }
}

#[async_trait]
impl PersistenceGateway for Storage {
    async fn load_roster(&self, event_id: &str) -> Result<Roster> {
        self.roster(event_id)
    }

    async fn load_pairings(&self, event_id: &str) -> Result<PairingAssignment> {
        self.pairings(event_id)
    }

    async fn save_pairings(&self, event_id: &str, pairings: &PairingAssignment) -> Result<()> {
        Storage::save_pairings(self, event_id, pairings)
    }

    async fn display_name(&self, person_id: &PersonId) -> Result<Option<String>> {
        self.person_name(person_id)
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of events.
    pub events: i64,
    /// Number of people.
    pub people: i64,
    /// Number of sign-ups across all events.
    pub signups: i64,
    /// Events with at least one saved pairing.
    pub events_with_pairings: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
