//! `SQLite` schema definitions for guidepair.
//!
//! The `pairings` column on `events` holds the whole pairing document as
//! JSON. It is written in one statement on every save.

/// SQL statement to create the events table.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    event_date TEXT,
    pairings TEXT,
    pairings_hash TEXT,
    pairings_saved_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the people table.
pub const CREATE_PEOPLE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS people (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    role TEXT NOT NULL,
    pace_minutes INTEGER,
    pace_seconds INTEGER
)
";

/// SQL statement to create the sign-ups table.
pub const CREATE_SIGNUPS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS signups (
    event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    person_id TEXT NOT NULL REFERENCES people(id) ON DELETE CASCADE,
    role TEXT NOT NULL,
    status TEXT NOT NULL,
    signed_up_at TEXT NOT NULL,
    PRIMARY KEY (event_id, person_id)
)
";

/// SQL statement to create an index on sign-ups by event for roster loads.
pub const CREATE_SIGNUPS_EVENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_signups_event ON signups(event_id, signed_up_at)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_EVENTS_TABLE,
    CREATE_PEOPLE_TABLE,
    CREATE_SIGNUPS_TABLE,
    CREATE_SIGNUPS_EVENT_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_events_table_holds_pairing_document() {
        assert!(CREATE_EVENTS_TABLE.contains("id TEXT PRIMARY KEY"));
        assert!(CREATE_EVENTS_TABLE.contains("pairings TEXT"));
        assert!(CREATE_EVENTS_TABLE.contains("pairings_hash TEXT"));
    }

    #[test]
    fn test_signups_keyed_by_event_and_person() {
        assert!(CREATE_SIGNUPS_TABLE.contains("PRIMARY KEY (event_id, person_id)"));
        assert!(CREATE_SIGNUPS_TABLE.contains("status TEXT NOT NULL"));
    }
}
