//! Core SQLite-backed store

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Profile, ProfileField, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    identity   TEXT PRIMARY KEY,
    state      TEXT,
    data       TEXT NOT NULL DEFAULT '{}',
    updated_at INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS profiles (
    identity     TEXT PRIMARY KEY,
    name         TEXT,
    age          TEXT,
    companions   TEXT,
    travel_style TEXT,
    food_type    TEXT,
    interests    TEXT
);
CREATE TABLE IF NOT EXISTS itineraries (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    identity    TEXT NOT NULL,
    destination TEXT,
    dates       TEXT,
    budget      TEXT,
    itinerary   TEXT NOT NULL,
    created_at  INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS itineraries_identity ON itineraries (identity, created_at);
";

/// Raw session row. State and data are decoded by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub identity: String,
    /// State tag; `None` means idle
    pub state: Option<String>,
    /// JSON object with the session data
    pub data: String,
    pub mode: Option<String>,
    /// Last write (unix ms)
    pub updated_at: i64,
}

impl SessionRecord {
    pub fn new(identity: impl Into<String>, state: Option<String>, data: String, mode: Option<String>) -> Self {
        Self {
            identity: identity.into(),
            state,
            data,
            mode,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// One generated itinerary, kept after the session moves on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryRecord {
    /// Row id; 0 until stored
    pub id: i64,
    pub identity: String,
    pub destination: Option<String>,
    pub dates: Option<String>,
    pub budget: Option<String>,
    pub itinerary: String,
    /// Generation time (unix ms)
    pub created_at: i64,
}

impl ItineraryRecord {
    pub fn new(
        identity: impl Into<String>,
        destination: Option<String>,
        dates: Option<String>,
        budget: Option<String>,
        itinerary: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            identity: identity.into(),
            destination,
            dates,
            budget,
            itinerary: itinerary.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// An identity with at least one stored itinerary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traveller {
    pub identity: String,
    pub name: Option<String>,
    pub itineraries: u64,
    /// Most recent itinerary (unix ms)
    pub last_itinerary_at: i64,
}

/// Session, profile and itinerary store
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Open or create the store inside the given directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(crate::DB_FILE);
        let conn = Connection::open(&path)?;
        let store = Self { conn, path };
        store.migrate()?;
        debug!(path = ?store.path, "Opened session store");
        Ok(store)
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn migrate(&self) -> Result<(), StoreError> {
        debug!("migrate: called");
        self.conn.execute_batch(SCHEMA)?;

        // Databases created before sessions carried a mode lack the column
        let has_mode = {
            let mut stmt = self.conn.prepare("PRAGMA table_info(sessions)")?;
            let columns = stmt.query_map([], |row| row.get::<_, String>(1))?;
            let mut found = false;
            for column in columns {
                if column? == "mode" {
                    found = true;
                }
            }
            found
        };
        if !has_mode {
            info!("Adding mode column to sessions table");
            self.conn.execute("ALTER TABLE sessions ADD COLUMN mode TEXT", [])?;
        }
        Ok(())
    }

    // ---- sessions ----

    /// Insert or replace the session row for an identity
    pub fn put_session(&mut self, record: &SessionRecord) -> Result<(), StoreError> {
        debug!(identity = %record.identity, state = ?record.state, "put_session: called");
        self.conn.execute(
            "INSERT INTO sessions (identity, state, data, mode, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(identity) DO UPDATE SET
                state = excluded.state,
                data = excluded.data,
                mode = excluded.mode,
                updated_at = excluded.updated_at",
            params![
                record.identity,
                record.state,
                record.data,
                record.mode,
                record.updated_at
            ],
        )?;
        Ok(())
    }

    pub fn get_session(&self, identity: &str) -> Result<Option<SessionRecord>, StoreError> {
        debug!(%identity, "get_session: called");
        let record = self
            .conn
            .query_row(
                "SELECT identity, state, data, mode, updated_at FROM sessions WHERE identity = ?1",
                params![identity],
                |row| {
                    Ok(SessionRecord {
                        identity: row.get(0)?,
                        state: row.get(1)?,
                        data: row.get::<_, Option<String>>(2)?.unwrap_or_else(|| "{}".to_string()),
                        mode: row.get(3)?,
                        updated_at: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Delete the session row. Returns true when a row existed.
    pub fn delete_session(&mut self, identity: &str) -> Result<bool, StoreError> {
        debug!(%identity, "delete_session: called");
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE identity = ?1", params![identity])?;
        Ok(removed > 0)
    }

    /// All sessions, most recently updated first
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        debug!("list_sessions: called");
        let mut stmt = self
            .conn
            .prepare("SELECT identity, state, data, mode, updated_at FROM sessions ORDER BY updated_at DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok(SessionRecord {
                identity: row.get(0)?,
                state: row.get(1)?,
                data: row.get::<_, Option<String>>(2)?.unwrap_or_else(|| "{}".to_string()),
                mode: row.get(3)?,
                updated_at: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            })
        })?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    // ---- profiles ----

    /// Write a single profile field, creating the profile row if needed
    pub fn set_profile(&mut self, identity: &str, field: ProfileField, value: &str) -> Result<(), StoreError> {
        debug!(%identity, %field, "set_profile: called");
        // Column name comes from the closed ProfileField enum, never from input
        let sql = format!(
            "INSERT INTO profiles (identity, {col}) VALUES (?1, ?2)
             ON CONFLICT(identity) DO UPDATE SET {col} = excluded.{col}",
            col = field.column()
        );
        self.conn.execute(&sql, params![identity, value])?;
        Ok(())
    }

    /// Write a profile field named by string. Unknown names are rejected.
    pub fn set_profile_field(&mut self, identity: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let field = field.parse::<ProfileField>().inspect_err(|_| {
            warn!(%identity, %field, "Rejected write to unknown profile field");
        })?;
        self.set_profile(identity, field, value)
    }

    /// Profile for an identity; empty when none was stored
    pub fn get_profile(&self, identity: &str) -> Result<Profile, StoreError> {
        debug!(%identity, "get_profile: called");
        let profile = self
            .conn
            .query_row(
                "SELECT name, age, companions, travel_style, food_type, interests FROM profiles WHERE identity = ?1",
                params![identity],
                |row| {
                    Ok(Profile {
                        name: row.get(0)?,
                        age: row.get(1)?,
                        companions: row.get(2)?,
                        travel_style: row.get(3)?,
                        food_type: row.get(4)?,
                        interests: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(profile.unwrap_or_default())
    }

    /// Identities that have a profile row
    pub fn list_profiles(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT identity FROM profiles ORDER BY identity")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut identities = Vec::new();
        for row in rows {
            identities.push(row?);
        }
        Ok(identities)
    }

    // ---- itineraries ----

    /// Append an itinerary to the history. Returns the new row id.
    pub fn add_itinerary(&mut self, record: &ItineraryRecord) -> Result<i64, StoreError> {
        debug!(identity = %record.identity, destination = ?record.destination, "add_itinerary: called");
        self.conn.execute(
            "INSERT INTO itineraries (identity, destination, dates, budget, itinerary, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.identity,
                record.destination,
                record.dates,
                record.budget,
                record.itinerary,
                record.created_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Itineraries of one identity, newest first
    pub fn list_itineraries(&self, identity: &str) -> Result<Vec<ItineraryRecord>, StoreError> {
        debug!(%identity, "list_itineraries: called");
        let mut stmt = self.conn.prepare(
            "SELECT id, identity, destination, dates, budget, itinerary, created_at
             FROM itineraries WHERE identity = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![identity], |row| {
            Ok(ItineraryRecord {
                id: row.get(0)?,
                identity: row.get(1)?,
                destination: row.get(2)?,
                dates: row.get(3)?,
                budget: row.get(4)?,
                itinerary: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        let mut itineraries = Vec::new();
        for row in rows {
            itineraries.push(row?);
        }
        Ok(itineraries)
    }

    /// Identities with stored itineraries, ordered by profile name
    pub fn travellers(&self) -> Result<Vec<Traveller>, StoreError> {
        debug!("travellers: called");
        let mut stmt = self.conn.prepare(
            "SELECT i.identity, p.name, COUNT(*), MAX(i.created_at)
             FROM itineraries i LEFT JOIN profiles p ON p.identity = i.identity
             GROUP BY i.identity
             ORDER BY COALESCE(p.name, i.identity)",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Traveller {
                identity: row.get(0)?,
                name: row.get(1)?,
                itineraries: row.get::<_, i64>(2)?.try_into().unwrap_or_default(),
                last_itinerary_at: row.get(3)?,
            })
        })?;
        let mut travellers = Vec::new();
        for row in rows {
            travellers.push(row?);
        }
        Ok(travellers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(identity: &str, state: Option<&str>, data: &str) -> SessionRecord {
        SessionRecord::new(identity, state.map(String::from), data.to_string(), None)
    }

    #[test]
    fn test_session_roundtrip() {
        let temp = TempDir::new().unwrap();
        let mut store = Store::open(temp.path()).unwrap();

        let rec = record("5511", Some("AWAITING_DATES"), r#"{"destino":"Lisboa"}"#);
        store.put_session(&rec).unwrap();

        let loaded = store.get_session("5511").unwrap().unwrap();
        assert_eq!(loaded, rec);
        assert!(store.get_session("other").unwrap().is_none());
    }

    #[test]
    fn test_put_session_replaces_existing() {
        let mut store = Store::open_in_memory().unwrap();
        store.put_session(&record("a", Some("AWAITING_DATES"), "{}")).unwrap();
        store
            .put_session(&SessionRecord::new("a", None, "{}".into(), Some("RAG".into())))
            .unwrap();

        let loaded = store.get_session("a").unwrap().unwrap();
        assert_eq!(loaded.state, None);
        assert_eq!(loaded.mode.as_deref(), Some("RAG"));
        assert_eq!(store.list_sessions().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_session() {
        let mut store = Store::open_in_memory().unwrap();
        store.put_session(&record("a", Some("AWAITING_BUDGET"), "{}")).unwrap();

        assert!(store.delete_session("a").unwrap());
        assert!(!store.delete_session("a").unwrap());
        assert!(store.get_session("a").unwrap().is_none());
    }

    #[test]
    fn test_sessions_survive_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = Store::open(temp.path()).unwrap();
            store.put_session(&record("a", Some("ITINERARY_READY"), "{}")).unwrap();
        }
        let store = Store::open(temp.path()).unwrap();
        assert_eq!(
            store.get_session("a").unwrap().unwrap().state.as_deref(),
            Some("ITINERARY_READY")
        );
    }

    #[test]
    fn test_migration_adds_mode_column() {
        let temp = TempDir::new().unwrap();
        {
            let conn = Connection::open(temp.path().join(crate::DB_FILE)).unwrap();
            conn.execute_batch(
                "CREATE TABLE sessions (identity TEXT PRIMARY KEY, state TEXT, data TEXT NOT NULL DEFAULT '{}', updated_at INTEGER NOT NULL DEFAULT 0);
                 INSERT INTO sessions (identity, state, data) VALUES ('old', 'AWAITING_DATES', '{}');",
            )
            .unwrap();
        }

        let mut store = Store::open(temp.path()).unwrap();
        let old = store.get_session("old").unwrap().unwrap();
        assert_eq!(old.mode, None);

        store
            .put_session(&SessionRecord::new("new", None, "{}".into(), Some("RAG".into())))
            .unwrap();
        assert_eq!(store.get_session("new").unwrap().unwrap().mode.as_deref(), Some("RAG"));
    }

    fn itinerary(identity: &str, destination: &str, created_at: i64) -> ItineraryRecord {
        ItineraryRecord {
            created_at,
            ..ItineraryRecord::new(
                identity,
                Some(destination.to_string()),
                Some("10/07 a 18/07".to_string()),
                Some("R$ 8.000".to_string()),
                format!("| DATA | LOCAL |\n| 10/07 | {} |", destination),
            )
        }
    }

    #[test]
    fn test_itineraries_newest_first() {
        let mut store = Store::open_in_memory().unwrap();
        let first = store.add_itinerary(&itinerary("a", "Paris", 1_000)).unwrap();
        let second = store.add_itinerary(&itinerary("a", "Roma", 2_000)).unwrap();
        store.add_itinerary(&itinerary("b", "Lisboa", 1_500)).unwrap();
        assert!(second > first);

        let history = store.list_itineraries("a").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second);
        assert_eq!(history[0].destination.as_deref(), Some("Roma"));
        assert_eq!(history[1].destination.as_deref(), Some("Paris"));
        assert!(store.list_itineraries("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_itineraries_survive_session_delete() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = Store::open(temp.path()).unwrap();
            store.put_session(&record("a", Some("ITINERARY_READY"), "{}")).unwrap();
            store.add_itinerary(&itinerary("a", "Roma", 1_000)).unwrap();
            store.delete_session("a").unwrap();
        }
        let store = Store::open(temp.path()).unwrap();
        let history = store.list_itineraries("a").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].budget.as_deref(), Some("R$ 8.000"));
    }

    #[test]
    fn test_travellers_join_profiles() {
        let mut store = Store::open_in_memory().unwrap();
        store.set_profile("b", ProfileField::Name, "Bruno").unwrap();
        store.set_profile("c", ProfileField::Name, "Carla").unwrap();
        store.add_itinerary(&itinerary("b", "Roma", 1_000)).unwrap();
        store.add_itinerary(&itinerary("b", "Paris", 3_000)).unwrap();
        store.add_itinerary(&itinerary("5521988887777", "Lisboa", 2_000)).unwrap();

        let travellers = store.travellers().unwrap();
        assert_eq!(travellers.len(), 2);
        assert_eq!(travellers[0].identity, "5521988887777");
        assert_eq!(travellers[0].name, None);
        assert_eq!(
            travellers[1],
            Traveller {
                identity: "b".to_string(),
                name: Some("Bruno".to_string()),
                itineraries: 2,
                last_itinerary_at: 3_000,
            }
        );
    }

    #[test]
    fn test_profile_defaults_to_empty() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_profile("nobody").unwrap(), Profile::default());
    }

    #[test]
    fn test_profile_fields_accumulate() {
        let mut store = Store::open_in_memory().unwrap();
        store.set_profile("a", ProfileField::Name, "Ana").unwrap();
        store.set_profile("a", ProfileField::Interests, "Museus,Natureza").unwrap();
        store.set_profile("a", ProfileField::Name, "Ana Maria").unwrap();

        let profile = store.get_profile("a").unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ana Maria"));
        assert_eq!(profile.interest_list(), vec!["Museus", "Natureza"]);
        assert_eq!(profile.age, None);
        assert_eq!(store.list_profiles().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn test_set_profile_field_rejects_unknown_column() {
        let mut store = Store::open_in_memory().unwrap();
        let err = store.set_profile_field("a", "identity", "x").unwrap_err();
        assert!(matches!(err, StoreError::InvalidField(_)));

        store.set_profile_field("a", "food_type", "vegana").unwrap();
        assert_eq!(store.get_profile("a").unwrap().food_type.as_deref(), Some("vegana"));
    }
}
