//! The storage module persists the user's session (scraped trail, preferences
//! and generated itinerary) in a local SQLite file so that separate commands
//! can hand data to each other explicitly.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::trail::TrailRecord;

/// Everything one user has produced so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Trail-detail URL the trail was scraped from, if any.
    pub url: Option<String>,
    pub trail: Option<TrailRecord>,
    pub preferences: Vec<String>,
    pub itinerary: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            url: None,
            trail: None,
            preferences: Vec::new(),
            itinerary: None,
            updated_at: Utc::now(),
        }
    }
}

impl Session {
    /// Starts over with a new trail. Preferences and itinerary belonged to the
    /// previous trail and are dropped.
    pub fn replace_trail(&mut self, url: Option<String>, trail: TrailRecord) {
        self.url = url;
        self.trail = Some(trail);
        self.preferences.clear();
        self.itinerary = None;
    }

    /// Records an itinerary together with the preferences it was built from.
    pub fn set_itinerary(&mut self, preferences: Vec<String>, itinerary: String) {
        self.preferences = preferences;
        self.itinerary = Some(itinerary);
    }

    /// Returns the trail or explains which command produces it.
    ///
    /// # Errors
    ///
    /// Returns an error when no trail has been scraped or entered yet.
    pub fn require_trail(&self) -> Result<&TrailRecord> {
        self.trail
            .as_ref()
            .context("No trail in session. Run `scrape` or `enter` first.")
    }

    /// Returns the itinerary or explains which command produces it.
    ///
    /// # Errors
    ///
    /// Returns an error when no itinerary has been generated yet.
    pub fn require_itinerary(&self) -> Result<&str> {
        self.itinerary
            .as_deref()
            .context("No itinerary in session. Run `generate` first.")
    }
}

/// Storage provides database operations for loading and saving a [`Session`].
pub struct Storage {
    conn: Connection,
}

struct SessionRow {
    url: Option<String>,
    trail: Option<String>,
    preferences: String,
    itinerary: Option<String>,
    updated_at: i64,
}

impl Storage {
    /// Opens (or creates) the session database at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or its schema created
    pub fn new(database_path: &str) -> Result<Self> {
        let conn = Connection::open(database_path)
            .with_context(|| format!("Unable to open session database {database_path}"))?;

        Self::init_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Initializes the single-row session table if it doesn't exist.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                url TEXT NULL,
                trail TEXT NULL,
                preferences TEXT NOT NULL,
                itinerary TEXT NULL,
                updated_at INTEGER NOT NULL
            )",
            params![],
        )?;

        Ok(())
    }

    /// Loads the stored session, or an empty one if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails or stored data is corrupt
    pub fn load_session(&self) -> Result<Session> {
        let row: Option<SessionRow> = self
            .conn
            .query_row(
                "SELECT url, trail, preferences, itinerary, updated_at FROM session WHERE id = 1",
                [],
                |row| {
                    Ok(SessionRow {
                        url: row.get(0)?,
                        trail: row.get(1)?,
                        preferences: row.get(2)?,
                        itinerary: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .context("Unable to fetch session row")?;

        match row {
            Some(row) => row.try_into(),
            None => Ok(Session::default()),
        }
    }

    /// Writes the session, replacing whatever was stored before.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database operation fails
    pub fn save_session(&self, session: &Session) -> Result<()> {
        let trail = session
            .trail
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let preferences = serde_json::to_string(&session.preferences)?;

        self.conn.execute(
            "INSERT OR REPLACE INTO session (id, url, trail, preferences, itinerary, updated_at) VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                session.url.as_deref(),
                trail,
                preferences,
                session.itinerary.as_deref(),
                Utc::now().timestamp(),
            ],
        )?;

        Ok(())
    }
}

impl TryFrom<SessionRow> for Session {
    type Error = anyhow::Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        let trail = row
            .trail
            .as_deref()
            .map(serde_json::from_str::<TrailRecord>)
            .transpose()
            .context("Stored trail record is corrupt")?;
        let preferences = serde_json::from_str(&row.preferences)
            .context("Stored preferences are corrupt")?;
        let updated_at = DateTime::from_timestamp(row.updated_at, 0)
            .context("Stored timestamp is out of range")?;

        Ok(Self {
            url: row.url,
            trail,
            preferences,
            itinerary: row.itinerary,
            updated_at,
        })
    }
}
