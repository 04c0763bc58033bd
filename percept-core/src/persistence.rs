//! SQLite persistence for persona state.
//!
//! Each agent's [`Persona`] is serialised to JSON and stored in one row:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS personas (
//!     agent_id   TEXT PRIMARY KEY,
//!     name       TEXT NOT NULL,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! JSON inside a BLOB keeps the schema stable as memory types evolve. An
//! optional CRC-32 of the blob detects save corruption.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info, info_span, warn};

use crate::config::PersistenceConfig;
use crate::error::Result;
use crate::metrics::spans;
use crate::persona::Persona;
use crate::types::AgentId;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS personas (
    agent_id   TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as a lowercase hex string.
fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309 / ITU-T V.42), bitwise.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// PersistenceEngine
// ---------------------------------------------------------------------------

/// Handle to an open SQLite database of [`Persona`]s.
///
/// ```no_run
/// # use percept_core::persistence::PersistenceEngine;
/// # use percept_core::config::{ImportanceConfig, PerceptionConfig, PersistenceConfig};
/// # use percept_core::persona::{Persona, Scratch};
/// # use percept_core::types::TileCoord;
/// let engine = PersistenceEngine::open("town.db", &PersistenceConfig::default())?;
/// let scratch = Scratch::new("Ann", TileCoord::new(0, 0), &PerceptionConfig::default());
/// let persona = Persona::new(scratch, &ImportanceConfig::default());
/// engine.save_persona(&persona)?;
/// let loaded = engine.load_persona(&persona.id)?;
/// # Ok::<(), percept_core::error::PerceptError>(())
/// ```
pub struct PersistenceEngine {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for PersistenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceEngine")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersistenceEngine {
    /// Open (or create) an SQLite database at `path`.
    ///
    /// WAL mode is enabled when `config.wal_mode` is `true`.
    ///
    /// # Errors
    ///
    /// Returns `PerceptError::Database` on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;
        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Persona store opened"
        );

        Ok(Self {
            conn,
            config: *config,
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns `PerceptError::Database` on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: *config,
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Save (upsert) a persona.
    ///
    /// # Errors
    ///
    /// Returns `PerceptError::Serialization` if JSON encoding fails, or
    /// `PerceptError::Database` on SQLite failures.
    pub fn save_persona(&self, persona: &Persona) -> Result<()> {
        let _span = info_span!(spans::PERSIST_SAVE, agent = %persona.id).entered();
        let start = Instant::now();

        let json = serde_json::to_vec(persona)?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO personas (agent_id, name, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(agent_id) DO UPDATE SET
                name = excluded.name,
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![persona.id.0.to_string(), persona.name(), json, now, checksum],
        )?;

        debug!(
            agent = %persona.id,
            name = persona.name(),
            nodes = persona.memory.len(),
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved persona"
        );
        Ok(())
    }

    /// Load a persona, or `None` if nothing is saved under `agent_id`.
    ///
    /// A checksum mismatch is logged as a warning; the data is still
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `PerceptError::Serialization` if JSON decoding fails, or
    /// `PerceptError::Database` on SQLite failures.
    pub fn load_persona(&self, agent_id: &AgentId) -> Result<Option<Persona>> {
        let _span = info_span!(spans::PERSIST_LOAD, agent = %agent_id).entered();
        let start = Instant::now();

        let mut stmt = self
            .conn
            .prepare_cached("SELECT data, checksum FROM personas WHERE agent_id = ?1")?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![agent_id.0.to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled
            && let Some(expected) = stored_checksum
        {
            let actual = crc32_hex(&data);
            if expected != actual {
                warn!(
                    agent = %agent_id,
                    %expected,
                    %actual,
                    "Checksum mismatch, possible save corruption"
                );
            }
        }

        let persona: Persona = serde_json::from_slice(&data)?;
        debug!(
            agent = %agent_id,
            nodes = persona.memory.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded persona"
        );
        Ok(Some(persona))
    }

    /// Delete a persona. Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `PerceptError::Database` on SQLite failures.
    pub fn delete_persona(&self, agent_id: &AgentId) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM personas WHERE agent_id = ?1",
            params![agent_id.0.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// All saved agents as `(id, name)`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `PerceptError::Database` on SQLite failures.
    pub fn list_agents(&self) -> Result<Vec<(AgentId, String)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT agent_id, name FROM personas ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut agents = Vec::new();
        for row in rows {
            let (id_str, name) = row?;
            match uuid::Uuid::parse_str(&id_str) {
                Ok(uuid) => agents.push((AgentId(uuid), name)),
                Err(_) => warn!(id = %id_str, "Skipping row with invalid UUID"),
            }
        }
        Ok(agents)
    }

    /// Number of saved personas.
    ///
    /// # Errors
    ///
    /// Returns `PerceptError::Database` on SQLite failures.
    pub fn agent_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM personas", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns `PerceptError::Database` on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Persona store backup completed"
        );
        Ok(())
    }

    /// Path of the underlying database (`:memory:` for in-memory stores).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
