// ============================================================================
// SQLite Store
// Durable ordered key/value storage for requirements and price history
// ============================================================================

use crate::domain::{timestamp_key, DoctrineRequirement, PriceObservation};
use crate::errors::{StoreError, StoreResult};
use crate::store::Repository;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS requirements (
        name  TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    ) WITHOUT ROWID;

    CREATE TABLE IF NOT EXISTS price_history (
        doctrine TEXT NOT NULL,
        ts       TEXT NOT NULL,
        value    TEXT NOT NULL,
        PRIMARY KEY (doctrine, ts)
    ) WITHOUT ROWID;
";

/// `Repository` backed by a single SQLite database
///
/// The connection sits behind a mutex, so writers are serialized and every
/// multi-key operation runs inside one transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure both namespaces exist
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "opened doctrine store");
        Self::with_connection(conn)
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn put_observation(tx: &Transaction<'_>, observation: &PriceObservation) -> StoreResult<()> {
        let value = serde_json::to_string(observation)?;
        tx.execute(
            "INSERT OR REPLACE INTO price_history (doctrine, ts, value) VALUES (?1, ?2, ?3)",
            params![observation.doctrine_name, observation.timestamp_key(), value],
        )?;
        Ok(())
    }

    /// Upsert `requirements` and delete every other stored name; returns the
    /// number of deleted records
    fn put_requirement_set(
        tx: &Transaction<'_>,
        requirements: &[DoctrineRequirement],
    ) -> StoreResult<usize> {
        let mut keep: HashSet<&str> = HashSet::with_capacity(requirements.len());
        for requirement in requirements {
            keep.insert(requirement.name.as_str());
            let value = serde_json::to_string(requirement)?;
            tx.execute(
                "INSERT OR REPLACE INTO requirements (name, value) VALUES (?1, ?2)",
                params![requirement.name, value],
            )?;
        }

        let stored: Vec<String> = {
            let mut stmt = tx.prepare("SELECT name FROM requirements")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            names
        };
        let mut removed = 0usize;
        for name in stored.iter().filter(|name| !keep.contains(name.as_str())) {
            tx.execute("DELETE FROM requirements WHERE name = ?1", params![name])?;
            removed += 1;
        }
        Ok(removed)
    }

    fn decode_all<T: serde::de::DeserializeOwned>(rows: Vec<String>) -> StoreResult<Vec<T>> {
        rows.iter()
            .map(|raw| serde_json::from_str(raw).map_err(StoreError::from))
            .collect()
    }
}

impl Repository for SqliteStore {
    fn get_requirement(&self, name: &str) -> StoreResult<Option<DoctrineRequirement>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM requirements WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_requirement(&self, name: &str, requirement: &DoctrineRequirement) -> StoreResult<()> {
        let conn = self.conn.lock();

        if !requirement.is_active() {
            conn.execute("DELETE FROM requirements WHERE name = ?1", params![name])?;
            debug!(doctrine = %name, "deleted requirement");
            return Ok(());
        }

        let value = serde_json::to_string(requirement)?;
        conn.execute(
            "INSERT OR REPLACE INTO requirements (name, value) VALUES (?1, ?2)",
            params![name, value],
        )?;
        Ok(())
    }

    fn list_requirements(&self) -> StoreResult<Vec<DoctrineRequirement>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT value FROM requirements ORDER BY name")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Self::decode_all(rows)
    }

    fn replace_all_requirements(&self, requirements: &[DoctrineRequirement]) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = Self::put_requirement_set(&tx, requirements)?;
        tx.commit()?;
        info!(
            written = requirements.len(),
            removed, "replaced requirement set"
        );
        Ok(())
    }

    fn record_price_observation(&self, observation: &PriceObservation) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::put_observation(&tx, observation)?;
        tx.commit()?;
        Ok(())
    }

    fn replace_all_price_observations(&self, observations: &[PriceObservation]) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for observation in observations {
            Self::put_observation(&tx, observation)?;
        }
        tx.commit()?;
        debug!(written = observations.len(), "wrote price observation batch");
        Ok(())
    }

    fn apply_migration(
        &self,
        requirements: &[DoctrineRequirement],
        observations: &[PriceObservation],
    ) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::put_requirement_set(&tx, requirements)?;
        for observation in observations {
            Self::put_observation(&tx, observation)?;
        }
        tx.commit()?;
        info!(
            requirements = requirements.len(),
            observations = observations.len(),
            "applied migration"
        );
        Ok(())
    }

    fn query_prices_in_range(
        &self,
        doctrine_name: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PriceObservation>> {
        let conn = self.conn.lock();
        let (start, end) = (timestamp_key(start), timestamp_key(end));

        let rows = match doctrine_name {
            Some(doctrine) => {
                let mut stmt = conn.prepare(
                    "SELECT value FROM price_history
                     WHERE doctrine = ?1 AND ts >= ?2 AND ts <= ?3
                     ORDER BY ts",
                )?;
                let rows = stmt
                    .query_map(params![doctrine, start, end], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            },
            None => {
                let mut stmt = conn.prepare(
                    "SELECT value FROM price_history
                     WHERE ts >= ?1 AND ts <= ?2
                     ORDER BY doctrine, ts",
                )?;
                let rows = stmt
                    .query_map(params![start, end], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            },
        };

        Self::decode_all(rows)
    }

    fn last_n_prices(&self, doctrine_name: &str, n: usize) -> StoreResult<Vec<PriceObservation>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(n).unwrap_or(i64::MAX);

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT value FROM price_history WHERE doctrine = ?1 ORDER BY ts DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![doctrine_name, limit], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Self::decode_all(rows)
    }

    fn list_price_observations(&self) -> StoreResult<Vec<PriceObservation>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT value FROM price_history ORDER BY doctrine, ts")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Self::decode_all(rows)
    }
}
