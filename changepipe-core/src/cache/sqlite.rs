//! SQLite-backed cache that survives process restarts.
//!
//! Each table carries an `expires_at` column holding a Unix timestamp in
//! seconds. Rows whose deadline has passed are ignored by reads and removed
//! by [`SqliteGeometryCache::purge_expired`].

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use super::{CacheError, GeometryCache};
use crate::{ChangesetId, ElementKey, NodeRecord, WayRecord};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS nodes (
        id INTEGER PRIMARY KEY,
        version INTEGER NOT NULL,
        lat REAL,
        lon REAL,
        expires_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS ways (
        id INTEGER PRIMARY KEY,
        version INTEGER NOT NULL,
        node_ids TEXT NOT NULL,
        expires_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS changesets (
        id INTEGER PRIMARY KEY,
        expires_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS changeset_members (
        changeset_id INTEGER NOT NULL,
        member TEXT NOT NULL,
        PRIMARY KEY (changeset_id, member)
    );
";

/// [`GeometryCache`] persisted in a SQLite database.
///
/// The connection is guarded by a mutex so the cache can be shared between
/// threads.
pub struct SqliteGeometryCache {
    connection: Mutex<Connection>,
    ttl: Duration,
}

impl fmt::Debug for SqliteGeometryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteGeometryCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SqliteGeometryCache {
    /// Open (or create) the cache database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Open`] when the file cannot be opened and
    /// [`CacheError::Database`] when the schema cannot be created.
    pub fn open<P: AsRef<Path>>(path: P, ttl: Duration) -> Result<Self, CacheError> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| CacheError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::initialise(connection, ttl)
    }

    /// Create a cache backed by a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Database`] when the schema cannot be created.
    pub fn open_in_memory(ttl: Duration) -> Result<Self, CacheError> {
        Self::initialise(Connection::open_in_memory()?, ttl)
    }

    fn initialise(connection: Connection, ttl: Duration) -> Result<Self, CacheError> {
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
            ttl,
        })
    }

    /// Delete every expired row, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the database or the clock fails.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = unix_now()?;
        let mut connection = self.lock()?;
        let transaction = connection.transaction()?;
        let mut removed = 0;
        removed += transaction.execute("DELETE FROM nodes WHERE expires_at <= ?1", params![now])?;
        removed += transaction.execute("DELETE FROM ways WHERE expires_at <= ?1", params![now])?;
        removed +=
            transaction.execute("DELETE FROM changesets WHERE expires_at <= ?1", params![now])?;
        transaction.execute(
            "DELETE FROM changeset_members
             WHERE changeset_id NOT IN (SELECT id FROM changesets)",
            [],
        )?;
        transaction.commit()?;
        Ok(removed)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.connection.lock().map_err(|_| CacheError::Poisoned)
    }

    fn deadline(&self) -> Result<u64, CacheError> {
        Ok(unix_now()?.saturating_add(self.ttl.as_secs()))
    }
}

fn unix_now() -> Result<u64, CacheError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|_| CacheError::Clock)
}

impl GeometryCache for SqliteGeometryCache {
    fn node(&self, id: u64) -> Result<Option<NodeRecord>, CacheError> {
        let now = unix_now()?;
        let connection = self.lock()?;
        let node = connection
            .query_row(
                "SELECT version, lat, lon FROM nodes WHERE id = ?1 AND expires_at > ?2",
                params![id, now],
                |row| {
                    Ok(NodeRecord {
                        id,
                        version: row.get(0)?,
                        lat: row.get(1)?,
                        lon: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(node)
    }

    fn remember_node(&self, node: &NodeRecord) -> Result<(), CacheError> {
        let expires_at = self.deadline()?;
        self.lock()?.execute(
            "INSERT OR REPLACE INTO nodes (id, version, lat, lon, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![node.id, node.version, node.lat, node.lon, expires_at],
        )?;
        Ok(())
    }

    fn way(&self, id: u64) -> Result<Option<WayRecord>, CacheError> {
        let now = unix_now()?;
        let row = self
            .lock()?
            .query_row(
                "SELECT version, node_ids FROM ways WHERE id = ?1 AND expires_at > ?2",
                params![id, now],
                |row| Ok((row.get::<_, u64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((version, encoded)) = row else {
            return Ok(None);
        };
        let node_ids = serde_json::from_str(&encoded)
            .map_err(|source| CacheError::InvalidNodeList { id, source })?;
        Ok(Some(WayRecord::new(id, version, node_ids)))
    }

    fn remember_way(&self, way: &WayRecord) -> Result<(), CacheError> {
        let expires_at = self.deadline()?;
        let encoded = serde_json::to_string(&way.node_ids).map_err(|source| {
            CacheError::InvalidNodeList {
                id: way.id,
                source,
            }
        })?;
        self.lock()?.execute(
            "INSERT OR REPLACE INTO ways (id, version, node_ids, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![way.id, way.version, encoded, expires_at],
        )?;
        Ok(())
    }

    fn changeset_members(&self, changeset: ChangesetId) -> Result<Vec<ElementKey>, CacheError> {
        let now = unix_now()?;
        let connection = self.lock()?;
        let mut statement = connection.prepare(
            "SELECT m.member FROM changeset_members AS m
             JOIN changesets AS c ON c.id = m.changeset_id
             WHERE m.changeset_id = ?1 AND c.expires_at > ?2",
        )?;
        let rendered = statement
            .query_map(params![changeset.get(), now], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        rendered
            .iter()
            .map(|key| key.parse::<ElementKey>().map_err(CacheError::from))
            .collect()
    }

    fn add_changeset_member(
        &self,
        changeset: ChangesetId,
        key: ElementKey,
    ) -> Result<(), CacheError> {
        let now = unix_now()?;
        let expires_at = self.deadline()?;
        let mut connection = self.lock()?;
        let transaction = connection.transaction()?;
        let expired = transaction
            .query_row(
                "SELECT expires_at <= ?2 FROM changesets WHERE id = ?1",
                params![changeset.get(), now],
                |row| row.get::<_, bool>(0),
            )
            .optional()?
            .unwrap_or(true);
        if expired {
            transaction.execute(
                "DELETE FROM changeset_members WHERE changeset_id = ?1",
                params![changeset.get()],
            )?;
        }
        transaction.execute(
            "INSERT OR REPLACE INTO changesets (id, expires_at) VALUES (?1, ?2)",
            params![changeset.get(), expires_at],
        )?;
        transaction.execute(
            "INSERT OR IGNORE INTO changeset_members (changeset_id, member) VALUES (?1, ?2)",
            params![changeset.get(), key.to_string()],
        )?;
        transaction.commit()?;
        Ok(())
    }
}
