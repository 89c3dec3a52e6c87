//! Time-bounded storage of node locations, way references and changeset
//! membership.
//!
//! The [`GeometryCache`] trait is the seam between the resolvers and the
//! backing store. Every write refreshes the time-to-live of the record it
//! touches; a read past the time-to-live behaves exactly like a miss.

use std::time::Duration;

use thiserror::Error;

use crate::{ChangesetId, ElementKey, NodeRecord, ParseKeyError, WayRecord};

mod memory;
#[cfg(feature = "store-sqlite")]
mod sqlite;

pub use memory::MemoryGeometryCache;
#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteGeometryCache;

/// Lifetime of a cache record after its last write.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Errors raised by a cache backend.
///
/// Cache failures are fatal to the caller; there is no fallback store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A lock guarding the in-memory state was poisoned by a panic.
    #[error("cache state lock was poisoned")]
    Poisoned,
    /// The system clock reported a time before the Unix epoch.
    #[error("system clock is set before the Unix epoch")]
    Clock,
    /// A stored member key could not be parsed.
    #[error("cache holds a malformed member key: {0}")]
    InvalidKey(#[from] ParseKeyError),
    /// Opening the SQLite database failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to open SQLite cache at {path:?}: {source}")]
    Open {
        /// Location of the database on disk.
        path: std::path::PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A stored way reference list could not be decoded.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to decode node references of way {id}: {source}")]
    InvalidNodeList {
        /// Identifier of the affected way.
        id: u64,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// Generic SQLite error while reading or writing.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Key-addressed, TTL-bounded store used by the resolvers.
///
/// Implementations must be safe to share between threads resolving
/// different members of the same changeset; concurrent writes of the same
/// record may land in any order.
///
/// # Examples
///
/// ```
/// use changepipe_core::{GeometryCache, MemoryGeometryCache, NodeRecord};
///
/// # fn main() -> Result<(), changepipe_core::CacheError> {
/// let cache = MemoryGeometryCache::default();
/// cache.remember_node(&NodeRecord::new(1, 1, 51.5, -0.1))?;
/// let node = cache.node(1)?.expect("node was just written");
/// assert_eq!(node.version, 1);
/// # Ok(())
/// # }
/// ```
pub trait GeometryCache {
    /// Look up a node record.
    fn node(&self, id: u64) -> Result<Option<NodeRecord>, CacheError>;

    /// Store a node record and refresh its time-to-live.
    fn remember_node(&self, node: &NodeRecord) -> Result<(), CacheError>;

    /// Look up a way record.
    fn way(&self, id: u64) -> Result<Option<WayRecord>, CacheError>;

    /// Store a way record and refresh its time-to-live.
    fn remember_way(&self, way: &WayRecord) -> Result<(), CacheError>;

    /// Keys of the elements a changeset touched, in no particular order.
    fn changeset_members(&self, changeset: ChangesetId) -> Result<Vec<ElementKey>, CacheError>;

    /// Add `key` to the changeset's member set and refresh the set's
    /// time-to-live. Adding a key twice has no further effect.
    fn add_changeset_member(&self, changeset: ChangesetId, key: ElementKey)
    -> Result<(), CacheError>;
}

impl<T: GeometryCache + ?Sized> GeometryCache for &T {
    fn node(&self, id: u64) -> Result<Option<NodeRecord>, CacheError> {
        (**self).node(id)
    }

    fn remember_node(&self, node: &NodeRecord) -> Result<(), CacheError> {
        (**self).remember_node(node)
    }

    fn way(&self, id: u64) -> Result<Option<WayRecord>, CacheError> {
        (**self).way(id)
    }

    fn remember_way(&self, way: &WayRecord) -> Result<(), CacheError> {
        (**self).remember_way(way)
    }

    fn changeset_members(&self, changeset: ChangesetId) -> Result<Vec<ElementKey>, CacheError> {
        (**self).changeset_members(changeset)
    }

    fn add_changeset_member(
        &self,
        changeset: ChangesetId,
        key: ElementKey,
    ) -> Result<(), CacheError> {
        (**self).add_changeset_member(changeset, key)
    }
}
