//! In-process cache with per-record expiry.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{CacheError, DEFAULT_CACHE_TTL, GeometryCache};
use crate::{ChangesetId, ElementKey, NodeRecord, WayRecord};

#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Expiring<T> {
    fn live(&self, now: Instant) -> Option<&T> {
        match self.expires_at {
            Some(deadline) if now >= deadline => None,
            _ => Some(&self.value),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<u64, Expiring<NodeRecord>>,
    ways: HashMap<u64, Expiring<WayRecord>>,
    changesets: HashMap<ChangesetId, Expiring<HashSet<ElementKey>>>,
}

/// Thread-safe in-memory [`GeometryCache`].
///
/// Records expire `ttl` after their last write. A zero `ttl` makes every
/// record expire immediately, which is occasionally handy in tests.
#[derive(Debug)]
pub struct MemoryGeometryCache {
    ttl: Duration,
    state: Mutex<State>,
}

impl Default for MemoryGeometryCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }
}

impl MemoryGeometryCache {
    /// Create an empty cache whose records live for `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(State::default()),
        }
    }

    /// Drop every expired record, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Poisoned`] if a writer panicked.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Instant::now();
        let mut state = self.lock()?;
        let before = state.nodes.len() + state.ways.len() + state.changesets.len();
        state.nodes.retain(|_, entry| entry.live(now).is_some());
        state.ways.retain(|_, entry| entry.live(now).is_some());
        state.changesets.retain(|_, entry| entry.live(now).is_some());
        let after = state.nodes.len() + state.ways.len() + state.changesets.len();
        Ok(before - after)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, CacheError> {
        self.state.lock().map_err(|_| CacheError::Poisoned)
    }

    fn expiring<T>(&self, value: T) -> Expiring<T> {
        Expiring {
            value,
            expires_at: Instant::now().checked_add(self.ttl),
        }
    }
}

impl GeometryCache for MemoryGeometryCache {
    fn node(&self, id: u64) -> Result<Option<NodeRecord>, CacheError> {
        let now = Instant::now();
        let state = self.lock()?;
        Ok(state
            .nodes
            .get(&id)
            .and_then(|entry| entry.live(now))
            .cloned())
    }

    fn remember_node(&self, node: &NodeRecord) -> Result<(), CacheError> {
        let entry = self.expiring(node.clone());
        self.lock()?.nodes.insert(node.id, entry);
        Ok(())
    }

    fn way(&self, id: u64) -> Result<Option<WayRecord>, CacheError> {
        let now = Instant::now();
        let state = self.lock()?;
        Ok(state
            .ways
            .get(&id)
            .and_then(|entry| entry.live(now))
            .cloned())
    }

    fn remember_way(&self, way: &WayRecord) -> Result<(), CacheError> {
        let entry = self.expiring(way.clone());
        self.lock()?.ways.insert(way.id, entry);
        Ok(())
    }

    fn changeset_members(&self, changeset: ChangesetId) -> Result<Vec<ElementKey>, CacheError> {
        let now = Instant::now();
        let state = self.lock()?;
        Ok(state
            .changesets
            .get(&changeset)
            .and_then(|entry| entry.live(now))
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default())
    }

    fn add_changeset_member(
        &self,
        changeset: ChangesetId,
        key: ElementKey,
    ) -> Result<(), CacheError> {
        let now = Instant::now();
        let refreshed = self.expiring(HashSet::new());
        let mut state = self.lock()?;
        let entry = state
            .changesets
            .entry(changeset)
            .or_insert_with(|| refreshed.clone());
        if entry.live(now).is_none() {
            entry.value.clear();
        }
        entry.value.insert(key);
        entry.expires_at = refreshed.expires_at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn cache() -> MemoryGeometryCache {
        MemoryGeometryCache::default()
    }

    #[fixture]
    fn expired_cache() -> MemoryGeometryCache {
        MemoryGeometryCache::with_ttl(Duration::ZERO)
    }

    #[rstest]
    fn round_trips_nodes_and_ways(cache: MemoryGeometryCache) {
        let node = NodeRecord::new(1, 2, 3.0, 4.0);
        let way = WayRecord::new(7, 1, vec![1, 2]);
        cache.remember_node(&node).expect("write node");
        cache.remember_way(&way).expect("write way");

        assert_eq!(cache.node(1).expect("read node"), Some(node));
        assert_eq!(cache.way(7).expect("read way"), Some(way));
        assert_eq!(cache.node(2).expect("read missing node"), None);
    }

    #[rstest]
    fn member_set_ignores_duplicates(cache: MemoryGeometryCache) {
        let changeset = ChangesetId(10);
        cache
            .add_changeset_member(changeset, ElementKey::Node(1))
            .expect("add node");
        cache
            .add_changeset_member(changeset, ElementKey::Node(1))
            .expect("add node again");
        cache
            .add_changeset_member(changeset, ElementKey::Way(2))
            .expect("add way");

        let mut members = cache.changeset_members(changeset).expect("read members");
        members.sort_by_key(ToString::to_string);
        assert_eq!(members, vec![ElementKey::Node(1), ElementKey::Way(2)]);
    }

    #[rstest]
    fn expired_records_are_misses(expired_cache: MemoryGeometryCache) {
        expired_cache
            .remember_node(&NodeRecord::new(1, 1, 0.0, 0.0))
            .expect("write node");
        expired_cache
            .add_changeset_member(ChangesetId(1), ElementKey::Node(1))
            .expect("add member");

        assert_eq!(expired_cache.node(1).expect("read node"), None);
        assert!(
            expired_cache
                .changeset_members(ChangesetId(1))
                .expect("read members")
                .is_empty()
        );
    }

    #[rstest]
    fn purge_drops_expired_records(expired_cache: MemoryGeometryCache) {
        expired_cache
            .remember_way(&WayRecord::new(3, 1, vec![1]))
            .expect("write way");
        assert_eq!(expired_cache.purge_expired().expect("purge"), 1);
        assert_eq!(expired_cache.purge_expired().expect("purge again"), 0);
    }
}
