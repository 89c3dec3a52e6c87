//! Point geometry for a single node.

use log::debug;

use super::ResolveError;
use crate::{GeometryCache, ResolutionMode, ResolvedGeometry, UpstreamGeoApi};

/// Resolves a node to its location.
///
/// A node whose latitude and longitude are both cached is answered from the
/// cache without touching the upstream API, whatever the mode.
#[derive(Debug, Clone, Copy)]
pub struct NodeGeometryResolver<C, U> {
    cache: C,
    upstream: U,
}

impl<C, U> NodeGeometryResolver<C, U>
where
    C: GeometryCache,
    U: UpstreamGeoApi,
{
    /// Create a resolver over the given cache and upstream API.
    #[must_use]
    pub const fn new(cache: C, upstream: U) -> Self {
        Self { cache, upstream }
    }

    /// Resolve `node_id` to a [`ResolvedGeometry::Point`], or
    /// [`ResolvedGeometry::Unresolved`] when its location is unknown.
    ///
    /// With [`ResolutionMode::AllowUpstream`] a cache miss triggers a single
    /// node fetch; a located result is written back with a fresh time-to-live.
    /// A node without a location upstream is not cached.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the cache or the upstream API fails.
    pub fn resolve(
        &self,
        node_id: u64,
        mode: ResolutionMode,
    ) -> Result<ResolvedGeometry, ResolveError> {
        if let Some(point) = self.cache.node(node_id)?.and_then(|node| node.point()) {
            return Ok(ResolvedGeometry::Point(point));
        }
        if !mode.allows_upstream() {
            return Ok(ResolvedGeometry::Unresolved);
        }

        debug!("fetching node {node_id} from upstream");
        let node = self.upstream.node(node_id)?;
        let Some(point) = node.point() else {
            debug!("node {node_id} has no location upstream");
            return Ok(ResolvedGeometry::Unresolved);
        };
        self.cache.remember_node(&node)?;
        Ok(ResolvedGeometry::Point(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;
    use rstest::{fixture, rstest};

    use crate::test_support::{StubUpstream, UpstreamCall};
    use crate::{MemoryGeometryCache, NodeRecord};

    #[fixture]
    fn cache() -> MemoryGeometryCache {
        MemoryGeometryCache::default()
    }

    #[rstest]
    #[case(ResolutionMode::CacheOnly)]
    #[case(ResolutionMode::AllowUpstream)]
    fn cached_node_never_reaches_upstream(cache: MemoryGeometryCache, #[case] mode: ResolutionMode) {
        cache
            .remember_node(&NodeRecord::new(1, 1, 0.1, 0.2))
            .expect("seed cache");
        let upstream = StubUpstream::default();
        let resolver = NodeGeometryResolver::new(&cache, &upstream);

        let geometry = resolver.resolve(1, mode).expect("resolve");

        assert_eq!(geometry, ResolvedGeometry::Point(Point::new(0.2, 0.1)));
        assert!(upstream.calls().is_empty());
    }

    #[rstest]
    fn cache_only_miss_is_unresolved(cache: MemoryGeometryCache) {
        let upstream = StubUpstream::default().with_node(NodeRecord::new(1, 1, 0.0, 0.0));
        let resolver = NodeGeometryResolver::new(&cache, &upstream);

        let geometry = resolver
            .resolve(1, ResolutionMode::CacheOnly)
            .expect("resolve");

        assert!(geometry.is_unresolved());
        assert!(upstream.calls().is_empty());
    }

    #[rstest]
    fn partial_cache_entry_falls_back_upstream(cache: MemoryGeometryCache) {
        cache
            .remember_node(&NodeRecord {
                id: 1,
                version: 1,
                lat: Some(3.0),
                lon: None,
            })
            .expect("seed cache");
        let upstream = StubUpstream::default().with_node(NodeRecord::new(1, 2, 3.0, 4.0));
        let resolver = NodeGeometryResolver::new(&cache, &upstream);

        let geometry = resolver
            .resolve(1, ResolutionMode::AllowUpstream)
            .expect("resolve");

        assert_eq!(geometry, ResolvedGeometry::Point(Point::new(4.0, 3.0)));
        assert_eq!(upstream.calls(), vec![UpstreamCall::Node(1)]);
        assert_eq!(
            cache.node(1).expect("read back"),
            Some(NodeRecord::new(1, 2, 3.0, 4.0))
        );
    }

    #[rstest]
    fn deleted_node_is_unresolved_and_not_cached(cache: MemoryGeometryCache) {
        let upstream = StubUpstream::default().with_node(NodeRecord::without_location(1, 5));
        let resolver = NodeGeometryResolver::new(&cache, &upstream);

        let geometry = resolver
            .resolve(1, ResolutionMode::AllowUpstream)
            .expect("resolve");

        assert!(geometry.is_unresolved());
        assert_eq!(cache.node(1).expect("read back"), None);
    }

    #[rstest]
    fn upstream_failure_is_propagated(cache: MemoryGeometryCache) {
        let upstream = StubUpstream::default();
        let resolver = NodeGeometryResolver::new(&cache, &upstream);

        let err = resolver
            .resolve(7, ResolutionMode::AllowUpstream)
            .expect_err("unknown node should fail");

        assert!(matches!(err, ResolveError::Upstream(_)));
    }
}
