//! Approximate geometry for a way.
//!
//! A way is approximated by the set of locations of the member nodes we know
//! about. Path order is irrelevant: the result is used for coverage tests,
//! never drawn as a line.

use geo::Point;
use log::{debug, warn};

use super::{NodeGeometryResolver, ResolveError};
use crate::{
    GeometryCache, NODE_BATCH_SIZE, NodeRecord, ResolutionMode, ResolvedGeometry, UpstreamGeoApi,
};

/// Minimum number of located members for `total` references to count as a
/// usable approximation: a third, rounded down.
///
/// # Examples
///
/// ```
/// use changepipe_core::needed_nodes;
///
/// assert_eq!(needed_nodes(9), 3);
/// assert_eq!(needed_nodes(2), 0);
/// ```
#[must_use]
pub const fn needed_nodes(total: usize) -> usize {
    total.div_euclid(3)
}

/// Whether `known` located members out of `total` references are enough.
///
/// A lone point never is; otherwise at least [`needed_nodes`] must be known.
const fn is_good_enough(known: usize, total: usize) -> bool {
    known > 1 && known >= needed_nodes(total)
}

/// Result of asking upstream for a way's current geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum WayFetchOutcome {
    /// The way exists; these are its member nodes.
    FullWay(Vec<NodeRecord>),
    /// The way was deleted at its current revision. Carries the version to
    /// fall back to, if an earlier version can be named.
    DeletedAtCurrentVersion(Option<u64>),
}

/// Resolves a way to the locations of its member nodes.
#[derive(Debug, Clone, Copy)]
pub struct WayGeometryResolver<C, U> {
    cache: C,
    upstream: U,
}

impl<C, U> WayGeometryResolver<C, U>
where
    C: GeometryCache,
    U: UpstreamGeoApi,
{
    /// Create a resolver over the given cache and upstream API.
    #[must_use]
    pub const fn new(cache: C, upstream: U) -> Self {
        Self { cache, upstream }
    }

    /// Resolve `way_id` to a [`ResolvedGeometry::MultiPoint`], or
    /// [`ResolvedGeometry::Unresolved`] when no member could be located.
    ///
    /// Cached members are tried first. With
    /// [`ResolutionMode::AllowUpstream`], too few located members causes the
    /// partial result to be discarded in favour of a full-way fetch, falling
    /// back to the previous version when the way has been deleted.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the cache fails or any upstream request,
    /// including one made for the previous version, fails.
    pub fn resolve(
        &self,
        way_id: u64,
        mode: ResolutionMode,
    ) -> Result<ResolvedGeometry, ResolveError> {
        let cached = self.cache.way(way_id)?;
        let node_ids = cached.as_ref().map_or(&[][..], |way| way.node_ids.as_slice());
        let cached_points = self.cached_points(node_ids)?;

        if !mode.allows_upstream() || is_good_enough(cached_points.len(), node_ids.len()) {
            return Ok(ResolvedGeometry::from_points(cached_points));
        }

        debug!(
            "way {way_id}: {} of {} members cached, asking upstream",
            cached_points.len(),
            node_ids.len()
        );
        let cached_version = cached.as_ref().map(|way| way.version);
        let points = match self.fetch_way(way_id, cached_version)? {
            WayFetchOutcome::FullWay(nodes) => self.remember_points(&nodes)?,
            WayFetchOutcome::DeletedAtCurrentVersion(Some(version)) => {
                self.fetch_version_points(way_id, version)?
            }
            WayFetchOutcome::DeletedAtCurrentVersion(None) => {
                warn!("way {way_id} is deleted and no earlier version is known");
                Vec::new()
            }
        };
        Ok(ResolvedGeometry::from_points(points))
    }

    fn cached_points(&self, node_ids: &[u64]) -> Result<Vec<Point<f64>>, ResolveError> {
        let nodes = NodeGeometryResolver::new(&self.cache, &self.upstream);
        let mut points = Vec::new();
        for &node_id in node_ids {
            if let ResolvedGeometry::Point(point) =
                nodes.resolve(node_id, ResolutionMode::CacheOnly)?
            {
                points.push(point);
            }
        }
        Ok(points)
    }

    /// Fetch the full way, writing the way record back when it exists.
    fn fetch_way(
        &self,
        way_id: u64,
        cached_version: Option<u64>,
    ) -> Result<WayFetchOutcome, ResolveError> {
        debug!("fetching full way {way_id} from upstream");
        match self.upstream.full_way(way_id)? {
            Some(full) => {
                self.cache.remember_way(&full.way)?;
                Ok(WayFetchOutcome::FullWay(full.nodes))
            }
            None => {
                let fallback = cached_version
                    .and_then(|version| version.checked_sub(1))
                    .filter(|&version| version > 0);
                Ok(WayFetchOutcome::DeletedAtCurrentVersion(fallback))
            }
        }
    }

    /// Resolve the members of an earlier version through batched lookups.
    fn fetch_version_points(
        &self,
        way_id: u64,
        version: u64,
    ) -> Result<Vec<Point<f64>>, ResolveError> {
        debug!("way {way_id} is deleted, fetching version {version}");
        let previous = self.upstream.way_version(way_id, version)?;
        let refs = distinct_in_order(&previous.node_ids);

        let mut points = Vec::new();
        for batch in refs.chunks(NODE_BATCH_SIZE) {
            debug!("fetching {} nodes of way {way_id} version {version}", batch.len());
            let nodes = self.upstream.nodes(batch)?;
            points.extend(self.remember_points(&nodes)?);
        }
        Ok(points)
    }

    /// Write every located node back to the cache and collect its point.
    fn remember_points(&self, nodes: &[NodeRecord]) -> Result<Vec<Point<f64>>, ResolveError> {
        let mut points = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(point) = node.point() {
                self.cache.remember_node(node)?;
                points.push(point);
            }
        }
        Ok(points)
    }
}

fn distinct_in_order(ids: &[u64]) -> Vec<u64> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
