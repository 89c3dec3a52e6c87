//! Decide whether a changeset touches an area of interest.
//!
//! The detector runs two passes over the changeset's members. The first
//! answers from the geometry cache alone; the second may reach the upstream
//! API, but first checks the changeset's bounding box so a changeset far
//! from the area costs one request. Within a pass, the first member that
//! touches the area settles the answer as `true`, and the first member found
//! beyond the buffered area settles it as `false`. The latter trades recall
//! for speed: a changeset spanning both a distant and a nearby edit can be
//! reported as not overlapping.

use geo::Polygon;
use log::{debug, info};

use crate::resolve::{
    ChangesetBoundsResolver, NodeGeometryResolver, ResolveError, WayGeometryResolver,
};
use crate::{
    ChangesetId, DEFAULT_NEAR_MARGIN, ElementKey, Evidence, GeometryCache, ResolutionMode,
    ResolvedGeometry, SearchArea, UpstreamGeoApi,
};

/// Anything able to answer the overlap question for a changeset.
///
/// Object safe, so drivers can hold a `Box<dyn OverlapCheck>`.
pub trait OverlapCheck {
    /// Whether `changeset` has at least one member touching `area`.
    fn overlaps(&self, changeset: ChangesetId, area: &Polygon<f64>) -> Result<bool, ResolveError>;
}

/// Members of a changeset grouped by kind, each group sorted by key.
#[derive(Debug, Default, PartialEq, Eq)]
struct Members {
    nodes: Vec<u64>,
    ways: Vec<u64>,
    relations: Vec<u64>,
}

impl Members {
    fn partition(mut keys: Vec<ElementKey>) -> Self {
        keys.sort_by_cached_key(ToString::to_string);
        keys.dedup();
        let mut members = Self::default();
        for key in keys {
            match key {
                ElementKey::Node(id) => members.nodes.push(id),
                ElementKey::Way(id) => members.ways.push(id),
                ElementKey::Relation(id) => members.relations.push(id),
            }
        }
        members
    }
}

/// Two-pass overlap detector over a geometry cache and an upstream API.
///
/// # Examples
///
/// ```
/// use geo::{Rect, coord};
/// use changepipe_core::test_support::StubUpstream;
/// use changepipe_core::{
///     ChangesetId, ElementKey, GeometryCache, MemoryGeometryCache, NodeRecord, OverlapDetector,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = MemoryGeometryCache::default();
/// cache.remember_node(&NodeRecord::new(1, 1, 0.1, 0.1))?;
/// cache.add_changeset_member(ChangesetId(42), ElementKey::Node(1))?;
///
/// let detector = OverlapDetector::new(&cache, StubUpstream::default());
/// let area = Rect::new(coord! { x: -0.5, y: -0.5 }, coord! { x: 0.5, y: 0.5 }).to_polygon();
/// assert!(detector.overlaps(ChangesetId(42), &area)?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OverlapDetector<C, U> {
    cache: C,
    upstream: U,
    margin: f64,
}

impl<C, U> OverlapDetector<C, U>
where
    C: GeometryCache,
    U: UpstreamGeoApi,
{
    /// Create a detector using the [`DEFAULT_NEAR_MARGIN`].
    #[must_use]
    pub const fn new(cache: C, upstream: U) -> Self {
        Self {
            cache,
            upstream,
            margin: DEFAULT_NEAR_MARGIN,
        }
    }

    /// Replace the pruning margin, in degrees.
    #[must_use]
    pub const fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// The pruning margin in degrees.
    #[must_use]
    pub const fn margin(&self) -> f64 {
        self.margin
    }

    /// Whether any node or way of `changeset` touches `area`.
    ///
    /// Relations are never resolved. A changeset whose members cannot be
    /// located at all is reported as not overlapping.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the cache or the upstream API fails.
    /// There is no partial answer: the first failure aborts the check.
    pub fn overlaps(
        &self,
        changeset: ChangesetId,
        area: &Polygon<f64>,
    ) -> Result<bool, ResolveError> {
        let search = SearchArea::with_margin(area.clone(), self.margin);
        let members = Members::partition(self.cache.changeset_members(changeset)?);
        debug!(
            "{changeset}: {} nodes, {} ways, {} relations",
            members.nodes.len(),
            members.ways.len(),
            members.relations.len()
        );

        for mode in ResolutionMode::PASSES {
            if let Some(answer) = self.run_pass(changeset, &search, &members, mode)? {
                return Ok(answer);
            }
        }

        if !members.relations.is_empty() {
            debug!(
                "{changeset}: ignored relations {:?}",
                members.relations
            );
        }
        Ok(false)
    }

    /// One pass over the members; `None` when the pass is inconclusive.
    fn run_pass(
        &self,
        changeset: ChangesetId,
        search: &SearchArea,
        members: &Members,
        mode: ResolutionMode,
    ) -> Result<Option<bool>, ResolveError> {
        if mode.allows_upstream() {
            let bounds = ChangesetBoundsResolver::new(&self.upstream).bounds_of(changeset)?;
            if bounds.is_some_and(|polygon| search.is_disjoint_from(&polygon)) {
                debug!("{changeset}: bounds do not touch the area");
                return Ok(Some(false));
            }
        }

        let nodes = NodeGeometryResolver::new(&self.cache, &self.upstream);
        for &id in &members.nodes {
            let geometry = nodes.resolve(id, mode)?;
            if let Some(answer) = judge(changeset, ElementKey::Node(id), search, &geometry) {
                return Ok(Some(answer));
            }
        }

        let ways = WayGeometryResolver::new(&self.cache, &self.upstream);
        for &id in &members.ways {
            let geometry = ways.resolve(id, mode)?;
            if let Some(answer) = judge(changeset, ElementKey::Way(id), search, &geometry) {
                return Ok(Some(answer));
            }
        }
        Ok(None)
    }
}

fn judge(
    changeset: ChangesetId,
    key: ElementKey,
    search: &SearchArea,
    geometry: &ResolvedGeometry,
) -> Option<bool> {
    match search.assess(geometry) {
        Evidence::Overlaps => {
            debug!("{changeset}: {key} touches the area");
            Some(true)
        }
        Evidence::TooFar => {
            info!("{changeset}: super-distant {key}, giving up");
            Some(false)
        }
        Evidence::Inconclusive => None,
    }
}

impl<C, U> OverlapCheck for OverlapDetector<C, U>
where
    C: GeometryCache,
    U: UpstreamGeoApi,
{
    fn overlaps(&self, changeset: ChangesetId, area: &Polygon<f64>) -> Result<bool, ResolveError> {
        Self::overlaps(self, changeset, area)
    }
}
