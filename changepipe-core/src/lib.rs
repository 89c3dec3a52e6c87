//! Core domain types for the changepipe overlap engine.
//!
//! Given a changeset and an area of interest, the engine decides whether the
//! changeset touched anything inside the area. Geometry is resolved lazily:
//! node locations and way references come from a time-bounded
//! [`GeometryCache`] first, and only when the cache falls short from an
//! [`UpstreamGeoApi`]. Everything fetched upstream is written back.
//!
//! The cache is normally filled by replaying change streams through
//! [`remember_changes`], so most checks finish without network traffic.

#![forbid(unsafe_code)]

mod cache;
mod element;
mod geometry;
mod ingest;
mod key;
mod overlap;
mod resolve;
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;
mod upstream;

pub use cache::{CacheError, DEFAULT_CACHE_TTL, GeometryCache, MemoryGeometryCache};
#[cfg(feature = "store-sqlite")]
pub use cache::SqliteGeometryCache;
pub use element::{FullWay, NodeRecord, WayRecord};
pub use geometry::{
    DEFAULT_NEAR_MARGIN, Evidence, ResolutionMode, ResolvedGeometry, SearchArea, rect_polygon,
};
pub use ingest::{
    ChangeAction, ChangedElement, ElementChange, IngestSummary, remember_change, remember_changes,
};
pub use key::{ChangesetId, ElementKey, ElementKind, ParseKeyError};
pub use overlap::{OverlapCheck, OverlapDetector};
pub use resolve::{
    ChangesetBoundsResolver, NodeGeometryResolver, ResolveError, WayFetchOutcome,
    WayGeometryResolver, needed_nodes,
};
pub use upstream::{NODE_BATCH_SIZE, UpstreamError, UpstreamGeoApi};
