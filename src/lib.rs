//! Facade crate for the changepipe overlap engine.
//!
//! This crate re-exports the core resolution and overlap types and exposes
//! the OSM API client and osmChange reader behind the `osm-api` feature.

#![forbid(unsafe_code)]

pub use changepipe_core::{
    CacheError, ChangeAction, ChangedElement, ChangesetBoundsResolver, ChangesetId,
    DEFAULT_CACHE_TTL, DEFAULT_NEAR_MARGIN, ElementChange, ElementKey, ElementKind, Evidence,
    FullWay, GeometryCache, IngestSummary, MemoryGeometryCache, NODE_BATCH_SIZE,
    NodeGeometryResolver, NodeRecord, OverlapCheck, OverlapDetector, ResolutionMode,
    ResolveError, ResolvedGeometry, SearchArea, UpstreamError, UpstreamGeoApi,
    WayFetchOutcome, WayGeometryResolver, WayRecord, needed_nodes, remember_changes,
};

#[cfg(feature = "store-sqlite")]
pub use changepipe_core::SqliteGeometryCache;

#[cfg(feature = "osm-api")]
pub use changepipe_data::osm_api::{HttpOsmApi, OsmApiConfig};

#[cfg(feature = "osm-api")]
pub use changepipe_data::osm_change::{OsmChangeError, parse_osm_change, read_osm_change};
