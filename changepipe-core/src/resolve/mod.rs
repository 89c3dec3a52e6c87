//! Lazy geometry resolution for changeset members.
//!
//! Each resolver prefers the geometry cache and only reaches for the
//! upstream API when its [`ResolutionMode`](crate::ResolutionMode) allows
//! it. Anything fetched upstream is written back to the cache.

use thiserror::Error;

use crate::{CacheError, UpstreamError};

mod bounds;
mod node;
mod way;

pub use bounds::ChangesetBoundsResolver;
pub use node::NodeGeometryResolver;
pub use way::{WayFetchOutcome, WayGeometryResolver, needed_nodes};

/// Failures that abort a resolution.
///
/// An element that simply cannot be located is not an error; resolvers
/// return [`ResolvedGeometry::Unresolved`](crate::ResolvedGeometry::Unresolved)
/// for it.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The geometry cache failed.
    #[error("geometry cache failed: {0}")]
    Cache(#[from] CacheError),
    /// The upstream API failed.
    #[error("upstream lookup failed: {0}")]
    Upstream(#[from] UpstreamError),
}
