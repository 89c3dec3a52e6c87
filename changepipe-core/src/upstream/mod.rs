//! Authoritative element lookups against the upstream geodata API.
//!
//! The `UpstreamGeoApi` trait mirrors the handful of read-only OSM API 0.6
//! calls the resolvers need. Implementations decide on transport and wire
//! format; `changepipe-data` provides an HTTP client.

use geo::Rect;

use crate::{ChangesetId, FullWay, NodeRecord, WayRecord};

mod error;

pub use error::UpstreamError;

/// Largest number of node identifiers sent in one batched lookup.
pub const NODE_BATCH_SIZE: usize = 10;

/// Read-only access to authoritative element data.
///
/// All calls block until the answer is known. There is no retry: a failed
/// call is reported once and the caller decides what to abort.
///
/// # Examples
///
/// ```rust
/// use geo::Rect;
/// use changepipe_core::{
///     ChangesetId, FullWay, NodeRecord, UpstreamError, UpstreamGeoApi, WayRecord,
/// };
///
/// struct Offline;
///
/// impl UpstreamGeoApi for Offline {
///     fn changeset_bounds(&self, _: ChangesetId) -> Result<Option<Rect<f64>>, UpstreamError> {
///         Ok(None)
///     }
///     fn node(&self, id: u64) -> Result<NodeRecord, UpstreamError> {
///         Ok(NodeRecord::without_location(id, 1))
///     }
///     fn full_way(&self, _: u64) -> Result<Option<FullWay>, UpstreamError> {
///         Ok(None)
///     }
///     fn way_version(&self, id: u64, version: u64) -> Result<WayRecord, UpstreamError> {
///         Ok(WayRecord::new(id, version, Vec::new()))
///     }
///     fn nodes(&self, _: &[u64]) -> Result<Vec<NodeRecord>, UpstreamError> {
///         Ok(Vec::new())
///     }
/// }
///
/// assert!(Offline.node(1)?.point().is_none());
/// # Ok::<(), UpstreamError>(())
/// ```
pub trait UpstreamGeoApi {
    /// Bounding box of a changeset's edits (`x = lon`, `y = lat`).
    ///
    /// Returns `None` when the changeset has no edits applied yet.
    fn changeset_bounds(&self, changeset: ChangesetId) -> Result<Option<Rect<f64>>, UpstreamError>;

    /// Current record of a single node.
    ///
    /// A node deleted upstream is returned without a location.
    fn node(&self, id: u64) -> Result<NodeRecord, UpstreamError>;

    /// Current record of a way together with all its member nodes.
    ///
    /// Returns `None` when the way is deleted at its current revision.
    fn full_way(&self, id: u64) -> Result<Option<FullWay>, UpstreamError>;

    /// A way as it was at a historical version. Only the node references are
    /// meaningful.
    fn way_version(&self, id: u64, version: u64) -> Result<WayRecord, UpstreamError>;

    /// Current records of several nodes at once.
    ///
    /// Callers keep `ids` at most [`NODE_BATCH_SIZE`] long.
    fn nodes(&self, ids: &[u64]) -> Result<Vec<NodeRecord>, UpstreamError>;
}

impl<T: UpstreamGeoApi + ?Sized> UpstreamGeoApi for &T {
    fn changeset_bounds(&self, changeset: ChangesetId) -> Result<Option<Rect<f64>>, UpstreamError> {
        (**self).changeset_bounds(changeset)
    }

    fn node(&self, id: u64) -> Result<NodeRecord, UpstreamError> {
        (**self).node(id)
    }

    fn full_way(&self, id: u64) -> Result<Option<FullWay>, UpstreamError> {
        (**self).full_way(id)
    }

    fn way_version(&self, id: u64, version: u64) -> Result<WayRecord, UpstreamError> {
        (**self).way_version(id, version)
    }

    fn nodes(&self, ids: &[u64]) -> Result<Vec<NodeRecord>, UpstreamError> {
        (**self).nodes(ids)
    }
}
