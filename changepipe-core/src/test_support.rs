//! Test utilities for resolvers and the overlap detector.
//!
//! [`StubUpstream`] is a deterministic [`UpstreamGeoApi`] that answers from
//! pre-configured records and keeps a log of every call it receives, so
//! tests can assert exactly which upstream traffic a check caused.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use geo::Rect;

use crate::{
    ChangesetId, ElementKind, FullWay, NodeRecord, UpstreamError, UpstreamGeoApi, WayRecord,
};

/// One call received by a [`StubUpstream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamCall {
    /// [`UpstreamGeoApi::changeset_bounds`].
    ChangesetBounds(ChangesetId),
    /// [`UpstreamGeoApi::node`].
    Node(u64),
    /// [`UpstreamGeoApi::full_way`].
    FullWay(u64),
    /// [`UpstreamGeoApi::way_version`] with way id and version.
    WayVersion(u64, u64),
    /// [`UpstreamGeoApi::nodes`] with the requested batch.
    Nodes(Vec<u64>),
}

/// Stub upstream API for testing.
///
/// Anything not configured is reported as missing with an
/// [`UpstreamError`], the way a real service answers an unknown id with
/// `404 Not Found`.
///
/// # Example
///
/// ```
/// use changepipe_core::test_support::{StubUpstream, UpstreamCall};
/// use changepipe_core::{NodeRecord, UpstreamGeoApi};
///
/// let upstream = StubUpstream::default().with_node(NodeRecord::new(1, 1, 0.5, 0.5));
/// assert!(upstream.node(1).is_ok());
/// assert!(upstream.node(2).is_err());
/// assert_eq!(upstream.calls(), vec![UpstreamCall::Node(1), UpstreamCall::Node(2)]);
/// ```
#[derive(Debug, Default)]
pub struct StubUpstream {
    bounds: HashMap<ChangesetId, Option<Rect<f64>>>,
    nodes: HashMap<u64, NodeRecord>,
    ways: HashMap<u64, Option<FullWay>>,
    versions: HashMap<(u64, u64), WayRecord>,
    failure: Option<UpstreamError>,
    calls: Mutex<Vec<UpstreamCall>>,
}

impl StubUpstream {
    /// Answer bounds requests for `changeset`.
    #[must_use]
    pub fn with_bounds(mut self, changeset: ChangesetId, bounds: Option<Rect<f64>>) -> Self {
        self.bounds.insert(changeset, bounds);
        self
    }

    /// Serve `node` from single and batched node lookups.
    #[must_use]
    pub fn with_node(mut self, node: NodeRecord) -> Self {
        self.nodes.insert(node.id, node);
        self
    }

    /// Serve every record in `nodes`.
    #[must_use]
    pub fn with_nodes(self, nodes: impl IntoIterator<Item = NodeRecord>) -> Self {
        nodes.into_iter().fold(self, Self::with_node)
    }

    /// Serve `full` for full-way lookups of `way_id`.
    #[must_use]
    pub fn with_full_way(mut self, way_id: u64, full: FullWay) -> Self {
        self.ways.insert(way_id, Some(full));
        self
    }

    /// Report `way_id` as deleted at its current revision.
    #[must_use]
    pub fn with_deleted_way(mut self, way_id: u64) -> Self {
        self.ways.insert(way_id, None);
        self
    }

    /// Serve a historical version of a way.
    #[must_use]
    pub fn with_way_version(mut self, way: WayRecord) -> Self {
        self.versions.insert((way.id, way.version), way);
        self
    }

    /// Fail every call with `error`.
    #[must_use]
    pub fn with_error(mut self, error: UpstreamError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Every call received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<UpstreamCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: UpstreamCall) -> Result<(), UpstreamError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        self.failure.clone().map_or(Ok(()), Err)
    }

    fn lookup_node(&self, id: u64) -> Result<NodeRecord, UpstreamError> {
        self.nodes
            .get(&id)
            .cloned()
            .ok_or(UpstreamError::MissingElement {
                kind: ElementKind::Node,
                id,
            })
    }
}

impl UpstreamGeoApi for StubUpstream {
    fn changeset_bounds(&self, changeset: ChangesetId) -> Result<Option<Rect<f64>>, UpstreamError> {
        self.record(UpstreamCall::ChangesetBounds(changeset))?;
        self.bounds
            .get(&changeset)
            .copied()
            .ok_or(UpstreamError::MissingChangeset { id: changeset.get() })
    }

    fn node(&self, id: u64) -> Result<NodeRecord, UpstreamError> {
        self.record(UpstreamCall::Node(id))?;
        self.lookup_node(id)
    }

    fn full_way(&self, id: u64) -> Result<Option<FullWay>, UpstreamError> {
        self.record(UpstreamCall::FullWay(id))?;
        self.ways.get(&id).cloned().ok_or(UpstreamError::MissingElement {
            kind: ElementKind::Way,
            id,
        })
    }

    fn way_version(&self, id: u64, version: u64) -> Result<WayRecord, UpstreamError> {
        self.record(UpstreamCall::WayVersion(id, version))?;
        self.versions
            .get(&(id, version))
            .cloned()
            .ok_or(UpstreamError::MissingElement {
                kind: ElementKind::Way,
                id,
            })
    }

    fn nodes(&self, ids: &[u64]) -> Result<Vec<NodeRecord>, UpstreamError> {
        self.record(UpstreamCall::Nodes(ids.to_vec()))?;
        ids.iter().map(|&id| self.lookup_node(id)).collect()
    }
}
