//! Feeding a stream of changed elements into the geometry cache.
//!
//! Change streams are what make the cache useful: every element a changeset
//! touches is recorded as a member of that changeset, and node locations and
//! way references are stored so the first overlap pass can answer without
//! any upstream traffic.

use std::collections::BTreeSet;

use log::debug;

use crate::{CacheError, ChangesetId, ElementKey, GeometryCache, NodeRecord, WayRecord};

/// What a change did to its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ChangeAction {
    /// The element was created.
    Create,
    /// The element was modified.
    Modify,
    /// The element was deleted.
    Delete,
}

/// The element state carried by a change.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementChange {
    /// A node; deletions carry no location.
    Node(NodeRecord),
    /// A way; deletions carry no node references.
    Way(WayRecord),
    /// A relation. Only its identity is kept.
    Relation {
        /// Relation identifier.
        id: u64,
        /// Version after the change.
        version: u64,
    },
}

impl ElementChange {
    /// Key of the changed element.
    #[must_use]
    pub const fn key(&self) -> ElementKey {
        match self {
            Self::Node(node) => ElementKey::Node(node.id),
            Self::Way(way) => ElementKey::Way(way.id),
            Self::Relation { id, .. } => ElementKey::Relation(*id),
        }
    }
}

/// One element of a change stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedElement {
    /// What happened to the element.
    pub action: ChangeAction,
    /// Changeset the change belongs to.
    pub changeset: ChangesetId,
    /// Element state after the change.
    pub change: ElementChange,
}

/// Counts gathered while ingesting a change stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IngestSummary {
    /// Node changes remembered.
    pub nodes: usize,
    /// Way changes remembered.
    pub ways: usize,
    /// Relation changes remembered.
    pub relations: usize,
    /// Distinct changesets seen.
    pub changesets: BTreeSet<ChangesetId>,
}

impl IngestSummary {
    fn count(&mut self, element: &ChangedElement) {
        match element.change {
            ElementChange::Node(_) => self.nodes += 1,
            ElementChange::Way(_) => self.ways += 1,
            ElementChange::Relation { .. } => self.relations += 1,
        }
        self.changesets.insert(element.changeset);
    }
}

/// Store one change and record its element as a changeset member.
///
/// Creations and modifications replace the cached record. Deletions carry
/// no geometry, so they keep what the cache already knows: a deleted node
/// keeps its last located record (version and coordinates together), and a
/// deleted way records the deleting version with its last known references.
///
/// # Errors
///
/// Returns [`CacheError`] when the cache cannot be read or written.
pub fn remember_change<C>(cache: &C, element: &ChangedElement) -> Result<(), CacheError>
where
    C: GeometryCache + ?Sized,
{
    let deleted = element.action == ChangeAction::Delete;
    match &element.change {
        ElementChange::Node(node) => {
            let merged = match cache.node(node.id)? {
                Some(earlier) if deleted => node.clone().or_location_of(&earlier),
                _ => node.clone(),
            };
            cache.remember_node(&merged)?;
        }
        ElementChange::Way(way) => {
            let merged = match cache.way(way.id)? {
                Some(earlier) if deleted => way.clone().or_nodes_of(&earlier),
                _ => way.clone(),
            };
            cache.remember_way(&merged)?;
        }
        ElementChange::Relation { .. } => {}
    }
    cache.add_changeset_member(element.changeset, element.change.key())
}

/// Store every change in `elements`, returning what was seen.
///
/// # Errors
///
/// Stops at the first [`CacheError`]; earlier changes stay remembered.
pub fn remember_changes<C, I>(cache: &C, elements: I) -> Result<IngestSummary, CacheError>
where
    C: GeometryCache + ?Sized,
    I: IntoIterator<Item = ChangedElement>,
{
    let mut summary = IngestSummary::default();
    for element in elements {
        remember_change(cache, &element)?;
        summary.count(&element);
    }
    debug!(
        "remembered {} nodes, {} ways and {} relations across {} changesets",
        summary.nodes,
        summary.ways,
        summary.relations,
        summary.changesets.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    use crate::MemoryGeometryCache;

    #[fixture]
    fn cache() -> MemoryGeometryCache {
        MemoryGeometryCache::default()
    }

    fn change(action: ChangeAction, changeset: u64, change: ElementChange) -> ChangedElement {
        ChangedElement {
            action,
            changeset: ChangesetId(changeset),
            change,
        }
    }

    #[rstest]
    fn records_membership_and_geometry(cache: MemoryGeometryCache) {
        let summary = remember_changes(
            &cache,
            vec![
                change(
                    ChangeAction::Create,
                    1,
                    ElementChange::Node(NodeRecord::new(10, 1, 1.0, 2.0)),
                ),
                change(
                    ChangeAction::Modify,
                    1,
                    ElementChange::Way(WayRecord::new(20, 3, vec![10, 11])),
                ),
                change(
                    ChangeAction::Modify,
                    2,
                    ElementChange::Relation { id: 30, version: 2 },
                ),
            ],
        )
        .expect("ingest");

        assert_eq!(summary.nodes, 1);
        assert_eq!(summary.ways, 1);
        assert_eq!(summary.relations, 1);
        assert_eq!(
            summary.changesets,
            BTreeSet::from([ChangesetId(1), ChangesetId(2)])
        );

        let mut members = cache.changeset_members(ChangesetId(1)).expect("members");
        members.sort_by_key(ToString::to_string);
        assert_eq!(members, vec![ElementKey::Node(10), ElementKey::Way(20)]);
        assert_eq!(
            cache.changeset_members(ChangesetId(2)).expect("members"),
            vec![ElementKey::Relation(30)]
        );
        assert!(cache.way(20).expect("way").is_some());
    }

    #[rstest]
    fn deleted_node_keeps_cached_location(cache: MemoryGeometryCache) {
        cache
            .remember_node(&NodeRecord::new(10, 1, 1.0, 2.0))
            .expect("seed");
        let deletion = change(
            ChangeAction::Delete,
            5,
            ElementChange::Node(NodeRecord::without_location(10, 2)),
        );

        remember_change(&cache, &deletion).expect("ingest");

        assert_eq!(
            cache.node(10).expect("node"),
            Some(NodeRecord::new(10, 1, 1.0, 2.0))
        );
    }

    #[rstest]
    fn modification_without_references_replaces_cached_way(cache: MemoryGeometryCache) {
        cache
            .remember_way(&WayRecord::new(20, 4, vec![1, 2, 3]))
            .expect("seed");
        let emptied = change(
            ChangeAction::Modify,
            5,
            ElementChange::Way(WayRecord::new(20, 5, Vec::new())),
        );

        remember_change(&cache, &emptied).expect("ingest");

        assert_eq!(
            cache.way(20).expect("way"),
            Some(WayRecord::new(20, 5, Vec::new()))
        );
    }

    #[rstest]
    fn deleted_way_keeps_cached_refs_and_bumps_version(cache: MemoryGeometryCache) {
        cache
            .remember_way(&WayRecord::new(20, 4, vec![1, 2, 3]))
            .expect("seed");
        let deletion = change(
            ChangeAction::Delete,
            5,
            ElementChange::Way(WayRecord::new(20, 5, Vec::new())),
        );

        remember_change(&cache, &deletion).expect("ingest");

        assert_eq!(
            cache.way(20).expect("way"),
            Some(WayRecord::new(20, 5, vec![1, 2, 3]))
        );
    }

    #[rstest]
    fn modified_geometry_replaces_cached_geometry(cache: MemoryGeometryCache) {
        cache
            .remember_node(&NodeRecord::new(10, 1, 1.0, 2.0))
            .expect("seed");
        let moved = change(
            ChangeAction::Modify,
            5,
            ElementChange::Node(NodeRecord::new(10, 2, 3.0, 4.0)),
        );

        remember_change(&cache, &moved).expect("ingest");

        assert_eq!(
            cache.node(10).expect("node"),
            Some(NodeRecord::new(10, 2, 3.0, 4.0))
        );
    }
}
