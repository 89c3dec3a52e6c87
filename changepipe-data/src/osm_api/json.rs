//! OSM API 0.6 JSON response types.
//!
//! Element queries answer with an `elements` array whose entries carry a
//! `type` tag; changeset queries answer with a single `changeset` object.
//! Only the fields the resolvers need are decoded. Unknown element types and
//! extra fields are ignored.
//!
//! See: <https://wiki.openstreetmap.org/wiki/API_v0.6#JSON_Format>

use changepipe_core::{ElementKind, FullWay, NodeRecord, UpstreamError, WayRecord};
use geo::{Coord, Rect};
use serde::Deserialize;

/// Response to `node`, `nodes`, `way/{id}/{version}` and `way/{id}/full`.
#[derive(Debug, Default, Deserialize)]
pub struct ElementsDocument {
    /// Elements in document order.
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// One entry of an `elements` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    /// A node; `lat` and `lon` are absent for deleted versions.
    Node {
        /// Node identifier.
        id: u64,
        /// Element version.
        version: u64,
        /// Latitude in degrees.
        lat: Option<f64>,
        /// Longitude in degrees.
        lon: Option<f64>,
    },
    /// A way with its ordered node references.
    Way {
        /// Way identifier.
        id: u64,
        /// Element version.
        version: u64,
        /// Referenced node identifiers.
        #[serde(default)]
        nodes: Vec<u64>,
    },
    /// Relations and anything else.
    #[serde(other)]
    Other,
}

impl Element {
    fn into_node(self) -> Option<NodeRecord> {
        match self {
            Self::Node {
                id,
                version,
                lat,
                lon,
            } => Some(NodeRecord {
                id,
                version,
                lat,
                lon,
            }),
            _ => None,
        }
    }

    fn into_way(self) -> Option<WayRecord> {
        match self {
            Self::Way { id, version, nodes } => Some(WayRecord::new(id, version, nodes)),
            _ => None,
        }
    }
}

impl ElementsDocument {
    /// All node records, in document order.
    pub fn into_nodes(self) -> Vec<NodeRecord> {
        self.elements
            .into_iter()
            .filter_map(Element::into_node)
            .collect()
    }

    /// The node with `id`.
    pub fn into_node(self, id: u64) -> Option<NodeRecord> {
        self.into_nodes().into_iter().find(|node| node.id == id)
    }

    /// The way with `id`.
    pub fn into_way(self, id: u64) -> Option<WayRecord> {
        self.elements
            .into_iter()
            .filter_map(Element::into_way)
            .find(|way| way.id == id)
    }

    /// The way with `id` together with every node in the document.
    pub fn into_full_way(self, id: u64) -> Option<FullWay> {
        let mut way = None;
        let mut nodes = Vec::new();
        for element in self.elements {
            match element {
                Element::Way { id: way_id, .. } if way_id == id => way = element.into_way(),
                Element::Node { .. } => nodes.extend(element.into_node()),
                _ => {}
            }
        }
        way.map(|found| FullWay { way: found, nodes })
    }
}

/// Response to `changeset/{id}`.
#[derive(Debug, Deserialize)]
pub struct ChangesetDocument {
    /// The requested changeset.
    pub changeset: ChangesetBody,
}

/// Bounding box fields of a changeset. All four are absent until the
/// changeset has at least one edit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize)]
pub struct ChangesetBody {
    /// Changeset identifier.
    pub id: u64,
    /// Southern edge.
    pub min_lat: Option<f64>,
    /// Western edge.
    pub min_lon: Option<f64>,
    /// Northern edge.
    pub max_lat: Option<f64>,
    /// Eastern edge.
    pub max_lon: Option<f64>,
}

impl ChangesetBody {
    /// Bounding box as a rectangle (`x = lon`, `y = lat`).
    pub fn bounds(&self) -> Option<Rect<f64>> {
        match (self.min_lon, self.min_lat, self.max_lon, self.max_lat) {
            (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) => Some(Rect::new(
                Coord { x: min_x, y: min_y },
                Coord { x: max_x, y: max_y },
            )),
            _ => None,
        }
    }
}

/// Error for a well-formed document lacking the requested element.
pub const fn missing(kind: ElementKind, id: u64) -> UpstreamError {
    UpstreamError::MissingElement { kind, id }
}
