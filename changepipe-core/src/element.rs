//! Versioned node and way records as held in the geometry cache.

use geo::{Coord, Point};

/// A node with its version and, when known, its coordinates.
///
/// Coordinates are WGS84 degrees. A node is only considered resolved when
/// both latitude and longitude are present; a record carrying one without
/// the other is treated exactly like a record carrying neither.
///
/// # Examples
///
/// ```
/// use changepipe_core::NodeRecord;
///
/// let node = NodeRecord::new(1, 3, 51.5, -0.1);
/// assert!(node.point().is_some());
///
/// let deleted = NodeRecord::without_location(2, 4);
/// assert!(deleted.point().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeRecord {
    /// Node identifier.
    pub id: u64,
    /// Monotonic version number.
    pub version: u64,
    /// Latitude in degrees, if known.
    pub lat: Option<f64>,
    /// Longitude in degrees, if known.
    pub lon: Option<f64>,
}

impl NodeRecord {
    /// Construct a node with a known location.
    #[must_use]
    pub const fn new(id: u64, version: u64, lat: f64, lon: f64) -> Self {
        Self {
            id,
            version,
            lat: Some(lat),
            lon: Some(lon),
        }
    }

    /// Construct a node whose location is unknown, e.g. a deletion.
    #[must_use]
    pub const fn without_location(id: u64, version: u64) -> Self {
        Self {
            id,
            version,
            lat: None,
            lon: None,
        }
    }

    /// Location of the node as a point (`x = lon`, `y = lat`).
    ///
    /// Returns `None` unless both coordinates are present.
    #[must_use]
    pub fn point(&self) -> Option<Point<f64>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Point(Coord { x: lon, y: lat })),
            _ => None,
        }
    }

    /// Fall back to an earlier located record of the same node.
    ///
    /// When `self` has no complete location and `earlier` does, `earlier` is
    /// returned whole, so version and coordinates always belong together.
    #[must_use]
    pub fn or_location_of(self, earlier: &Self) -> Self {
        if self.point().is_none() && earlier.point().is_some() {
            return earlier.clone();
        }
        self
    }
}

/// A way with its version and ordered node references.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WayRecord {
    /// Way identifier.
    pub id: u64,
    /// Monotonic version number.
    pub version: u64,
    /// Referenced node identifiers in path order.
    pub node_ids: Vec<u64>,
}

impl WayRecord {
    /// Construct a way record.
    #[must_use]
    pub const fn new(id: u64, version: u64, node_ids: Vec<u64>) -> Self {
        Self {
            id,
            version,
            node_ids,
        }
    }

    /// Fill empty node references from an earlier record of the same way.
    ///
    /// Deletions in change streams carry a version but no references. The
    /// deleting version is kept with the earlier references, so the deleted
    /// way's fallback asks for `version - 1`, the revision those references
    /// came from.
    #[must_use]
    pub fn or_nodes_of(self, earlier: &Self) -> Self {
        if !self.node_ids.is_empty() {
            return self;
        }
        Self {
            node_ids: earlier.node_ids.clone(),
            ..self
        }
    }
}

/// A way together with the current records of all its member nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct FullWay {
    /// The way itself.
    pub way: WayRecord,
    /// Member node records in document order.
    pub nodes: Vec<NodeRecord>,
}
