//! Geometry results and the area tests applied to them.
//!
//! Resolvers produce a [`ResolvedGeometry`]; the overlap detector asks a
//! [`SearchArea`] to turn it into [`Evidence`]. Coordinates are WGS84 degrees
//! with `x = longitude` and `y = latitude`, and distances are planar degrees.

use geo::{Coord, Distance, Euclidean, Intersects, LineString, MultiPoint, Point, Polygon, Rect};

/// Margin, in degrees, around the area inside which a geometry is still
/// considered close enough to keep looking. Five degrees of latitude or
/// longitude is really far for a single edit.
pub const DEFAULT_NEAR_MARGIN: f64 = 5.0;

/// Whether a resolver may fall back to the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Only consult the geometry cache.
    CacheOnly,
    /// Consult the cache, then fetch authoritative data when it falls short.
    AllowUpstream,
}

impl ResolutionMode {
    /// Modes in the order the overlap detector runs its passes.
    pub const PASSES: [Self; 2] = [Self::CacheOnly, Self::AllowUpstream];

    /// Whether upstream fetches are permitted.
    #[must_use]
    pub const fn allows_upstream(self) -> bool {
        matches!(self, Self::AllowUpstream)
    }
}

/// Geometry of a node or way as far as it could be resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedGeometry {
    /// Location of a node.
    Point(Point<f64>),
    /// Known locations of a way's nodes, in no particular order.
    MultiPoint(MultiPoint<f64>),
    /// Nothing is known; contributes no evidence.
    Unresolved,
}

impl ResolvedGeometry {
    /// Wrap gathered points, yielding [`ResolvedGeometry::Unresolved`] when
    /// there are none.
    #[must_use]
    pub fn from_points(points: Vec<Point<f64>>) -> Self {
        if points.is_empty() {
            Self::Unresolved
        } else {
            Self::MultiPoint(MultiPoint::new(points))
        }
    }

    /// Whether nothing could be resolved.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }

    /// Points making up the geometry; empty when unresolved.
    #[must_use]
    pub fn points(&self) -> Vec<Point<f64>> {
        match self {
            Self::Point(point) => vec![*point],
            Self::MultiPoint(points) => points.0.clone(),
            Self::Unresolved => Vec::new(),
        }
    }
}

/// What a single resolved geometry says about a changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evidence {
    /// The geometry touches the area.
    Overlaps,
    /// The geometry lies outside the buffered area.
    TooFar,
    /// Unresolved, or close to the area without touching it.
    Inconclusive,
}

/// The caller's area of interest together with its pruning margin.
///
/// The buffered area is every point within `margin` of the polygon. It is
/// only ever used to decide that a geometry is too far away to matter; the
/// acceptance test always uses the unbuffered polygon.
///
/// # Examples
///
/// ```
/// use geo::{Point, Rect, coord};
/// use changepipe_core::{Evidence, ResolvedGeometry, SearchArea};
///
/// let square = Rect::new(coord! { x: -0.5, y: -0.5 }, coord! { x: 0.5, y: 0.5 });
/// let area = SearchArea::new(square.to_polygon());
///
/// let inside = ResolvedGeometry::Point(Point::new(0.1, 0.1));
/// assert_eq!(area.assess(&inside), Evidence::Overlaps);
///
/// let far = ResolvedGeometry::Point(Point::new(50.0, 0.0));
/// assert_eq!(area.assess(&far), Evidence::TooFar);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchArea {
    area: Polygon<f64>,
    margin: f64,
}

impl SearchArea {
    /// Wrap `area` with the [`DEFAULT_NEAR_MARGIN`].
    #[must_use]
    pub const fn new(area: Polygon<f64>) -> Self {
        Self::with_margin(area, DEFAULT_NEAR_MARGIN)
    }

    /// Wrap `area` with an explicit margin in degrees.
    #[must_use]
    pub const fn with_margin(area: Polygon<f64>, margin: f64) -> Self {
        Self { area, margin }
    }

    /// Whether `polygon` shares no point with the area.
    #[must_use]
    pub fn is_disjoint_from(&self, polygon: &Polygon<f64>) -> bool {
        !polygon.intersects(&self.area)
    }

    /// Classify a resolved geometry against this area.
    #[must_use]
    pub fn assess(&self, geometry: &ResolvedGeometry) -> Evidence {
        match geometry {
            ResolvedGeometry::Unresolved => Evidence::Inconclusive,
            ResolvedGeometry::Point(point) => self.assess_points(std::slice::from_ref(point)),
            ResolvedGeometry::MultiPoint(points) => self.assess_points(&points.0),
        }
    }

    fn assess_points(&self, points: &[Point<f64>]) -> Evidence {
        if points.iter().any(|point| point.intersects(&self.area)) {
            return Evidence::Overlaps;
        }
        if points.iter().all(|point| self.is_near(point)) {
            Evidence::Inconclusive
        } else {
            Evidence::TooFar
        }
    }

    fn is_near(&self, point: &Point<f64>) -> bool {
        Euclidean.distance(point, &self.area) <= self.margin
    }
}

/// Closed polygon covering an axis-aligned bounding box.
///
/// The ring runs `(min_x, min_y)`, `(min_x, max_y)`, `(max_x, max_y)`,
/// `(max_x, min_y)` and back to the start.
#[must_use]
pub fn rect_polygon(rect: &Rect<f64>) -> Polygon<f64> {
    let min = rect.min();
    let max = rect.max();
    let ring = LineString::from(vec![
        Coord { x: min.x, y: min.y },
        Coord { x: min.x, y: max.y },
        Coord { x: max.x, y: max.y },
        Coord { x: max.x, y: min.y },
        Coord { x: min.x, y: min.y },
    ]);
    Polygon::new(ring, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;
    use rstest::{fixture, rstest};

    #[fixture]
    fn unit_square() -> SearchArea {
        let rect = Rect::new(coord! { x: -0.5, y: -0.5 }, coord! { x: 0.5, y: 0.5 });
        SearchArea::new(rect_polygon(&rect))
    }

    #[rstest]
    #[case(Point::new(0.1, 0.1), Evidence::Overlaps)]
    #[case(Point::new(0.5, 0.0), Evidence::Overlaps)]
    #[case(Point::new(3.0, 3.0), Evidence::Inconclusive)]
    #[case(Point::new(5.4, 0.0), Evidence::Inconclusive)]
    #[case(Point::new(5.6, 0.0), Evidence::TooFar)]
    #[case(Point::new(50.0, 50.0), Evidence::TooFar)]
    fn assesses_points(unit_square: SearchArea, #[case] point: Point<f64>, #[case] expected: Evidence) {
        assert_eq!(unit_square.assess(&ResolvedGeometry::Point(point)), expected);
    }

    #[rstest]
    fn unresolved_is_inconclusive(unit_square: SearchArea) {
        assert_eq!(
            unit_square.assess(&ResolvedGeometry::Unresolved),
            Evidence::Inconclusive
        );
    }

    #[rstest]
    fn multipoint_overlaps_when_any_point_touches(unit_square: SearchArea) {
        let geometry =
            ResolvedGeometry::from_points(vec![Point::new(60.0, 60.0), Point::new(0.0, 0.0)]);
        assert_eq!(unit_square.assess(&geometry), Evidence::Overlaps);
    }

    #[rstest]
    fn multipoint_is_too_far_when_any_point_leaves_buffer(unit_square: SearchArea) {
        let geometry =
            ResolvedGeometry::from_points(vec![Point::new(2.0, 2.0), Point::new(60.0, 60.0)]);
        assert_eq!(unit_square.assess(&geometry), Evidence::TooFar);
    }

    #[rstest]
    fn empty_points_are_unresolved() {
        assert!(ResolvedGeometry::from_points(Vec::new()).is_unresolved());
    }

    #[rstest]
    fn rect_polygon_is_closed_ring() {
        let rect = Rect::new(coord! { x: 1.0, y: 2.0 }, coord! { x: 3.0, y: 4.0 });
        let polygon = rect_polygon(&rect);
        let coords: Vec<_> = polygon.exterior().coords().copied().collect();
        assert_eq!(
            coords,
            vec![
                coord! { x: 1.0, y: 2.0 },
                coord! { x: 1.0, y: 4.0 },
                coord! { x: 3.0, y: 4.0 },
                coord! { x: 3.0, y: 2.0 },
                coord! { x: 1.0, y: 2.0 },
            ]
        );
    }

    #[rstest]
    fn disjoint_bounds_are_detected(unit_square: SearchArea) {
        let far = Rect::new(coord! { x: 10.0, y: 10.0 }, coord! { x: 11.0, y: 11.0 });
        let near = Rect::new(coord! { x: 0.4, y: 0.4 }, coord! { x: 2.0, y: 2.0 });
        assert!(unit_square.is_disjoint_from(&rect_polygon(&far)));
        assert!(!unit_square.is_disjoint_from(&rect_polygon(&near)));
    }
}
