//! Changeset bounding boxes as polygons.

use geo::Polygon;
use log::debug;

use crate::{ChangesetId, UpstreamError, UpstreamGeoApi, rect_polygon};

/// Turns a changeset's upstream bounding box into a polygon.
///
/// Bounds are not cached: a changeset still open upstream may grow between
/// two checks.
#[derive(Debug, Clone, Copy)]
pub struct ChangesetBoundsResolver<U> {
    upstream: U,
}

impl<U: UpstreamGeoApi> ChangesetBoundsResolver<U> {
    /// Create a resolver over the given upstream API.
    #[must_use]
    pub const fn new(upstream: U) -> Self {
        Self { upstream }
    }

    /// Closed polygon covering the changeset's bounding box, or `None` when
    /// the changeset has no edits applied yet.
    ///
    /// # Errors
    ///
    /// Propagates the upstream failure unchanged.
    pub fn bounds_of(&self, changeset: ChangesetId) -> Result<Option<Polygon<f64>>, UpstreamError> {
        let Some(rect) = self.upstream.changeset_bounds(changeset)? else {
            debug!("{changeset} has no bounds yet");
            return Ok(None);
        };
        Ok(Some(rect_polygon(&rect)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Rect, coord};
    use rstest::rstest;

    use crate::test_support::{StubUpstream, UpstreamCall};

    #[rstest]
    fn bounds_become_closed_polygon() {
        let rect = Rect::new(coord! { x: 1.0, y: 2.0 }, coord! { x: 3.0, y: 4.0 });
        let upstream = StubUpstream::default().with_bounds(ChangesetId(7), Some(rect));
        let resolver = ChangesetBoundsResolver::new(&upstream);

        let polygon = resolver
            .bounds_of(ChangesetId(7))
            .expect("bounds")
            .expect("bounds present");

        assert_eq!(polygon, rect_polygon(&rect));
        assert_eq!(
            upstream.calls(),
            vec![UpstreamCall::ChangesetBounds(ChangesetId(7))]
        );
    }

    #[rstest]
    fn empty_changeset_has_no_bounds() {
        let upstream = StubUpstream::default().with_bounds(ChangesetId(7), None);
        let resolver = ChangesetBoundsResolver::new(&upstream);

        assert_eq!(resolver.bounds_of(ChangesetId(7)).expect("bounds"), None);
    }

    #[rstest]
    fn unknown_changeset_is_an_error() {
        let upstream = StubUpstream::default();
        let resolver = ChangesetBoundsResolver::new(&upstream);

        assert_eq!(
            resolver.bounds_of(ChangesetId(8)),
            Err(UpstreamError::MissingChangeset { id: 8 })
        );
    }
}
