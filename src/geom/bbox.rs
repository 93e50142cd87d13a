use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use rstar::{RTree, RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a geometry by row index.
#[derive(Debug, Clone)]
pub(crate) struct BoundingBox {
    idx: usize,
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub(crate) fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Get the row index of the corresponding geometry.
    pub(crate) fn idx(&self) -> usize { self.idx }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// R-tree over the bounding boxes of a geometry column; rows without geometry are skipped.
pub(crate) struct BoxIndex {
    rtree: RTree<BoundingBox>,
}

impl BoxIndex {
    pub(crate) fn new(geometry: &[Option<MultiPolygon<f64>>]) -> Self {
        Self {
            rtree: RTree::bulk_load(
                geometry.iter().enumerate()
                    .filter_map(|(i, g)| Some(BoundingBox::new(i, g.as_ref()?.bounding_rect()?)))
                    .collect()
            ),
        }
    }

    /// Row indices whose bounding boxes intersect `rect`, in ascending order.
    pub(crate) fn candidates(&self, rect: &Rect<f64>) -> Vec<usize> {
        let envelope = AABB::from_corners(rect.min().into(), rect.max().into());
        let mut rows: Vec<usize> = self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(BoundingBox::idx)
            .collect();
        rows.sort_unstable();
        rows
    }
}

/// Whether two rectangles overlap (touching counts).
#[inline]
pub(crate) fn rects_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x
        && a.min().y <= b.max().y && b.min().y <= a.max().y
}

/// Rectangle from corner coordinates in any order.
#[inline]
pub(crate) fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect<f64> {
    Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
}
