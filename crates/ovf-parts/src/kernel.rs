//! Polygon capability used by part tracking.
//!
//! Part tracking only needs three things from a geometry library: turn a
//! closed ring into a validated shape, test two shapes for intersection, and
//! union two shapes. [`GeometryKernel`] is that seam; [`GeoKernel`] is the
//! implementation backed by the `geo` crate.

use geo::{Area, BooleanOps, Coord, Intersects, LineString, MultiPolygon, Polygon, Validation};
use ovf_job::Point2;

/// Shapes with an area at or below this (mm²) are treated as degenerate.
pub const MIN_AREA: f64 = 1e-12;

/// Polygon construction, intersection and union.
pub trait GeometryKernel: Sync {
    /// A polygonal region (a single polygon or a union of several).
    type Shape: Clone + Send;

    /// Build a shape from a closed ring (first point == last point).
    ///
    /// Returns `None` when the ring is not a valid simple polygon.
    fn polygon(&self, ring: &[Point2]) -> Option<Self::Shape>;

    /// Do the two shapes share any point (boundary contact included)?
    fn intersects(&self, a: &Self::Shape, b: &Self::Shape) -> bool;

    /// Area union of the two shapes.
    fn union(&self, a: &Self::Shape, b: &Self::Shape) -> Self::Shape;
}

/// [`GeometryKernel`] backed by `geo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoKernel;

impl GeometryKernel for GeoKernel {
    type Shape = MultiPolygon<f64>;

    fn polygon(&self, ring: &[Point2]) -> Option<Self::Shape> {
        if ring.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return None;
        }
        let exterior: LineString<f64> = ring.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
        let polygon = Polygon::new(exterior, Vec::new());

        if !polygon.is_valid() || polygon.unsigned_area() <= MIN_AREA {
            return None;
        }
        Some(MultiPolygon::new(vec![polygon]))
    }

    fn intersects(&self, a: &Self::Shape, b: &Self::Shape) -> bool {
        a.intersects(b)
    }

    fn union(&self, a: &Self::Shape, b: &Self::Shape) -> Self::Shape {
        a.union(b)
    }
}
