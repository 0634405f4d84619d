//! Contour to polygon conversion.

use ovf_job::{LineSequence, Point2};

use crate::kernel::GeometryKernel;

/// Fewest distinct vertices a contour needs before it is closed.
const MIN_VERTICES: usize = 3;

/// Fewest points in a closed ring (A, B, C, A).
const MIN_RING_POINTS: usize = 4;

/// Closed ring for `contour`, or `None` if it has too few vertices.
///
/// The last vertex is repeated from the first when the contour is open.
/// Closure uses exact coordinate equality.
pub fn closed_ring(contour: &LineSequence) -> Option<Vec<Point2>> {
    if contour.vertex_count() < MIN_VERTICES {
        return None;
    }

    let mut ring: Vec<Point2> = contour.vertices().collect();
    let first = ring[0];
    if ring[ring.len() - 1] != first {
        ring.push(first);
    }

    if ring.len() < MIN_RING_POINTS {
        return None;
    }
    Some(ring)
}

/// Build a validated polygon from `contour`.
///
/// Returns `None` for contours that are too short or that the kernel rejects
/// (self-intersecting, zero area, non-finite). This is a normal outcome, not
/// an error.
pub fn build_polygon<K: GeometryKernel>(kernel: &K, contour: &LineSequence) -> Option<K::Shape> {
    let ring = closed_ring(contour)?;
    kernel.polygon(&ring)
}
