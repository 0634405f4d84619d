//! Contour selection: which blocks of a layer take part in part matching.

use ovf_job::{LineSequence, WorkPlane};

/// Line-sequence blocks of `plane` in block order, with their block index.
///
/// Hatches, points, arcs and pauses are skipped; they never carry a part
/// outline.
pub fn contours(plane: &WorkPlane) -> impl Iterator<Item = (usize, &LineSequence)> + '_ {
    plane
        .vector_blocks
        .iter()
        .enumerate()
        .filter_map(|(idx, block)| block.as_line_sequence().map(|seq| (idx, seq)))
}
