//! Layer-to-layer part tracking.
//!
//! Each layer is one step of a fold over the height-sorted stack. A step
//! takes the footprints left by the layer below, matches every contour of the
//! current layer against them, and returns the footprints for the layer
//! above. Nothing else is carried between layers.

use indexmap::map::Entry;
use indexmap::IndexMap;
use ovf_job::{PartKey, WorkPlane};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, trace, warn};

use crate::contour::contours;
use crate::kernel::GeometryKernel;
use crate::polygon::build_polygon;
use crate::registry::PartRegistry;

/// Per-part area realized up to the layer just processed.
///
/// Iteration follows insertion order: the order in which each part's first
/// contour appeared on that layer. This fixes the tie-break when a contour
/// touches more than one footprint.
pub type LayerFootprints<S> = IndexMap<PartKey, S>;

/// What a part's footprint carries into the next layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootprintMode {
    /// Union of the previous footprint and every matching contour.
    #[default]
    Accumulate,
    /// Union of the matching contours on the current layer only.
    LayerOnly,
}

/// How a single contour was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Continues the part below.
    Continued(PartKey),
    /// Starts a new part.
    Created(PartKey),
}

impl Resolution {
    /// The part key the contour now carries.
    pub fn part_key(self) -> PartKey {
        match self {
            Resolution::Continued(key) | Resolution::Created(key) => key,
        }
    }
}

/// Counters for one processed layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerStats {
    /// Line-sequence blocks on the layer.
    pub contours: usize,
    /// Contours that received a part key.
    pub assigned: usize,
    /// Contours left unassigned: not a valid polygon, or no part key left.
    pub skipped: usize,
    /// Parts started on this layer.
    pub parts_created: usize,
}

/// Result of one fold step.
#[derive(Debug, Clone)]
pub struct LayerOutcome<S> {
    /// Footprints to hand to the next layer.
    pub footprints: LayerFootprints<S>,
    /// Layer counters.
    pub stats: LayerStats,
}

/// Matches contours against the footprints of the layer below.
#[derive(Debug, Clone, Copy)]
pub struct PartTracker<'k, K> {
    kernel: &'k K,
    mode: FootprintMode,
    parallel: bool,
}

impl<'k, K: GeometryKernel> PartTracker<'k, K> {
    /// Create a tracker over `kernel`.
    pub fn new(kernel: &'k K, mode: FootprintMode) -> Self {
        Self {
            kernel,
            mode,
            parallel: false,
        }
    }

    /// Build each layer's polygons on the rayon pool.
    ///
    /// Matching and part allocation stay sequential in block order either
    /// way, so results do not depend on this flag.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Process one layer.
    ///
    /// Writes the part key of every valid contour on `plane`, allocates new
    /// parts through `registry`, and returns the footprints for the next
    /// layer. Invalid contours are left untouched.
    pub fn step(
        &self,
        previous: &LayerFootprints<K::Shape>,
        plane: &mut WorkPlane,
        registry: &mut PartRegistry<'_>,
    ) -> LayerOutcome<K::Shape> {
        let _span = debug_span!("layer", number = plane.work_plane_number, z = plane.z_pos_in_mm)
            .entered();

        let polygons = self.build_polygons(plane);
        let mut current = LayerFootprints::new();
        let mut stats = LayerStats {
            contours: polygons.len(),
            ..LayerStats::default()
        };

        for (block_idx, polygon) in polygons {
            let Some(polygon) = polygon else {
                trace!(block = block_idx, "skipping contour that is not a valid polygon");
                stats.skipped += 1;
                continue;
            };

            let Some(resolution) = self.resolve(previous, &mut current, polygon, registry) else {
                warn!(block = block_idx, "part keys exhausted, leaving contour unassigned");
                stats.skipped += 1;
                continue;
            };
            match resolution {
                Resolution::Continued(key) => {
                    trace!(block = block_idx, part = key, "contour continues part");
                }
                Resolution::Created(key) => {
                    trace!(block = block_idx, part = key, "contour starts new part");
                    stats.parts_created += 1;
                }
            }
            plane.vector_blocks[block_idx].set_part_key(resolution.part_key());
            stats.assigned += 1;
        }

        debug!(
            contours = stats.contours,
            assigned = stats.assigned,
            skipped = stats.skipped,
            parts_created = stats.parts_created,
            footprints = current.len(),
            "layer processed"
        );

        LayerOutcome {
            footprints: current,
            stats,
        }
    }

    /// Match one polygon and record it in `current`.
    ///
    /// The first footprint in `previous` that intersects the polygon wins;
    /// any later intersecting footprints are ignored. Without a match a new
    /// part is allocated; `None` means no part key is left to allocate.
    pub fn resolve(
        &self,
        previous: &LayerFootprints<K::Shape>,
        current: &mut LayerFootprints<K::Shape>,
        polygon: K::Shape,
        registry: &mut PartRegistry<'_>,
    ) -> Option<Resolution> {
        let parent = previous
            .iter()
            .find(|(_, footprint)| self.kernel.intersects(footprint, &polygon));

        match parent {
            Some((&key, footprint)) => {
                let polygon = match self.mode {
                    FootprintMode::Accumulate if !current.contains_key(&key) => {
                        self.kernel.union(footprint, &polygon)
                    }
                    _ => polygon,
                };
                self.merge_into(current, key, polygon);
                Some(Resolution::Continued(key))
            }
            None => {
                let key = registry.allocate()?;
                self.merge_into(current, key, polygon);
                Some(Resolution::Created(key))
            }
        }
    }

    /// Union `polygon` into the footprint stored under `key`.
    ///
    /// An existing entry is updated in place and keeps its position.
    fn merge_into(&self, current: &mut LayerFootprints<K::Shape>, key: PartKey, polygon: K::Shape) {
        match current.entry(key) {
            Entry::Occupied(mut slot) => {
                let merged = self.kernel.union(slot.get(), &polygon);
                slot.insert(merged);
            }
            Entry::Vacant(slot) => {
                slot.insert(polygon);
            }
        }
    }

    fn build_polygons(&self, plane: &WorkPlane) -> Vec<(usize, Option<K::Shape>)> {
        let kernel = self.kernel;
        let found: Vec<_> = contours(plane).collect();
        if self.parallel {
            found
                .into_par_iter()
                .map(|(idx, seq)| (idx, build_polygon(kernel, seq)))
                .collect()
        } else {
            found
                .into_iter()
                .map(|(idx, seq)| (idx, build_polygon(kernel, seq)))
                .collect()
        }
    }
}
