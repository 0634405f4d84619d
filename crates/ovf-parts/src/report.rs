//! Summary of an assignment pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tracker::LayerStats;

/// Counters for a whole assignment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignReport {
    /// Layers processed.
    pub layers: usize,
    /// Line-sequence blocks seen.
    pub contours: usize,
    /// Contours that received a part key.
    pub assigned: usize,
    /// Contours left unassigned (not a valid polygon).
    pub skipped: usize,
    /// Parts created by this pass.
    pub parts_created: usize,
    /// Parts in the job's manifest after the pass.
    pub total_parts: usize,
}

impl AssignReport {
    /// Fold one layer's counters into the report.
    pub fn record(&mut self, layer: &LayerStats) {
        self.layers += 1;
        self.contours += layer.contours;
        self.assigned += layer.assigned;
        self.skipped += layer.skipped;
        self.parts_created += layer.parts_created;
    }
}

impl fmt::Display for AssignReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "found {} parts ({} new): assigned {} of {} contours across {} layers",
            self.total_parts, self.parts_created, self.assigned, self.contours, self.layers
        )?;
        if self.skipped > 0 {
            write!(f, ", skipped {} invalid", self.skipped)?;
        }
        Ok(())
    }
}
