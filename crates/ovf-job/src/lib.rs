#![warn(missing_docs)]

//! In-memory model of a layered build job.
//!
//! A [`Job`] is an ordered stack of [`WorkPlane`]s, each holding the
//! [`VectorBlock`]s (toolpath geometry) exposed on that layer, plus the
//! manifest of physical [`Part`]s those blocks belong to.
//!
//! The model is purely declarative; reading the binary job format is handled
//! elsewhere. A JSON form is provided for interchange and fixtures.

pub mod error;

pub use error::{JobError, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a part. `0` means "unassigned".
pub type PartKey = u32;

/// Part key carried by geometry that belongs to no part.
pub const UNASSIGNED_PART: PartKey = 0;

/// A point in the plane of a work plane (mm).
pub type Point2 = nalgebra::Point2<f64>;

/// Which region of a part a block exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PartArea {
    /// Core (infill) exposure.
    #[default]
    Volume,
    /// Outline exposure.
    Contour,
    /// Transition between volume and contour.
    Transition,
}

/// Process metadata for laser powder bed fusion blocks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LpbfMetadata {
    /// Region of the part this block exposes.
    pub part_area: PartArea,
}

/// Metadata attached to a vector block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VectorBlockMetaData {
    /// Owning part, or [`UNASSIGNED_PART`].
    pub part_key: PartKey,
}

/// A connected polyline, given as a flat `[x0, y0, x1, y1, ...]` list.
///
/// Closed line sequences are the outlines of a layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineSequence {
    /// Flat coordinate list.
    pub points: Vec<f32>,
}

impl LineSequence {
    /// Create a line sequence from a flat coordinate list.
    pub fn new(points: Vec<f32>) -> Self {
        Self { points }
    }

    /// Create a line sequence from `(x, y)` vertices.
    pub fn from_vertices(vertices: &[(f32, f32)]) -> Self {
        Self {
            points: vertices.iter().flat_map(|&(x, y)| [x, y]).collect(),
        }
    }

    /// Number of complete `(x, y)` pairs. A trailing unpaired value is ignored.
    pub fn vertex_count(&self) -> usize {
        self.points.len() / 2
    }

    /// Vertices in order, widened to `f64`.
    pub fn vertices(&self) -> impl Iterator<Item = Point2> + '_ {
        self.points
            .chunks_exact(2)
            .map(|xy| Point2::new(f64::from(xy[0]), f64::from(xy[1])))
    }
}

/// Independent line segments, given as `[x0, y0, x1, y1, ...]` endpoint pairs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hatches {
    /// Flat coordinate list, two points per hatch line.
    pub points: Vec<f32>,
}

/// Individually exposed points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointSequence {
    /// Flat coordinate list.
    pub points: Vec<f32>,
}

/// Circular arcs sharing a sweep angle and start offset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Arcs {
    /// Sweep angle in degrees (positive = counter-clockwise).
    pub angle: f64,
    /// Start point offset from each center, X (mm).
    pub start_dx: f32,
    /// Start point offset from each center, Y (mm).
    pub start_dy: f32,
    /// Flat list of arc centers.
    pub centers: Vec<f32>,
}

/// Geometry carried by a vector block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VectorData {
    /// Connected polyline (closed for contours).
    LineSequence(LineSequence),
    /// Hatch lines.
    Hatches(Hatches),
    /// Point exposures.
    PointSequence(PointSequence),
    /// Arcs.
    Arcs(Arcs),
    /// Dwell without exposure.
    ExposurePause {
        /// Pause duration in microseconds.
        pause_in_us: u64,
    },
}

/// One block of toolpath geometry on a work plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorBlock {
    /// Key into the job's marking parameter table (`-1` = none).
    #[serde(default = "default_marking_params_key")]
    pub marking_params_key: i32,
    /// The geometry itself.
    pub data: VectorData,
    /// Optional block metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<VectorBlockMetaData>,
    /// Optional LPBF process metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lpbf_metadata: Option<LpbfMetadata>,
}

fn default_marking_params_key() -> i32 {
    -1
}

impl VectorBlock {
    /// Create a block with no metadata.
    pub fn new(data: VectorData) -> Self {
        Self {
            marking_params_key: default_marking_params_key(),
            data,
            meta_data: None,
            lpbf_metadata: None,
        }
    }

    /// Create a line-sequence block from `(x, y)` vertices.
    pub fn line_sequence(vertices: &[(f32, f32)]) -> Self {
        Self::new(VectorData::LineSequence(LineSequence::from_vertices(
            vertices,
        )))
    }

    /// The line sequence carried by this block, if any.
    pub fn as_line_sequence(&self) -> Option<&LineSequence> {
        match &self.data {
            VectorData::LineSequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// Part key of this block, [`UNASSIGNED_PART`] when no metadata is set.
    pub fn part_key(&self) -> PartKey {
        self.meta_data
            .map_or(UNASSIGNED_PART, |meta| meta.part_key)
    }

    /// Set the part key, creating metadata if needed.
    pub fn set_part_key(&mut self, part_key: PartKey) {
        self.meta_data
            .get_or_insert_with(VectorBlockMetaData::default)
            .part_key = part_key;
    }
}

/// One build layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkPlane {
    /// Layer number as written by the producer.
    #[serde(default)]
    pub work_plane_number: i32,
    /// Build height of this layer (mm).
    pub z_pos_in_mm: f32,
    /// Geometry blocks in exposure order.
    #[serde(default)]
    pub vector_blocks: Vec<VectorBlock>,
}

impl WorkPlane {
    /// Create an empty work plane at the given height.
    pub fn new(work_plane_number: i32, z_pos_in_mm: f32) -> Self {
        Self {
            work_plane_number,
            z_pos_in_mm,
            vector_blocks: Vec::new(),
        }
    }

    /// Builder-style block append.
    pub fn with_block(mut self, block: VectorBlock) -> Self {
        self.vector_blocks.push(block);
        self
    }
}

/// A physical part being built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Display name.
    pub name: String,
}

/// Job-level descriptive metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobMetaData {
    /// Human-readable job name.
    pub job_name: String,
}

/// A build job: the aggregate root.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Job {
    /// Descriptive metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_meta_data: Option<JobMetaData>,
    /// Layers, in file order (not necessarily sorted by height).
    #[serde(default)]
    pub work_planes: Vec<WorkPlane>,
    /// Part manifest keyed by [`PartKey`]. Never contains [`UNASSIGNED_PART`].
    #[serde(default)]
    pub parts_map: BTreeMap<PartKey, Part>,
}

impl Job {
    /// Create an empty job with the given name.
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_meta_data: Some(JobMetaData {
                job_name: job_name.into(),
            }),
            ..Self::default()
        }
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let job: Self = serde_json::from_str(json)?;
        if let Some(part) = job.parts_map.get(&UNASSIGNED_PART) {
            return Err(JobError::ReservedPartKey(part.name.clone()));
        }
        Ok(job)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Indices of [`Self::work_planes`] ordered by ascending build height.
    ///
    /// The sort is stable: planes at equal heights keep their file order.
    pub fn layer_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.work_planes.len()).collect();
        order.sort_by(|&a, &b| {
            self.work_planes[a]
                .z_pos_in_mm
                .total_cmp(&self.work_planes[b].z_pos_in_mm)
        });
        order
    }

    /// Every block tagged with `part_key`, as `(work plane index, block)`.
    pub fn blocks_for_part(
        &self,
        part_key: PartKey,
    ) -> impl Iterator<Item = (usize, &VectorBlock)> + '_ {
        self.work_planes
            .iter()
            .enumerate()
            .flat_map(|(idx, plane)| plane.vector_blocks.iter().map(move |b| (idx, b)))
            .filter(move |(_, block)| block.part_key() == part_key)
    }
}
