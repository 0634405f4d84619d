#![warn(missing_docs)]

//! Part assignment for layered build jobs.
//!
//! A build job only knows its geometry layer by layer. This crate works out
//! which closed contours on successive layers belong to the same physical
//! part and tags each of them with a stable part key.
//!
//! Layers are folded bottom to top. On every layer each contour is turned
//! into a polygon and tested against the footprints of the parts alive on
//! the layer below: the first footprint it touches claims it, otherwise a new
//! part is registered in the job's manifest.
//!
//! # Example
//!
//! ```ignore
//! use ovf_job::Job;
//! use ovf_parts::{AssignSettings, PartAssigner};
//!
//! let mut job = Job::from_json(&std::fs::read_to_string("job.json")?)?;
//! let report = PartAssigner::new(AssignSettings::default())?.assign(&mut job);
//!
//! println!("{report}");
//! ```

pub mod contour;
pub mod error;
pub mod kernel;
pub mod polygon;
pub mod registry;
pub mod report;
pub mod tracker;

pub use contour::contours;
pub use error::{PartsError, Result};
pub use kernel::{GeoKernel, GeometryKernel};
pub use polygon::{build_polygon, closed_ring};
pub use registry::PartRegistry;
pub use report::AssignReport;
pub use tracker::{FootprintMode, LayerFootprints, LayerStats, PartTracker, Resolution};

use ovf_job::Job;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

/// Part assignment parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignSettings {
    /// Display-name prefix for new parts (`"Part-"` gives `"Part-1"`).
    pub part_name_prefix: String,
    /// What a footprint carries from one layer to the next.
    pub footprint_mode: FootprintMode,
    /// Build each layer's polygons in parallel.
    pub parallel_polygons: bool,
}

impl Default for AssignSettings {
    fn default() -> Self {
        Self {
            part_name_prefix: "Part-".to_string(),
            footprint_mode: FootprintMode::Accumulate,
            parallel_polygons: false,
        }
    }
}

impl AssignSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.part_name_prefix.trim().is_empty() {
            return Err(PartsError::InvalidSettings(
                "part_name_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Runs the assignment pass over whole jobs.
#[derive(Debug, Clone)]
pub struct PartAssigner<K = GeoKernel> {
    settings: AssignSettings,
    kernel: K,
}

impl Default for PartAssigner {
    fn default() -> Self {
        Self {
            settings: AssignSettings::default(),
            kernel: GeoKernel,
        }
    }
}

impl PartAssigner {
    /// Assigner backed by the `geo` kernel.
    pub fn new(settings: AssignSettings) -> Result<Self> {
        Self::with_kernel(settings, GeoKernel)
    }
}

impl<K: GeometryKernel> PartAssigner<K> {
    /// Assigner backed by a custom geometry kernel.
    pub fn with_kernel(settings: AssignSettings, kernel: K) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings, kernel })
    }

    /// Settings in use.
    pub fn settings(&self) -> &AssignSettings {
        &self.settings
    }

    /// Assign part keys to every contour of `job`.
    ///
    /// Layers are processed in ascending build height regardless of their
    /// order in the job. New parts are appended to `job.parts_map`; existing
    /// parts are kept and numbering continues after the largest key.
    pub fn assign(&self, job: &mut Job) -> AssignReport {
        let _span = info_span!("assign_parts").entered();

        let order = job.layer_order();
        let Job {
            work_planes,
            parts_map,
            ..
        } = job;

        let mut registry = PartRegistry::new(parts_map, &self.settings.part_name_prefix);
        let tracker = PartTracker::new(&self.kernel, self.settings.footprint_mode)
            .parallel(self.settings.parallel_polygons);
        let mut report = AssignReport::default();

        order
            .into_iter()
            .fold(LayerFootprints::new(), |previous, idx| {
                let outcome = tracker.step(&previous, &mut work_planes[idx], &mut registry);
                report.record(&outcome.stats);
                outcome.footprints
            });

        report.total_parts = registry.len();
        info!(
            layers = report.layers,
            contours = report.contours,
            skipped = report.skipped,
            parts_created = report.parts_created,
            total_parts = report.total_parts,
            "part assignment finished"
        );
        report
    }
}

/// Assign part keys to every contour of `job` with default settings.
///
/// See [`PartAssigner::assign`].
pub fn assign_parts(job: &mut Job) {
    PartAssigner::<GeoKernel>::default().assign(job);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovf_job::{Hatches, Part, VectorBlock, VectorData, WorkPlane, UNASSIGNED_PART};
    use tracing_subscriber::EnvFilter;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn rect(x0: f32, y0: f32, w: f32, h: f32) -> VectorBlock {
        VectorBlock::line_sequence(&[(x0, y0), (x0 + w, y0), (x0 + w, y0 + h), (x0, y0 + h)])
    }

    fn layer(number: i32, z: f32, blocks: Vec<VectorBlock>) -> WorkPlane {
        WorkPlane {
            work_plane_number: number,
            z_pos_in_mm: z,
            vector_blocks: blocks,
        }
    }

    fn job(layers: Vec<WorkPlane>) -> Job {
        let mut job = Job::new("test");
        job.work_planes = layers;
        job
    }

    fn keys(plane: &WorkPlane) -> Vec<u32> {
        plane.vector_blocks.iter().map(VectorBlock::part_key).collect()
    }

    #[test]
    fn single_square_becomes_part_one() {
        init_tracing();
        let mut job = job(vec![layer(0, 0.0, vec![rect(0.0, 0.0, 10.0, 10.0)])]);
        assign_parts(&mut job);

        assert_eq!(keys(&job.work_planes[0]), vec![1]);
        assert_eq!(job.parts_map.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(job.parts_map[&1].name, "Part-1");
    }

    #[test]
    fn identical_square_on_next_layer_continues_part() {
        let mut job = job(vec![
            layer(0, 0.0, vec![rect(0.0, 0.0, 1.0, 1.0)]),
            layer(1, 0.1, vec![rect(0.0, 0.0, 1.0, 1.0)]),
        ]);
        assign_parts(&mut job);

        assert_eq!(keys(&job.work_planes[1]), vec![1]);
        assert_eq!(job.parts_map.len(), 1);
    }

    #[test]
    fn disjoint_square_on_next_layer_starts_new_part() {
        let mut job = job(vec![
            layer(0, 0.0, vec![rect(0.0, 0.0, 10.0, 10.0)]),
            layer(1, 0.1, vec![rect(100.0, 0.0, 10.0, 10.0)]),
        ]);
        assign_parts(&mut job);

        assert_eq!(keys(&job.work_planes[0]), vec![1]);
        assert_eq!(keys(&job.work_planes[1]), vec![2]);
        assert_eq!(job.parts_map.len(), 2);
    }

    #[test]
    fn single_point_contour_stays_unassigned() {
        let mut job = job(vec![layer(
            0,
            0.0,
            vec![VectorBlock::line_sequence(&[(5.0, 5.0)])],
        )]);
        let report = PartAssigner::<GeoKernel>::default().assign(&mut job);

        assert_eq!(keys(&job.work_planes[0]), vec![UNASSIGNED_PART]);
        assert!(job.parts_map.is_empty());
        assert_eq!(report.skipped, 1);
        assert_eq!(report.assigned, 0);
    }

    #[test]
    fn two_disjoint_squares_on_one_layer() {
        let mut job = job(vec![layer(
            0,
            0.0,
            vec![rect(0.0, 0.0, 10.0, 10.0), rect(20.0, 0.0, 10.0, 10.0)],
        )]);
        assign_parts(&mut job);

        assert_eq!(keys(&job.work_planes[0]), vec![1, 2]);
        assert_eq!(job.parts_map.len(), 2);
    }

    #[test]
    fn non_contour_blocks_are_untouched() {
        let hatch = VectorBlock::new(VectorData::Hatches(Hatches {
            points: vec![0.0, 5.0, 10.0, 5.0],
        }));
        let bow_tie = VectorBlock::line_sequence(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)]);
        let mut job = job(vec![layer(
            0,
            0.0,
            vec![hatch.clone(), rect(0.0, 0.0, 10.0, 10.0), bow_tie.clone()],
        )]);
        assign_parts(&mut job);

        let blocks = &job.work_planes[0].vector_blocks;
        assert_eq!(blocks[0], hatch);
        assert_eq!(blocks[1].part_key(), 1);
        assert_eq!(blocks[2], bow_tie);
    }

    #[test]
    fn layers_are_processed_by_height_not_file_order() {
        // File order puts the bridge first; by height it comes last.
        let mut job = job(vec![
            layer(2, 0.2, vec![rect(0.0, 0.0, 30.0, 10.0)]),
            layer(0, 0.0, vec![rect(0.0, 0.0, 10.0, 10.0)]),
            layer(1, 0.1, vec![rect(20.0, 0.0, 10.0, 10.0)]),
        ]);
        assign_parts(&mut job);

        assert_eq!(keys(&job.work_planes[1]), vec![1]);
        assert_eq!(keys(&job.work_planes[2]), vec![2]);
        // The bridge on the top layer only sees part 2: part 1 is absent on 0.1.
        assert_eq!(keys(&job.work_planes[0]), vec![2]);
        assert_eq!(job.parts_map.len(), 2);
    }

    #[test]
    fn accumulated_footprint_keeps_overhanging_part() {
        // Layer 1 shrinks to the left half; layer 2 sits on the right half.
        let layers = vec![
            layer(0, 0.0, vec![rect(0.0, 0.0, 20.0, 10.0)]),
            layer(1, 0.1, vec![rect(0.0, 0.0, 5.0, 10.0)]),
            layer(2, 0.2, vec![rect(15.0, 0.0, 5.0, 10.0)]),
        ];

        let mut accumulate = job(layers.clone());
        PartAssigner::<GeoKernel>::default().assign(&mut accumulate);
        assert_eq!(keys(&accumulate.work_planes[2]), vec![1]);

        let settings = AssignSettings {
            footprint_mode: FootprintMode::LayerOnly,
            ..AssignSettings::default()
        };
        let mut layer_only = job(layers);
        PartAssigner::new(settings).unwrap().assign(&mut layer_only);
        assert_eq!(keys(&layer_only.work_planes[2]), vec![2]);
    }

    #[test]
    fn tie_break_follows_block_order_of_layer_below() {
        // The middle layer lists part 2 before part 1, so part 2 comes first
        // when the bridge on top touches both.
        let settings = AssignSettings {
            footprint_mode: FootprintMode::LayerOnly,
            ..AssignSettings::default()
        };
        let mut job = job(vec![
            layer(0, 0.0, vec![rect(0.0, 0.0, 10.0, 10.0), rect(20.0, 0.0, 10.0, 10.0)]),
            layer(1, 0.1, vec![rect(20.0, 0.0, 10.0, 10.0), rect(0.0, 0.0, 10.0, 10.0)]),
            layer(2, 0.2, vec![rect(0.0, 0.0, 30.0, 10.0)]),
        ]);
        PartAssigner::new(settings).unwrap().assign(&mut job);

        assert_eq!(keys(&job.work_planes[0]), vec![1, 2]);
        assert_eq!(keys(&job.work_planes[1]), vec![2, 1]);
        assert_eq!(keys(&job.work_planes[2]), vec![2]);
    }

    #[test]
    fn manifest_at_max_key_leaves_new_contours_unassigned() {
        let mut job = job(vec![layer(0, 0.0, vec![rect(0.0, 0.0, 10.0, 10.0)])]);
        job.parts_map.insert(
            u32::MAX,
            Part {
                name: "big".to_string(),
            },
        );
        let report = PartAssigner::<GeoKernel>::default().assign(&mut job);

        assert_eq!(keys(&job.work_planes[0]), vec![UNASSIGNED_PART]);
        assert_eq!(job.parts_map.len(), 1);
        assert!(!job.parts_map.contains_key(&UNASSIGNED_PART));
        assert_eq!(report.skipped, 1);
        assert_eq!(report.parts_created, 0);
    }

    #[test]
    fn tower_keeps_one_part() {
        let layers = (0..20)
            .map(|i| layer(i, i as f32 * 0.05, vec![rect(0.0, 0.0, 10.0, 10.0)]))
            .collect();
        let mut job = job(layers);
        let report = PartAssigner::<GeoKernel>::default().assign(&mut job);

        assert!(job.work_planes.iter().all(|plane| keys(plane) == vec![1]));
        assert_eq!(report.layers, 20);
        assert_eq!(report.parts_created, 1);
        assert_eq!(report.total_parts, 1);
    }

    #[test]
    fn existing_parts_are_kept_and_numbering_continues() {
        let mut job = job(vec![layer(0, 0.0, vec![rect(0.0, 0.0, 10.0, 10.0)])]);
        job.parts_map.insert(
            4,
            Part {
                name: "Fixture".to_string(),
            },
        );
        let report = PartAssigner::<GeoKernel>::default().assign(&mut job);

        assert_eq!(keys(&job.work_planes[0]), vec![5]);
        assert_eq!(job.parts_map[&4].name, "Fixture");
        assert_eq!(report.parts_created, 1);
        assert_eq!(report.total_parts, 2);
    }

    #[test]
    fn deterministic_across_runs() {
        let build = || {
            job(vec![
                layer(
                    0,
                    0.0,
                    vec![
                        rect(0.0, 0.0, 10.0, 10.0),
                        rect(20.0, 0.0, 10.0, 10.0),
                        rect(40.0, 0.0, 10.0, 10.0),
                    ],
                ),
                layer(
                    1,
                    0.1,
                    vec![rect(5.0, 0.0, 20.0, 10.0), rect(60.0, 0.0, 5.0, 5.0)],
                ),
            ])
        };
        let mut a = build();
        let mut b = build();
        let settings = AssignSettings {
            parallel_polygons: true,
            ..AssignSettings::default()
        };
        assign_parts(&mut a);
        PartAssigner::new(settings).unwrap().assign(&mut b);

        assert_eq!(a, b);
        // The wide contour touches parts 1 and 2 and joins the first.
        assert_eq!(keys(&a.work_planes[1]), vec![1, 4]);
    }

    #[test]
    fn part_count_never_shrinks() {
        let mut job = job(vec![
            layer(0, 0.0, vec![rect(0.0, 0.0, 10.0, 10.0)]),
            layer(1, 0.1, vec![]),
            layer(2, 0.2, vec![rect(0.0, 0.0, 10.0, 10.0)]),
        ]);
        assign_parts(&mut job);

        // The empty layer ends part 1; the square above starts a new part.
        assert_eq!(keys(&job.work_planes[2]), vec![2]);
        assert_eq!(job.parts_map.len(), 2);
    }

    #[test]
    fn empty_job() {
        let mut job = Job::default();
        let report = PartAssigner::<GeoKernel>::default().assign(&mut job);
        assert_eq!(report, AssignReport::default());
    }

    #[test]
    fn rerun_starts_fresh_and_continues_numbering() {
        let mut job = job(vec![
            layer(0, 0.0, vec![rect(0.0, 0.0, 10.0, 10.0)]),
            layer(1, 0.1, vec![rect(0.0, 0.0, 10.0, 10.0)]),
        ]);
        assign_parts(&mut job);
        assign_parts(&mut job);

        // The second pass cannot see the first pass's footprints.
        assert_eq!(keys(&job.work_planes[0]), vec![2]);
        assert_eq!(keys(&job.work_planes[1]), vec![2]);
        assert_eq!(job.parts_map.len(), 2);
    }

    #[test]
    fn settings_validation() {
        let settings = AssignSettings {
            part_name_prefix: "  ".to_string(),
            ..AssignSettings::default()
        };
        assert!(settings.validate().is_err());
        assert!(matches!(
            PartAssigner::new(settings),
            Err(PartsError::InvalidSettings(_))
        ));
        assert!(AssignSettings::default().validate().is_ok());
    }

    #[test]
    fn settings_from_partial_toml() {
        let settings: AssignSettings = toml::from_str(
            r#"
            footprint_mode = "layer_only"
            parallel_polygons = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.footprint_mode, FootprintMode::LayerOnly);
        assert!(settings.parallel_polygons);
        assert_eq!(settings.part_name_prefix, "Part-");
    }

    #[test]
    fn custom_prefix_names_parts() {
        let settings = AssignSettings {
            part_name_prefix: "Body ".to_string(),
            ..AssignSettings::default()
        };
        let mut job = job(vec![layer(0, 0.0, vec![rect(0.0, 0.0, 1.0, 1.0)])]);
        let assigner = PartAssigner::new(settings).unwrap();
        assigner.assign(&mut job);
        assert_eq!(job.parts_map[&1].name, "Body 1");
        assert_eq!(assigner.settings().part_name_prefix, "Body ");
    }
}
