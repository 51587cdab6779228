// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
The searchlight pass.

For every eligible center voxel the engine gathers the patch of in-bounds
neighbors, builds its correlation-distance RDM, scores it against the model
RDM and writes the score into a fresh [`ResultVolume`]. Voxels are
independent, so with the `parallel` feature they are scored on the rayon pool;
scores are written back by index afterwards, and the result does not depend
on execution order.

Numerical degeneracies never abort the pass. They are counted in the
[`SearchlightSummary`]. Early termination comes from a voxel budget
(`max_voxels`) or a [`CancellationToken`]; cells of voxels that were not
scored stay zero and outside the analysed mask.
*/

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use rsa_compute::{build_data_rdm, Degeneracy, Rdm, RdmComparison, RdmScore, SimilarityScorer};
use rsa_config::{CenterSelection, SearchlightConfig, MAX_SEARCHLIGHT_RADIUS};
use rsa_structures::{
    Mask, ResultVolume, RsaError, RsaResult, SpatialShape, Volume, VoxelCoordinate,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::neighborhood::{NeighborhoodBuilder, NeighborhoodOffsets};
use crate::patch::extract_patch;

/// Parameters of a searchlight pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchlightParams {
    pub radius: u32,
    pub centers: CenterSelection,
    /// Score at most this many centers (in row-major order), skip the rest
    pub max_voxels: Option<usize>,
    /// Log progress every N scored voxels
    pub progress_interval: usize,
    pub comparison: RdmComparison,
}

impl Default for SearchlightParams {
    fn default() -> Self {
        Self::from(&SearchlightConfig::default())
    }
}

impl From<&SearchlightConfig> for SearchlightParams {
    fn from(config: &SearchlightConfig) -> Self {
        Self {
            radius: config.radius,
            centers: config.centers,
            max_voxels: config.max_voxels,
            progress_interval: config.progress_interval,
            comparison: RdmComparison::default(),
        }
    }
}

/// Cloneable flag that stops a running pass before its next voxel
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Score of a single center voxel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelScore {
    pub center: VoxelCoordinate,
    pub score: RdmScore,
    /// In-bounds neighbors that formed the patch
    pub patch_size: usize,
    pub clipped: bool,
    /// Observations whose pattern was constant across the patch
    pub constant_patterns: usize,
}

impl VoxelScore {
    pub fn is_degenerate(&self) -> bool {
        self.constant_patterns > 0 || self.score.degeneracy.is_some()
    }
}

/// Counters of one searchlight pass, exportable as JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchlightSummary {
    pub radius: u32,
    /// Offsets in the unclipped sphere
    pub neighborhood_size: usize,
    pub eligible_voxels: usize,
    pub analyzed_voxels: usize,
    /// Eligible voxels left unscored by the budget or cancellation
    pub skipped_voxels: usize,
    /// Voxels with any degeneracy
    pub degenerate_voxels: usize,
    pub constant_pattern_voxels: usize,
    pub undefined_correlation_voxels: usize,
    /// Voxels whose sphere was cut by the volume boundary
    pub clipped_patches: usize,
    /// A scheduled center went unscored because the token was cancelled
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl SearchlightSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Result volume and counters of a pass
#[derive(Debug, Clone)]
pub struct SearchlightOutput {
    pub result: ResultVolume,
    pub summary: SearchlightSummary,
}

/// Called with (scored so far, centers scheduled) after each scored voxel
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

pub struct SearchlightEngine {
    params: SearchlightParams,
    offsets: Arc<NeighborhoodOffsets>,
    scorer: SimilarityScorer,
    cancellation: CancellationToken,
    progress_callback: Option<ProgressCallback>,
}

impl SearchlightEngine {
    /// # Errors
    ///
    /// Returns `RsaError::InvalidRadius` above [`MAX_SEARCHLIGHT_RADIUS`] and
    /// `RsaError::BadParameters` for a zero progress interval or voxel budget.
    pub fn new(params: SearchlightParams) -> RsaResult<Self> {
        Self::with_neighborhoods(params, &NeighborhoodBuilder::new())
    }

    /// Like [`SearchlightEngine::new`], taking offsets from a shared builder
    pub fn with_neighborhoods(
        params: SearchlightParams,
        neighborhoods: &NeighborhoodBuilder,
    ) -> RsaResult<Self> {
        if params.radius > MAX_SEARCHLIGHT_RADIUS {
            return Err(RsaError::InvalidRadius(format!(
                "radius {} exceeds the maximum of {}",
                params.radius, MAX_SEARCHLIGHT_RADIUS
            )));
        }
        if params.progress_interval == 0 {
            return Err(RsaError::BadParameters(
                "progress_interval must be greater than 0".into(),
            ));
        }
        if params.max_voxels == Some(0) {
            return Err(RsaError::BadParameters(
                "max_voxels must be greater than 0 when set".into(),
            ));
        }

        let offsets = neighborhoods.build(params.radius);
        let scorer = SimilarityScorer::new(params.comparison);
        Ok(Self {
            params,
            offsets,
            scorer,
            cancellation: CancellationToken::new(),
            progress_callback: None,
        })
    }

    /// Observe progress voxel by voxel. Runs on the scoring threads.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn params(&self) -> &SearchlightParams {
        &self.params
    }

    pub fn offsets(&self) -> &NeighborhoodOffsets {
        &self.offsets
    }

    /// Center voxels in row-major order, before the voxel budget is applied.
    ///
    /// With [`CenterSelection::Mask`] and no mask, every voxel is eligible.
    pub fn eligible_centers(
        &self,
        shape: SpatialShape,
        mask: Option<&Mask>,
    ) -> RsaResult<Vec<VoxelCoordinate>> {
        if let Some(mask) = mask {
            mask.ensure_shape(shape)?;
        }
        match (self.params.centers, mask) {
            (CenterSelection::Mask, Some(mask)) => Ok(mask.coordinates()),
            _ => Ok(Mask::full(shape)?.coordinates()),
        }
    }

    /// Score one center voxel against `model`
    pub fn score_voxel(
        &self,
        volume: &Volume,
        model: &Rdm,
        center: VoxelCoordinate,
    ) -> RsaResult<VoxelScore> {
        let patch = extract_patch(volume, center, &self.offsets)?;
        let data = build_data_rdm(patch.data.view())?;
        let mut score = self.scorer.score(&data.rdm, model)?;
        if score.degeneracy.is_none() && data.is_degenerate() {
            score.degeneracy = Some(Degeneracy::ConstantPattern);
        }
        Ok(VoxelScore {
            center,
            score,
            patch_size: patch.n_voxels(),
            clipped: patch.clipped,
            constant_patterns: data.constant_patterns,
        })
    }

    /// Run the pass over `volume`, whose observations must line up with `model`.
    ///
    /// # Errors
    ///
    /// Fails before any voxel is scored if the model RDM size differs from the
    /// number of observations or the mask shape differs from the volume.
    pub fn run(
        &self,
        volume: &Volume,
        model: &Rdm,
        mask: Option<&Mask>,
    ) -> RsaResult<SearchlightOutput> {
        let started = Instant::now();
        let shape = volume.spatial_shape();

        if model.size() != volume.n_observations() {
            return Err(RsaError::RdmSizeMismatch {
                left: volume.n_observations(),
                right: model.size(),
            });
        }

        let eligible = self.eligible_centers(shape, mask)?;
        let budget = self.params.max_voxels.unwrap_or(usize::MAX).min(eligible.len());
        let centers = &eligible[..budget];

        info!(target: "rsa-searchlight",
            "Searchlight pass: radius={} neighborhood={} centers={} of {} eligible, observations={}",
            self.params.radius, self.offsets.len(), centers.len(), eligible.len(),
            volume.n_observations());

        let progress = AtomicUsize::new(0);
        let interval = self.params.progress_interval;
        let total = centers.len();
        let score_center = |&center: &VoxelCoordinate| -> RsaResult<Option<VoxelScore>> {
            if self.cancellation.is_cancelled() {
                return Ok(None);
            }
            let voxel = self.score_voxel(volume, model, center)?;
            if voxel.is_degenerate() {
                trace!(target: "rsa-searchlight",
                    "Degenerate patch at {}: {:?}", center, voxel.score.degeneracy);
            }
            let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(callback) = &self.progress_callback {
                callback(done, total);
            }
            if done % interval == 0 {
                info!(target: "rsa-searchlight",
                    "Searchlight progress: {}/{} voxels ({:.1}%)",
                    done, total, 100.0 * done as f64 / total as f64);
            }
            Ok(Some(voxel))
        };

        #[cfg(feature = "parallel")]
        let scored: Vec<Option<VoxelScore>> = centers
            .par_iter()
            .map(score_center)
            .collect::<RsaResult<_>>()?;
        #[cfg(not(feature = "parallel"))]
        let scored: Vec<Option<VoxelScore>> = centers
            .iter()
            .map(score_center)
            .collect::<RsaResult<_>>()?;

        let mut result = ResultVolume::zeros(shape)?;
        let mut summary = SearchlightSummary {
            radius: self.params.radius,
            neighborhood_size: self.offsets.len(),
            eligible_voxels: eligible.len(),
            ..SearchlightSummary::default()
        };
        for voxel in scored.iter().flatten() {
            result.set(voxel.center, voxel.score.value)?;
            summary.analyzed_voxels += 1;
            if voxel.is_degenerate() {
                summary.degenerate_voxels += 1;
            }
            if voxel.constant_patterns > 0 {
                summary.constant_pattern_voxels += 1;
            }
            if voxel.score.degeneracy == Some(Degeneracy::UndefinedCorrelation) {
                summary.undefined_correlation_voxels += 1;
            }
            if voxel.clipped {
                summary.clipped_patches += 1;
            }
        }
        summary.skipped_voxels = eligible.len() - summary.analyzed_voxels;
        // Only a cancellation leaves a scheduled center unscored
        summary.cancelled = summary.analyzed_voxels < total;
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        if summary.cancelled {
            warn!(target: "rsa-searchlight",
                "Searchlight cancelled after {} of {} voxels", summary.analyzed_voxels, total);
        }
        if summary.degenerate_voxels > 0 {
            info!(target: "rsa-searchlight",
                "{} voxels had degenerate patches ({} constant patterns, {} undefined correlations)",
                summary.degenerate_voxels, summary.constant_pattern_voxels,
                summary.undefined_correlation_voxels);
        }
        if let Some(stats) = result.statistics() {
            debug!(target: "rsa-searchlight",
                "Score statistics: mean={:.4} std={:.4} min={:.4} max={:.4}",
                stats.mean, stats.std, stats.min, stats.max);
        }
        info!(target: "rsa-searchlight",
            "Searchlight complete: analyzed={} skipped={} clipped={} in {} ms",
            summary.analyzed_voxels, summary.skipped_voxels, summary.clipped_patches,
            summary.elapsed_ms);

        Ok(SearchlightOutput { result, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;
    use rsa_compute::build_model_rdm;

    fn two_condition_volume() -> (Volume, Rdm) {
        // Conditions a, a, b, b; voxel-dependent pattern flips sign across conditions
        let data = Array4::from_shape_fn((3, 3, 3, 4), |(x, y, z, t)| {
            let pattern = (x + 2 * y + 3 * z) as f64 - 6.0;
            if t < 2 {
                pattern
            } else {
                -pattern
            }
        });
        (
            Volume::new(data).unwrap(),
            build_model_rdm(&["a", "a", "b", "b"]),
        )
    }

    fn params(radius: u32) -> SearchlightParams {
        SearchlightParams {
            radius,
            ..SearchlightParams::default()
        }
    }

    #[test]
    fn test_rejects_oversized_radius() {
        assert!(matches!(
            SearchlightEngine::new(params(MAX_SEARCHLIGHT_RADIUS + 1)),
            Err(RsaError::InvalidRadius(_))
        ));
        let zero_interval = SearchlightParams {
            progress_interval: 0,
            ..params(1)
        };
        assert!(SearchlightEngine::new(zero_interval).is_err());
    }

    #[test]
    fn test_model_size_checked_before_running() {
        let (volume, _) = two_condition_volume();
        let engine = SearchlightEngine::new(params(1)).unwrap();
        let wrong = build_model_rdm(&["a", "b"]);
        assert_eq!(
            engine.run(&volume, &wrong, None).unwrap_err(),
            RsaError::RdmSizeMismatch { left: 4, right: 2 }
        );
    }

    #[test]
    fn test_mask_restricts_centers() {
        let (volume, model) = two_condition_volume();
        let mask = Mask::from_coordinates(
            (3, 3, 3),
            &[VoxelCoordinate::new(1, 1, 1), VoxelCoordinate::new(0, 2, 1)],
        )
        .unwrap();
        let engine = SearchlightEngine::new(params(1)).unwrap();
        let output = engine.run(&volume, &model, Some(&mask)).unwrap();

        assert_eq!(output.summary.eligible_voxels, 2);
        assert_eq!(output.summary.analyzed_voxels, 2);
        assert_eq!(output.result.analyzed(), &mask);
        assert!(output.result.get(VoxelCoordinate::new(1, 1, 1)).unwrap() > 0.9);
        assert_eq!(output.result.get(VoxelCoordinate::new(0, 0, 0)), Some(0.0));
    }

    #[test]
    fn test_full_grid_ignores_mask() {
        let (volume, model) = two_condition_volume();
        let mask = Mask::from_coordinates((3, 3, 3), &[VoxelCoordinate::new(1, 1, 1)]).unwrap();
        let engine = SearchlightEngine::new(SearchlightParams {
            centers: CenterSelection::FullGrid,
            ..params(1)
        })
        .unwrap();
        let output = engine.run(&volume, &model, Some(&mask)).unwrap();
        assert_eq!(output.summary.analyzed_voxels, 27);
        // Every voxel except the center has at least one face on the boundary
        assert_eq!(output.summary.clipped_patches, 26);
    }

    #[test]
    fn test_mask_shape_mismatch() {
        let (volume, model) = two_condition_volume();
        let mask = Mask::full((3, 3, 2)).unwrap();
        let engine = SearchlightEngine::new(params(1)).unwrap();
        assert!(matches!(
            engine.run(&volume, &model, Some(&mask)),
            Err(RsaError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_voxel_budget_skips_rest() {
        let (volume, model) = two_condition_volume();
        let engine = SearchlightEngine::new(SearchlightParams {
            max_voxels: Some(5),
            ..params(1)
        })
        .unwrap();
        let output = engine.run(&volume, &model, None).unwrap();
        assert_eq!(output.summary.analyzed_voxels, 5);
        assert_eq!(output.summary.skipped_voxels, 22);
        assert_eq!(output.result.analyzed().count(), 5);
        // Row-major order: the first five voxels have x = 0, y = 0..1
        assert!(output.result.analyzed().is_set(VoxelCoordinate::new(0, 1, 1)));
        assert!(!output.result.analyzed().is_set(VoxelCoordinate::new(0, 1, 2)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let (volume, model) = two_condition_volume();
        let token = CancellationToken::new();
        let engine = SearchlightEngine::new(params(1))
            .unwrap()
            .with_cancellation(token.clone());
        token.cancel();
        let output = engine.run(&volume, &model, None).unwrap();
        assert!(output.summary.cancelled);
        assert_eq!(output.summary.analyzed_voxels, 0);
        assert_eq!(output.summary.skipped_voxels, 27);
        assert!(output.result.scores().iter().all(|&s| s == 0.0));
    }

    /// Run `op` on a single worker so voxels are scored one at a time
    #[cfg(feature = "parallel")]
    fn one_at_a_time<T: Send>(op: impl FnOnce() -> T + Send) -> T {
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(op)
    }

    #[cfg(not(feature = "parallel"))]
    fn one_at_a_time<T>(op: impl FnOnce() -> T) -> T {
        op()
    }

    #[test]
    fn test_cancelled_mid_pass_keeps_written_cells() {
        let (volume, model) = two_condition_volume();
        let token = CancellationToken::new();
        let trigger = token.clone();
        let engine = SearchlightEngine::new(params(1))
            .unwrap()
            .with_cancellation(token)
            .with_progress_callback(move |done, _| {
                if done == 10 {
                    trigger.cancel();
                }
            });

        let output = one_at_a_time(|| engine.run(&volume, &model, None)).unwrap();
        let summary = &output.summary;
        assert!(summary.cancelled);
        assert_eq!(summary.analyzed_voxels, 10);
        assert_eq!(summary.skipped_voxels, 17);

        let analyzed = output.result.analyzed();
        assert_eq!(analyzed.count(), 10);
        for ((x, y, z), &score) in output.result.scores().indexed_iter() {
            if analyzed.is_set(VoxelCoordinate::new(x, y, z)) {
                assert!(score.is_finite());
            } else {
                assert_eq!(score, 0.0);
            }
        }
    }

    #[test]
    fn test_cancel_after_last_voxel_is_not_a_cancellation() {
        let (volume, model) = two_condition_volume();
        let token = CancellationToken::new();
        let trigger = token.clone();
        let engine = SearchlightEngine::new(params(1))
            .unwrap()
            .with_cancellation(token.clone())
            .with_progress_callback(move |done, total| {
                if done == total {
                    trigger.cancel();
                }
            });

        let output = engine.run(&volume, &model, None).unwrap();
        assert!(token.is_cancelled());
        assert!(!output.summary.cancelled);
        assert_eq!(output.summary.analyzed_voxels, 27);
        assert_eq!(output.summary.skipped_voxels, 0);
    }

    #[test]
    fn test_radius_zero_is_degenerate_not_fatal() {
        let (volume, model) = two_condition_volume();
        let engine = SearchlightEngine::new(params(0)).unwrap();
        let output = engine.run(&volume, &model, None).unwrap();
        assert_eq!(output.summary.analyzed_voxels, 27);
        assert_eq!(output.summary.degenerate_voxels, 27);
        assert_eq!(output.summary.constant_pattern_voxels, 27);
        assert!(output.result.scores().iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_summary_json() {
        let summary = SearchlightSummary {
            radius: 2,
            neighborhood_size: 33,
            analyzed_voxels: 10,
            ..SearchlightSummary::default()
        };
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"neighborhood_size\": 33"));
        let back: SearchlightSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
