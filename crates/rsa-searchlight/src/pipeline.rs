// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Per-subject and group orchestration.

[`SubjectPipeline::run`] takes one subject's dataset from raw series to score
map:

1. check the mask against the volume
2. drop excluded conditions (volume and labels in lock-step)
3. detrend and standardize per chunk over the remaining observations
4. optionally sort observations by condition
5. build the categorical model RDM
6. run the searchlight

[`GroupPipeline::aggregate`] averages finished subjects.
*/

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rsa_compute::{build_model_rdm, PreprocessingOptions, SignalPreprocessor};
use rsa_config::{validate_config, RsaConfig};
use rsa_structures::{Dataset, Mask, ResultVolume, RsaError, RsaResult, ScoreStatistics};

use crate::engine::{CancellationToken, SearchlightEngine, SearchlightParams, SearchlightSummary};
use crate::group::GroupAggregator;
use crate::neighborhood::NeighborhoodBuilder;

/// Score map of one subject plus run counters
#[derive(Debug, Clone)]
pub struct SubjectResult {
    pub result: ResultVolume,
    pub summary: SearchlightSummary,
    /// Observations left after condition exclusion
    pub observations: usize,
    /// Distinct conditions among those observations
    pub conditions: usize,
    /// (voxel, chunk) series zeroed for lack of variance during preprocessing
    pub zero_variance_series: usize,
}

pub struct SubjectPipeline {
    config: RsaConfig,
    neighborhoods: NeighborhoodBuilder,
    cancellation: CancellationToken,
}

impl SubjectPipeline {
    /// # Errors
    ///
    /// Returns `RsaError::BadParameters` carrying every validation failure of `config`.
    pub fn new(config: RsaConfig) -> RsaResult<Self> {
        validate_config(&config).map_err(|e| RsaError::BadParameters(e.to_string()))?;
        Ok(Self {
            config,
            neighborhoods: NeighborhoodBuilder::new(),
            cancellation: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn config(&self) -> &RsaConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Run one subject. The affine of `dataset`, if any, is carried to the result.
    pub fn run(&self, dataset: &Dataset, mask: Option<&Mask>) -> RsaResult<SubjectResult> {
        self.in_thread_pool(|| self.run_subject(dataset, mask))
    }

    fn run_subject(&self, dataset: &Dataset, mask: Option<&Mask>) -> RsaResult<SubjectResult> {
        let started = Instant::now();
        let spatial_shape = dataset.volume().spatial_shape();
        if let Some(mask) = mask {
            mask.ensure_shape(spatial_shape)?;
        }

        // Engine first so parameter errors surface before any computation
        let engine = SearchlightEngine::with_neighborhoods(
            SearchlightParams::from(&self.config.searchlight),
            &self.neighborhoods,
        )?
        .with_cancellation(self.cancellation.clone());

        let retained = dataset.exclude_conditions(&self.config.labels.exclude_conditions)?;

        let preprocessing = &self.config.preprocessing;
        let preprocessor = SignalPreprocessor::new(PreprocessingOptions {
            detrend: preprocessing.detrend,
            standardize: preprocessing.standardize,
        });
        let chunks = retained.labels().chunks();
        let preprocessed = preprocessor.preprocess(
            retained.volume(),
            preprocessing.per_chunk.then_some(chunks.as_slice()),
        )?;
        let zero_variance_series = preprocessed.zero_variance_series;

        let mut analysed = retained.with_volume(preprocessed.volume)?;
        if self.config.labels.sort_by_condition {
            analysed = analysed.sort_by_condition()?;
        }

        let conditions = analysed.labels().conditions();
        let n_conditions = analysed.labels().unique_conditions().len();
        if n_conditions < 2 {
            warn!(target: "rsa-searchlight",
                "Only {} condition left after exclusion; every score will be undefined",
                n_conditions);
        }
        info!(target: "rsa-searchlight",
            "Subject dataset: {} of {} observations kept, {} conditions, {} chunk(s)",
            analysed.n_observations(), dataset.n_observations(), n_conditions,
            preprocessed.chunk_count);

        let model = build_model_rdm(&conditions);
        let output = engine.run(analysed.volume(), &model, mask)?;

        info!(target: "rsa-searchlight",
            "Subject finished in {:.2}s", started.elapsed().as_secs_f64());

        Ok(SubjectResult {
            result: output.result.with_affine(dataset.affine().copied()),
            summary: output.summary,
            observations: analysed.n_observations(),
            conditions: n_conditions,
            zero_variance_series,
        })
    }

    #[cfg(feature = "parallel")]
    fn in_thread_pool<T, F>(&self, op: F) -> RsaResult<T>
    where
        T: Send,
        F: FnOnce() -> RsaResult<T> + Send,
    {
        let threads = self.config.system.max_threads;
        if threads == 0 {
            return op();
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| RsaError::BadParameters(format!("Failed to build thread pool: {}", e)))?;
        pool.install(op)
    }

    #[cfg(not(feature = "parallel"))]
    fn in_thread_pool<T, F>(&self, op: F) -> RsaResult<T>
    where
        F: FnOnce() -> RsaResult<T>,
    {
        op()
    }
}

/// Grand mean of several subjects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub subjects: usize,
    /// Voxels analysed by at least one subject
    pub analyzed_voxels: usize,
    pub degenerate_voxels: usize,
    pub statistics: Option<ScoreStatistics>,
}

#[derive(Debug, Clone)]
pub struct GroupResult {
    pub result: ResultVolume,
    pub summary: GroupSummary,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GroupPipeline {
    aggregator: GroupAggregator,
}

impl GroupPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average the subjects' score maps and union their analysed masks
    pub fn aggregate<'a, I>(&self, subjects: I) -> RsaResult<GroupResult>
    where
        I: IntoIterator<Item = &'a SubjectResult>,
    {
        let subjects: Vec<&SubjectResult> = subjects.into_iter().collect();
        let result = self
            .aggregator
            .aggregate(subjects.iter().map(|s| &s.result))?;

        let summary = GroupSummary {
            subjects: subjects.len(),
            analyzed_voxels: result.analyzed().count(),
            degenerate_voxels: subjects.iter().map(|s| s.summary.degenerate_voxels).sum(),
            statistics: result.statistics(),
        };
        info!(target: "rsa-searchlight",
            "Group mean over {} subjects: {} voxels, mean score {:.4}",
            summary.subjects, summary.analyzed_voxels,
            summary.statistics.map(|s| s.mean).unwrap_or(0.0));

        Ok(GroupResult { result, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;
    use rsa_structures::{Affine, Labels, Volume, VoxelCoordinate};

    /// Six observations: rest, a, b, a, b, rest in one chunk, with a signal
    /// that separates a from b
    fn dataset() -> Dataset {
        let conditions = ["rest", "a", "b", "a", "b", "rest"];
        let data = Array4::from_shape_fn((3, 3, 3, 6), |(x, y, z, t)| {
            let pattern = ((x * 7 + y * 3 + z * 5) % 4) as f64 - 1.5;
            match conditions[t] {
                "a" => pattern,
                "b" => -pattern,
                _ => 0.25 * t as f64,
            }
        });
        let labels = Labels::from_pairs(conditions.iter().map(|&c| (c, 1)));
        Dataset::new(Volume::new(data).unwrap(), labels)
            .unwrap()
            .with_affine(Affine::identity())
    }

    fn config(radius: u32) -> RsaConfig {
        let mut config = RsaConfig::default();
        config.searchlight.radius = radius;
        config
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut bad = config(0);
        bad.group.subjects = vec![1, 1];
        let err = SubjectPipeline::new(bad).err().unwrap();
        let message = err.to_string();
        assert!(message.contains("radius"));
        assert!(message.contains("Subject 1"));
    }

    #[test]
    fn test_run_excludes_rest_and_carries_affine() {
        let pipeline = SubjectPipeline::new(config(1)).unwrap();
        let subject = pipeline.run(&dataset(), None).unwrap();

        assert_eq!(subject.observations, 4);
        assert_eq!(subject.conditions, 2);
        assert_eq!(subject.summary.analyzed_voxels, 27);
        assert_eq!(subject.result.affine(), Some(&Affine::identity()));
        assert!(subject.result.scores().iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_mask_shape_checked_first() {
        let pipeline = SubjectPipeline::new(config(1)).unwrap();
        let mask = Mask::full((2, 2, 2)).unwrap();
        assert!(matches!(
            pipeline.run(&dataset(), Some(&mask)),
            Err(RsaError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_dedicated_thread_pool() {
        let mut cfg = config(1);
        cfg.system.max_threads = 2;
        let pipeline = SubjectPipeline::new(cfg).unwrap();
        let mask = Mask::from_coordinates((3, 3, 3), &[VoxelCoordinate::new(1, 1, 1)]).unwrap();
        let subject = pipeline.run(&dataset(), Some(&mask)).unwrap();
        assert_eq!(subject.summary.analyzed_voxels, 1);
    }

    #[test]
    fn test_scores_independent_of_thread_count() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use rsa_config::CenterSelection;

        let conditions = ["a", "b", "c", "a", "b", "c", "a", "b", "c", "a"];
        let mut rng = StdRng::seed_from_u64(11);
        let data = Array4::from_shape_fn((6, 5, 4, 10), |_| rng.gen_range(-1.0..1.0));
        let labels = Labels::from_pairs(
            conditions.iter().enumerate().map(|(t, &c)| (c, (t / 5) as i64)),
        );
        let dataset = Dataset::new(Volume::new(data).unwrap(), labels).unwrap();

        let mut pooled = config(2);
        pooled.searchlight.centers = CenterSelection::FullGrid;
        let mut single = pooled.clone();
        single.system.max_threads = 1;

        let a = SubjectPipeline::new(pooled).unwrap().run(&dataset, None).unwrap();
        let b = SubjectPipeline::new(single).unwrap().run(&dataset, None).unwrap();

        assert_eq!(a.summary.analyzed_voxels, 120);
        assert_eq!(a.result.analyzed(), b.result.analyzed());
        assert_eq!(a.result.scores(), b.result.scores());
        assert_eq!(a.summary.degenerate_voxels, b.summary.degenerate_voxels);
    }

    #[test]
    fn test_group_aggregate() {
        let pipeline = SubjectPipeline::new(config(1)).unwrap();
        let first = pipeline.run(&dataset(), None).unwrap();
        let second = pipeline.run(&dataset(), None).unwrap();

        let group = GroupPipeline::new().aggregate([&first, &second]).unwrap();
        assert_eq!(group.summary.subjects, 2);
        assert_eq!(group.summary.analyzed_voxels, 27);
        assert_eq!(group.result.scores(), first.result.scores());
        assert_eq!(group.result.affine(), Some(&Affine::identity()));
    }
}
