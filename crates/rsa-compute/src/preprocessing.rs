// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Chunk-wise signal preprocessing.

Every voxel's observation series is split by chunk (recording session). Within
each chunk the series is linearly detrended (least-squares line subtracted) and
then standardized to zero mean and unit variance. Chunks never interact, so the
order in which they are processed has no effect on the result.

Zero-variance series (voxels that are flat within a chunk, e.g. outside the
head) make the standardization divide by zero. Those values are replaced by
zero in an explicit pass after standardization and counted.
*/

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{ArrayViewMut1, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rsa_structures::{RsaError, RsaResult, Volume};

/// Relative tolerance under which a standard deviation counts as zero.
/// Scaled by the largest magnitude in the raw chunk series.
const ZERO_VARIANCE_RTOL: f64 = 1e-10;

/// Which preprocessing steps to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessingOptions {
    pub detrend: bool,
    pub standardize: bool,
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            detrend: true,
            standardize: true,
        }
    }
}

/// Output of [`SignalPreprocessor::preprocess`]
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// New volume of the same shape as the input
    pub volume: Volume,
    /// Number of (voxel, chunk) series whose values were zeroed for lack of variance
    pub zero_variance_series: usize,
    /// Number of distinct chunks processed
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SignalPreprocessor {
    options: PreprocessingOptions,
}

impl SignalPreprocessor {
    pub fn new(options: PreprocessingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> PreprocessingOptions {
        self.options
    }

    /// Detrend and standardize `volume` independently per chunk.
    ///
    /// `chunks` assigns each observation to a chunk; `None` treats the whole
    /// series as a single chunk. The input volume is never modified.
    ///
    /// # Errors
    ///
    /// Returns `RsaError::LabelCountMismatch` if `chunks` does not have one entry
    /// per observation.
    pub fn preprocess(&self, volume: &Volume, chunks: Option<&[i64]>) -> RsaResult<Preprocessed> {
        let n_observations = volume.n_observations();
        let groups = match chunks {
            Some(chunks) => {
                if chunks.len() != n_observations {
                    return Err(RsaError::LabelCountMismatch {
                        observations: n_observations,
                        labels: chunks.len(),
                    });
                }
                group_by_chunk(chunks)
            }
            None => vec![(0, (0..n_observations).collect())],
        };

        debug!(target: "rsa-compute",
            "Preprocessing {} observations in {} chunk(s) (detrend={}, standardize={})",
            n_observations, groups.len(), self.options.detrend, self.options.standardize);

        let options = self.options;
        let zero_variance = AtomicUsize::new(0);
        let mut data = volume.data().clone();

        Zip::from(data.lanes_mut(Axis(3))).par_for_each(|mut lane| {
            let mut buffer = Vec::new();
            for (_, indices) in &groups {
                buffer.clear();
                buffer.extend(indices.iter().map(|&i| lane[i]));
                if preprocess_series(&mut buffer, options) {
                    zero_variance.fetch_add(1, Ordering::Relaxed);
                }
                scatter(&mut lane, indices, &buffer);
            }
        });

        let zero_variance_series = zero_variance.into_inner();
        if zero_variance_series > 0 {
            info!(target: "rsa-compute",
                "{} voxel series had zero variance within a chunk and were set to zero",
                zero_variance_series);
        }

        Ok(Preprocessed {
            volume: Volume::new(data)?,
            zero_variance_series,
            chunk_count: groups.len(),
        })
    }
}

/// Observation indices of every chunk, ordered by chunk value
fn group_by_chunk(chunks: &[i64]) -> Vec<(i64, Vec<usize>)> {
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &chunk) in chunks.iter().enumerate() {
        groups.entry(chunk).or_default().push(i);
    }
    groups.into_iter().collect()
}

fn scatter(lane: &mut ArrayViewMut1<'_, f64>, indices: &[usize], values: &[f64]) {
    for (&i, &v) in indices.iter().zip(values) {
        lane[i] = v;
    }
}

/// Preprocess one chunk series in place. Returns true if it had zero variance.
pub fn preprocess_series(values: &mut [f64], options: PreprocessingOptions) -> bool {
    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if options.detrend {
        detrend_linear(values);
    }
    if options.standardize {
        standardize(values, scale);
        return zero_non_finite(values) > 0;
    }
    false
}

/// Subtract the least-squares line fitted against the sample index
pub fn detrend_linear(values: &mut [f64]) {
    let n = values.len();
    if n == 0 {
        return;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n == 1 {
        values[0] -= mean;
        return;
    }
    let t_mean = (n - 1) as f64 / 2.0;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (t, &v) in values.iter().enumerate() {
        let dt = t as f64 - t_mean;
        sxx += dt * dt;
        sxy += dt * (v - mean);
    }
    let slope = sxy / sxx;
    for (t, v) in values.iter_mut().enumerate() {
        *v -= mean + slope * (t as f64 - t_mean);
    }
}

/// Z-score with population standard deviation.
///
/// A standard deviation at or below `ZERO_VARIANCE_RTOL * scale` is treated as
/// exactly zero, so the division yields NaN or infinity; see [`zero_non_finite`].
fn standardize(values: &mut [f64], scale: f64) {
    let n = values.len();
    if n == 0 {
        return;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let mut std = var.sqrt();
    if std <= ZERO_VARIANCE_RTOL * scale {
        std = 0.0;
    }
    for v in values.iter_mut() {
        *v = (*v - mean) / std;
    }
}

/// Replace NaN and infinite values with zero, returning how many were replaced
pub fn zero_non_finite(values: &mut [f64]) -> usize {
    let mut replaced = 0;
    for v in values.iter_mut() {
        if !v.is_finite() {
            *v = 0.0;
            replaced += 1;
        }
    }
    replaced
}
