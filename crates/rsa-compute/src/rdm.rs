// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Representational dissimilarity matrices.

- [`build_data_rdm`]: correlation distance `1 - pearson(i, j)` between the
  activity patterns of every pair of observations in a searchlight patch.
- [`build_model_rdm`]: categorical model, 0 for same condition and 1 otherwise.

An observation whose pattern has no spread across the patch (a single-voxel
patch, or all voxels equal) has an undefined correlation with every other
observation. Its distances are set to 1, the value of uncorrelated patterns,
instead of NaN.
*/

use ndarray::{Array2, ArrayView2, Axis};

use rsa_structures::{RsaError, RsaResult};

/// Relative tolerance on a centered pattern's norm below which the pattern is
/// considered constant
const CONSTANT_PATTERN_RTOL: f64 = 1e-10;

/// Distance assigned to pairs whose correlation is undefined
pub const UNDEFINED_DISTANCE: f64 = 1.0;

/// Square, symmetric, zero-diagonal dissimilarity matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Rdm {
    matrix: Array2<f64>,
}

impl Rdm {
    /// Wrap a full matrix after checking it is square, symmetric and zero on the diagonal
    pub fn from_matrix(matrix: Array2<f64>) -> RsaResult<Self> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(RsaError::ShapeMismatch {
                what: "RDM".into(),
                expected: vec![rows, rows],
                actual: vec![rows, cols],
            });
        }
        for i in 0..rows {
            if matrix[[i, i]] != 0.0 {
                return Err(RsaError::BadParameters(format!(
                    "RDM diagonal entry ({}, {}) is {}, expected 0",
                    i, i, matrix[[i, i]]
                )));
            }
            for j in (i + 1)..rows {
                if matrix[[i, j]] != matrix[[j, i]] {
                    return Err(RsaError::BadParameters(format!(
                        "RDM is not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }
        Ok(Self { matrix })
    }

    /// Expand a condensed upper triangle (row-major, `i < j`) into a full RDM
    pub fn from_condensed(n: usize, condensed: &[f64]) -> RsaResult<Self> {
        let expected = n * n.saturating_sub(1) / 2;
        if condensed.len() != expected {
            return Err(RsaError::ShapeMismatch {
                what: "condensed RDM".into(),
                expected: vec![expected],
                actual: vec![condensed.len()],
            });
        }
        let mut matrix = Array2::zeros((n, n));
        let mut k = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                matrix[[i, j]] = condensed[k];
                matrix[[j, i]] = condensed[k];
                k += 1;
            }
        }
        Ok(Self { matrix })
    }

    /// Number of observations compared
    pub fn size(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[[i, j]]
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Upper triangle without the diagonal, row-major
    pub fn condensed(&self) -> Vec<f64> {
        let n = self.size();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                out.push(self.matrix[[i, j]]);
            }
        }
        out
    }

    /// All entries, row-major, diagonal included
    pub fn flattened(&self) -> Vec<f64> {
        self.matrix.iter().copied().collect()
    }

    /// RDM of the same observations listed in `order`
    pub fn permuted(&self, order: &[usize]) -> RsaResult<Self> {
        let n = self.size();
        let mut seen = vec![false; n];
        for &i in order {
            if i >= n || std::mem::replace(&mut seen[i], true) {
                return Err(RsaError::BadParameters(format!(
                    "{:?} is not a permutation of 0..{}",
                    order, n
                )));
            }
        }
        if order.len() != n {
            return Err(RsaError::BadParameters(format!(
                "permutation has {} entries, RDM has {}",
                order.len(),
                n
            )));
        }
        let matrix = Array2::from_shape_fn((n, n), |(i, j)| self.matrix[[order[i], order[j]]]);
        Ok(Self { matrix })
    }
}

/// Data RDM plus a count of observations whose pattern was constant
#[derive(Debug, Clone, PartialEq)]
pub struct DataRdm {
    pub rdm: Rdm,
    pub constant_patterns: usize,
}

impl DataRdm {
    pub fn is_degenerate(&self) -> bool {
        self.constant_patterns > 0
    }
}

/// Correlation-distance RDM of a searchlight patch.
///
/// `patch` has one row per voxel and one column per observation; observation
/// `t`'s pattern is column `t`.
///
/// # Errors
///
/// Returns `RsaError::InvalidDimensions` if the patch has no voxels or no observations.
pub fn build_data_rdm(patch: ArrayView2<'_, f64>) -> RsaResult<DataRdm> {
    let (n_voxels, n_obs) = patch.dim();
    if n_voxels == 0 || n_obs == 0 {
        return Err(RsaError::InvalidDimensions(format!(
            "patch of shape ({}, {}) cannot form an RDM",
            n_voxels, n_obs
        )));
    }

    // Row t holds observation t's pattern, centered and scaled to unit norm
    let mut normalized = Array2::<f64>::zeros((n_obs, n_voxels));
    let mut defined = vec![false; n_obs];
    for (t, pattern) in patch.axis_iter(Axis(1)).enumerate() {
        let mean = pattern.sum() / n_voxels as f64;
        let scale = pattern.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let mut row = normalized.row_mut(t);
        row.assign(&pattern);
        row.mapv_inplace(|v| v - mean);
        let norm = row.dot(&row).sqrt();
        if norm.is_finite() && norm > CONSTANT_PATTERN_RTOL * scale * (n_voxels as f64).sqrt() {
            row.mapv_inplace(|v| v / norm);
            defined[t] = true;
        }
    }

    let mut matrix = Array2::<f64>::zeros((n_obs, n_obs));
    for i in 0..n_obs {
        for j in (i + 1)..n_obs {
            let distance = if defined[i] && defined[j] {
                let r = normalized.row(i).dot(&normalized.row(j));
                (1.0 - r).clamp(0.0, 2.0)
            } else {
                UNDEFINED_DISTANCE
            };
            matrix[[i, j]] = distance;
            matrix[[j, i]] = distance;
        }
    }

    Ok(DataRdm {
        rdm: Rdm { matrix },
        constant_patterns: defined.iter().filter(|&&d| !d).count(),
    })
}

/// Categorical model RDM: 0 where two observations share a condition, 1 otherwise
pub fn build_model_rdm<S: AsRef<str>>(conditions: &[S]) -> Rdm {
    let n = conditions.len();
    let matrix = Array2::from_shape_fn((n, n), |(i, j)| {
        if conditions[i].as_ref() == conditions[j].as_ref() {
            0.0
        } else {
            1.0
        }
    });
    Rdm { matrix }
}
