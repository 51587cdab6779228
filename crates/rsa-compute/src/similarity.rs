// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
RDM-to-RDM similarity via Spearman rank correlation.

Ties receive the average of the ranks they span. When either side has no rank
variation the correlation is undefined; the score is then 0 and flagged with
[`Degeneracy::UndefinedCorrelation`] so callers can count it.
*/

use serde::{Deserialize, Serialize};

use rsa_structures::{RsaError, RsaResult};

use crate::rdm::Rdm;

/// Recoverable numerical degeneracy encountered while scoring a voxel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Degeneracy {
    /// Some observation pattern in the patch was constant; its distances were set to 1
    ConstantPattern,
    /// The rank correlation itself was undefined; the score was set to 0
    UndefinedCorrelation,
}

/// Similarity of two RDMs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RdmScore {
    /// Spearman correlation in `[-1, 1]`
    pub value: f64,
    pub degeneracy: Option<Degeneracy>,
}

/// Which RDM entries enter the correlation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RdmComparison {
    /// Upper triangle without the diagonal
    #[default]
    UpperTriangle,
    /// Every entry, diagonal included
    FullMatrix,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer {
    comparison: RdmComparison,
}

impl SimilarityScorer {
    pub fn new(comparison: RdmComparison) -> Self {
        Self { comparison }
    }

    pub fn comparison(&self) -> RdmComparison {
        self.comparison
    }

    /// Spearman correlation between two RDMs of the same size
    ///
    /// # Errors
    ///
    /// Returns `RsaError::RdmSizeMismatch` if the RDMs compare different numbers of observations.
    pub fn score(&self, a: &Rdm, b: &Rdm) -> RsaResult<RdmScore> {
        if a.size() != b.size() {
            return Err(RsaError::RdmSizeMismatch {
                left: a.size(),
                right: b.size(),
            });
        }
        let (xs, ys) = match self.comparison {
            RdmComparison::UpperTriangle => (a.condensed(), b.condensed()),
            RdmComparison::FullMatrix => (a.flattened(), b.flattened()),
        };
        Ok(match spearman(&xs, &ys) {
            Some(value) => RdmScore {
                value,
                degeneracy: None,
            },
            None => RdmScore {
                value: 0.0,
                degeneracy: Some(Degeneracy::UndefinedCorrelation),
            },
        })
    }
}

/// Spearman rank correlation, `None` when undefined (fewer than two values or no rank spread)
pub fn spearman(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    pearson(&average_ranks(xs), &average_ranks(ys))
}

/// Pearson correlation, `None` when either input has zero variance
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n != ys.len() || n < 2 {
        return None;
    }
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// 1-based ranks, ties sharing the mean of their positions
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end (0-based) share rank mean(start+1 ..= end)
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}
