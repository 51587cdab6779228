// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-voxel score maps produced by a searchlight pass

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{RsaError, RsaResult};
use crate::volume::{Mask, SpatialShape, VoxelCoordinate};

/// Voxel-to-world transform of the source image.
///
/// Never interpreted here; only passed through for writers and plotters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine(pub [[f64; 4]; 4]);

impl Affine {
    pub fn identity() -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Affine(m)
    }
}

/// Summary statistics of the scores inside the analysed mask
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreStatistics {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// 3-D score map with the mask of voxels that actually received a score
#[derive(Debug, Clone, PartialEq)]
pub struct ResultVolume {
    scores: Array3<f64>,
    analyzed: Mask,
    affine: Option<Affine>,
}

impl ResultVolume {
    /// All-zero map with nothing analysed yet
    pub fn zeros(shape: SpatialShape) -> RsaResult<Self> {
        Ok(Self {
            scores: Array3::zeros(shape),
            analyzed: Mask::empty(shape)?,
            affine: None,
        })
    }

    pub fn new(scores: Array3<f64>, analyzed: Mask, affine: Option<Affine>) -> RsaResult<Self> {
        analyzed.ensure_shape(scores.dim())?;
        Ok(Self {
            scores,
            analyzed,
            affine,
        })
    }

    pub fn with_affine(mut self, affine: Option<Affine>) -> Self {
        self.affine = affine;
        self
    }

    pub fn shape(&self) -> SpatialShape {
        self.scores.dim()
    }

    pub fn scores(&self) -> &Array3<f64> {
        &self.scores
    }

    pub fn analyzed(&self) -> &Mask {
        &self.analyzed
    }

    pub fn affine(&self) -> Option<&Affine> {
        self.affine.as_ref()
    }

    pub fn into_parts(self) -> (Array3<f64>, Mask, Option<Affine>) {
        (self.scores, self.analyzed, self.affine)
    }

    pub fn get(&self, voxel: VoxelCoordinate) -> Option<f64> {
        self.scores.get(voxel.as_index()).copied()
    }

    /// Write the score of one voxel and mark it analysed
    pub fn set(&mut self, voxel: VoxelCoordinate, score: f64) -> RsaResult<()> {
        let shape = self.shape();
        let cell = self
            .scores
            .get_mut(voxel.as_index())
            .ok_or(RsaError::OutOfBounds { voxel, shape })?;
        *cell = score;
        self.analyzed.set(voxel, true)
    }

    /// Statistics over analysed voxels, `None` when nothing was analysed
    pub fn statistics(&self) -> Option<ScoreStatistics> {
        let values: Vec<f64> = self
            .scores
            .iter()
            .zip(self.analyzed.data().iter())
            .filter(|(_, &analyzed)| analyzed)
            .map(|(&score, _)| score)
            .collect();
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(ScoreStatistics {
            count,
            mean,
            std: var.sqrt(),
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_marks_analyzed() {
        let mut result = ResultVolume::zeros((3, 3, 3)).unwrap();
        result.set(VoxelCoordinate::new(1, 2, 0), 0.5).unwrap();
        assert_eq!(result.get(VoxelCoordinate::new(1, 2, 0)), Some(0.5));
        assert!(result.analyzed().is_set(VoxelCoordinate::new(1, 2, 0)));
        assert_eq!(result.analyzed().count(), 1);
    }

    #[test]
    fn test_set_out_of_bounds() {
        let mut result = ResultVolume::zeros((2, 2, 2)).unwrap();
        assert!(result.set(VoxelCoordinate::new(2, 0, 0), 1.0).is_err());
    }

    #[test]
    fn test_statistics_only_over_analyzed() {
        let mut result = ResultVolume::zeros((2, 2, 2)).unwrap();
        assert!(result.statistics().is_none());
        result.set(VoxelCoordinate::new(0, 0, 0), 0.2).unwrap();
        result.set(VoxelCoordinate::new(1, 1, 1), 0.6).unwrap();
        let stats = result.statistics().unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 0.4).abs() < 1e-12);
        assert!((stats.std - 0.2).abs() < 1e-12);
        assert_eq!(stats.min, 0.2);
        assert_eq!(stats.max, 0.6);
    }

    #[test]
    fn test_new_checks_mask_shape() {
        let mask = Mask::full((2, 2, 2)).unwrap();
        assert!(ResultVolume::new(Array3::zeros((2, 2, 3)), mask, None).is_err());
    }
}
