// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Grand-mean of per-subject score maps.

use ndarray::{Array3, Zip};
use tracing::debug;

use rsa_structures::{ResultVolume, RsaError, RsaResult};

/// Elementwise arithmetic mean of same-shape result volumes
///
/// The analysed mask of the mean is the union of the inputs' masks, and the
/// affine of the first input is carried through. No weighting, no outlier
/// rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupAggregator;

impl GroupAggregator {
    pub fn new() -> Self {
        Self
    }

    /// # Errors
    ///
    /// - `RsaError::EmptyGroup` if `volumes` is empty
    /// - `RsaError::ShapeMismatch` if any volume differs in shape from the first
    pub fn aggregate<'a, I>(&self, volumes: I) -> RsaResult<ResultVolume>
    where
        I: IntoIterator<Item = &'a ResultVolume>,
    {
        let mut volumes = volumes.into_iter();
        let first = volumes.next().ok_or(RsaError::EmptyGroup)?;
        let shape = first.shape();

        let mut sum: Array3<f64> = first.scores().clone();
        let mut analyzed = first.analyzed().clone();
        let mut count = 1usize;

        for volume in volumes {
            if volume.shape() != shape {
                return Err(RsaError::spatial_mismatch(
                    "group result volume",
                    shape,
                    volume.shape(),
                ));
            }
            accumulate(&mut sum, volume.scores());
            analyzed = analyzed.union(volume.analyzed())?;
            count += 1;
        }

        let n = count as f64;
        sum.mapv_inplace(|s| s / n);

        debug!(target: "rsa-searchlight",
            "Averaged {} result volumes of shape {:?} ({} voxels analysed by any subject)",
            count, shape, analyzed.count());

        ResultVolume::new(sum, analyzed, first.affine().copied())
    }
}

#[cfg(feature = "parallel")]
fn accumulate(sum: &mut Array3<f64>, scores: &Array3<f64>) {
    Zip::from(sum).and(scores).par_for_each(|s, &x| *s += x);
}

#[cfg(not(feature = "parallel"))]
fn accumulate(sum: &mut Array3<f64>, scores: &Array3<f64>) {
    Zip::from(sum).and(scores).for_each(|s, &x| *s += x);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa_structures::{Affine, Mask, VoxelCoordinate};

    fn volume(values: [f64; 8], analyzed: &[VoxelCoordinate]) -> ResultVolume {
        let scores = Array3::from_shape_vec((2, 2, 2), values.to_vec()).unwrap();
        let mask = Mask::from_coordinates((2, 2, 2), analyzed).unwrap();
        ResultVolume::new(scores, mask, None).unwrap()
    }

    #[test]
    fn test_single_volume_is_identity() {
        let v = volume([0.1, -0.2, 0.3, 0.4, 0.5, 0.6, -0.7, 0.8], &[VoxelCoordinate::new(0, 0, 0)]);
        assert_eq!(GroupAggregator::new().aggregate([&v]).unwrap(), v);
    }

    #[test]
    fn test_duplicate_volumes_average_to_themselves() {
        let v = volume([0.1, -0.2, 0.3, 0.4, 0.5, 0.6, -0.7, 0.8], &[]);
        let mean = GroupAggregator::new().aggregate([&v, &v]).unwrap();
        assert_eq!(mean.scores(), v.scores());
    }

    #[test]
    fn test_mean_and_mask_union() {
        let a = volume([1.0; 8], &[VoxelCoordinate::new(0, 0, 0)]);
        let b = volume([0.0, 2.0, 0.0, 2.0, 0.0, 2.0, 0.0, 2.0], &[VoxelCoordinate::new(1, 1, 1)])
            .with_affine(Some(Affine::identity()));
        let mean = GroupAggregator::new().aggregate(vec![&a, &b]).unwrap();

        assert_eq!(mean.get(VoxelCoordinate::new(0, 0, 0)), Some(0.5));
        assert_eq!(mean.get(VoxelCoordinate::new(0, 0, 1)), Some(1.5));
        assert_eq!(mean.analyzed().count(), 2);
        // Affine comes from the first volume
        assert_eq!(mean.affine(), None);
    }

    #[test]
    fn test_empty_group() {
        let none: Vec<&ResultVolume> = Vec::new();
        assert_eq!(
            GroupAggregator::new().aggregate(none).unwrap_err(),
            RsaError::EmptyGroup
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let a = volume([0.0; 8], &[]);
        let b = ResultVolume::zeros((2, 2, 3)).unwrap();
        assert!(matches!(
            GroupAggregator::new().aggregate([&a, &b]),
            Err(RsaError::ShapeMismatch { .. })
        ));
    }
}
