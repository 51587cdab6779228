// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Gathering a searchlight patch: the observation series of every in-bounds neighbor.

use ndarray::Array2;

use rsa_structures::{RsaError, RsaResult, Volume, VoxelCoordinate};

use crate::neighborhood::{apply_offset, NeighborhoodOffsets};

/// Neighborhood data around one center voxel
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub center: VoxelCoordinate,
    /// In-bounds neighbors, in offset order
    pub voxels: Vec<VoxelCoordinate>,
    /// One row per neighbor, one column per observation
    pub data: Array2<f64>,
    /// True when part of the sphere fell outside the volume
    pub clipped: bool,
}

impl Patch {
    pub fn n_voxels(&self) -> usize {
        self.voxels.len()
    }
}

/// Extract the patch around `center`. Neighbors outside the volume are dropped.
///
/// # Errors
///
/// - `RsaError::OutOfBounds` if `center` is not inside the volume
/// - `RsaError::EmptyPatch` if no neighbor is in bounds (only possible with an
///   offset set that lacks the origin)
pub fn extract_patch(
    volume: &Volume,
    center: VoxelCoordinate,
    offsets: &NeighborhoodOffsets,
) -> RsaResult<Patch> {
    let shape = volume.spatial_shape();
    if !center.is_within(shape) {
        return Err(RsaError::OutOfBounds {
            voxel: center,
            shape,
        });
    }

    let voxels: Vec<VoxelCoordinate> = offsets
        .iter()
        .filter_map(|&offset| apply_offset(center, offset, shape))
        .collect();
    if voxels.is_empty() {
        return Err(RsaError::EmptyPatch(center));
    }

    let mut data = Array2::zeros((voxels.len(), volume.n_observations()));
    for (mut row, &voxel) in data.rows_mut().into_iter().zip(&voxels) {
        row.assign(&volume.time_series(voxel)?);
    }

    Ok(Patch {
        center,
        clipped: voxels.len() < offsets.len(),
        voxels,
        data,
    })
}
