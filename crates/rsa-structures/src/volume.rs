// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Volumetric containers.

A [`Volume`] is a 4-D `(X, Y, Z, T)` array of observations; a [`Mask`] is a 3-D
boolean array over the same spatial grid selecting eligible voxels.
*/

use std::fmt::{Display, Formatter};

use ndarray::{Array3, Array4, ArrayView1, ArrayView4, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{RsaError, RsaResult};

/// Spatial grid shape (X, Y, Z)
pub type SpatialShape = (usize, usize, usize);

/// Position of a single voxel on the spatial grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelCoordinate {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl VoxelCoordinate {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Whether the coordinate lies inside a grid of the given shape
    pub fn is_within(&self, shape: SpatialShape) -> bool {
        self.x < shape.0 && self.y < shape.1 && self.z < shape.2
    }

    pub fn as_index(&self) -> [usize; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<(usize, usize, usize)> for VoxelCoordinate {
    fn from(value: (usize, usize, usize)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl Display for VoxelCoordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

fn check_spatial_shape(shape: SpatialShape) -> RsaResult<()> {
    if shape.0 == 0 || shape.1 == 0 || shape.2 == 0 {
        return Err(RsaError::InvalidDimensions(format!(
            "spatial dimensions must be positive, got {:?}",
            shape
        )));
    }
    Ok(())
}

/// 4-D observation volume `(X, Y, Z, T)`
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: Array4<f64>,
}

impl Volume {
    /// Wrap a 4-D array. All four axes must be non-empty.
    pub fn new(data: Array4<f64>) -> RsaResult<Self> {
        let shape = data.dim();
        check_spatial_shape((shape.0, shape.1, shape.2))?;
        if shape.3 == 0 {
            return Err(RsaError::InvalidDimensions(
                "volume has no observations on its T axis".into(),
            ));
        }
        Ok(Self { data })
    }

    pub fn zeros(spatial_shape: SpatialShape, n_observations: usize) -> RsaResult<Self> {
        let (x, y, z) = spatial_shape;
        Self::new(Array4::zeros((x, y, z, n_observations)))
    }

    pub fn spatial_shape(&self) -> SpatialShape {
        let (x, y, z, _) = self.data.dim();
        (x, y, z)
    }

    pub fn n_observations(&self) -> usize {
        self.data.len_of(Axis(3))
    }

    pub fn data(&self) -> &Array4<f64> {
        &self.data
    }

    pub fn view(&self) -> ArrayView4<'_, f64> {
        self.data.view()
    }

    pub fn into_inner(self) -> Array4<f64> {
        self.data
    }

    pub fn contains(&self, voxel: VoxelCoordinate) -> bool {
        voxel.is_within(self.spatial_shape())
    }

    /// Observation series of a single voxel
    pub fn time_series(&self, voxel: VoxelCoordinate) -> RsaResult<ArrayView1<'_, f64>> {
        if !self.contains(voxel) {
            return Err(RsaError::OutOfBounds {
                voxel,
                shape: self.spatial_shape(),
            });
        }
        Ok(self
            .data
            .index_axis(Axis(0), voxel.x)
            .index_axis_move(Axis(0), voxel.y)
            .index_axis_move(Axis(0), voxel.z))
    }

    /// New volume holding only the given observations, in the given order
    pub fn select_observations(&self, indices: &[usize]) -> RsaResult<Self> {
        let n = self.n_observations();
        if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
            return Err(RsaError::BadParameters(format!(
                "observation index {} out of range for {} observations",
                bad, n
            )));
        }
        Self::new(self.data.select(Axis(3), indices))
    }
}

/// Boolean spatial mask; `true` marks voxels eligible as searchlight centers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    data: Array3<bool>,
}

impl Mask {
    pub fn new(data: Array3<bool>) -> RsaResult<Self> {
        check_spatial_shape(data.dim())?;
        Ok(Self { data })
    }

    /// Mask selecting every voxel of the grid
    pub fn full(shape: SpatialShape) -> RsaResult<Self> {
        Self::new(Array3::from_elem(shape, true))
    }

    /// Mask selecting no voxel of the grid
    pub fn empty(shape: SpatialShape) -> RsaResult<Self> {
        Self::new(Array3::from_elem(shape, false))
    }

    pub fn from_coordinates(shape: SpatialShape, voxels: &[VoxelCoordinate]) -> RsaResult<Self> {
        let mut mask = Self::empty(shape)?;
        for &voxel in voxels {
            mask.set(voxel, true)?;
        }
        Ok(mask)
    }

    pub fn shape(&self) -> SpatialShape {
        self.data.dim()
    }

    pub fn data(&self) -> &Array3<bool> {
        &self.data
    }

    pub fn is_set(&self, voxel: VoxelCoordinate) -> bool {
        self.data.get(voxel.as_index()).copied().unwrap_or(false)
    }

    pub fn set(&mut self, voxel: VoxelCoordinate, value: bool) -> RsaResult<()> {
        let shape = self.shape();
        match self.data.get_mut(voxel.as_index()) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(RsaError::OutOfBounds { voxel, shape }),
        }
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Coordinates of all selected voxels in row-major (x, then y, then z) order
    pub fn coordinates(&self) -> Vec<VoxelCoordinate> {
        self.data
            .indexed_iter()
            .filter(|(_, &v)| v)
            .map(|(idx, _)| VoxelCoordinate::from(idx))
            .collect()
    }

    /// Fails with a shape mismatch unless the mask covers `shape`
    pub fn ensure_shape(&self, shape: SpatialShape) -> RsaResult<()> {
        if self.shape() != shape {
            return Err(RsaError::spatial_mismatch("mask", shape, self.shape()));
        }
        Ok(())
    }

    /// Voxel-wise OR of two masks of identical shape
    pub fn union(&self, other: &Mask) -> RsaResult<Mask> {
        other.ensure_shape(self.shape())?;
        let mut data = self.data.clone();
        data.zip_mut_with(&other.data, |a, &b| *a = *a || b);
        Ok(Mask { data })
    }
}
