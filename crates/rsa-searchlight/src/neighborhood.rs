// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Spherical searchlight neighborhoods.

A neighborhood is the set of integer offsets within Euclidean distance
`radius` of the origin, boundary included. Offsets depend on the radius only,
so [`NeighborhoodBuilder`] computes each radius once and shares the result.
*/

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use rsa_structures::{SpatialShape, VoxelCoordinate};

/// Relative slack on the radius so points exactly on the sphere are kept
const BOUNDARY_EPSILON: f64 = 1e-10;

/// Position relative to a center voxel
pub type VoxelOffset = (i32, i32, i32);

/// Offsets of a sphere centered at the origin, in lexicographic order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborhoodOffsets {
    radius: u32,
    offsets: Vec<VoxelOffset>,
}

impl NeighborhoodOffsets {
    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn offsets(&self) -> &[VoxelOffset] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn contains(&self, offset: VoxelOffset) -> bool {
        self.offsets.binary_search(&offset).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoxelOffset> {
        self.offsets.iter()
    }
}

/// All offsets `(dx, dy, dz)` with `sqrt(dx² + dy² + dz²) <= radius`.
///
/// `radius = 0` yields only the origin.
pub fn sphere_offsets(radius: u32) -> NeighborhoodOffsets {
    let r = radius as i32;
    let limit = radius as f64 * (1.0 + BOUNDARY_EPSILON);

    // Nested ascending loops already produce lexicographic order
    let mut offsets = Vec::new();
    for dx in -r..=r {
        for dy in -r..=r {
            for dz in -r..=r {
                let distance = ((dx * dx + dy * dy + dz * dz) as f64).sqrt();
                if distance <= limit {
                    offsets.push((dx, dy, dz));
                }
            }
        }
    }

    NeighborhoodOffsets { radius, offsets }
}

/// Memoizing source of [`NeighborhoodOffsets`], safe to share across threads
#[derive(Debug, Default)]
pub struct NeighborhoodBuilder {
    cache: Mutex<HashMap<u32, Arc<NeighborhoodOffsets>>>,
}

impl NeighborhoodBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offsets for `radius`, computed on first request
    pub fn build(&self, radius: u32) -> Arc<NeighborhoodOffsets> {
        let mut cache = self.cache.lock();
        Arc::clone(cache.entry(radius).or_insert_with(|| {
            let offsets = sphere_offsets(radius);
            debug!(target: "rsa-searchlight",
                "Built searchlight neighborhood: radius={} offsets={}", radius, offsets.len());
            Arc::new(offsets)
        }))
    }

    /// Number of radii computed so far
    pub fn cached_radii(&self) -> usize {
        self.cache.lock().len()
    }
}

/// Apply an offset to a center voxel.
///
/// Returns `None` if the result falls outside `shape`; there is no wraparound
/// and no clamping.
pub fn apply_offset(
    center: VoxelCoordinate,
    offset: VoxelOffset,
    shape: SpatialShape,
) -> Option<VoxelCoordinate> {
    let shift = |position: usize, delta: i32, extent: usize| -> Option<usize> {
        let moved = position as i64 + delta as i64;
        (moved >= 0 && moved < extent as i64).then_some(moved as usize)
    };

    Some(VoxelCoordinate::new(
        shift(center.x, offset.0, shape.0)?,
        shift(center.y, offset.1, shape.1)?,
        shift(center.z, offset.2, shape.2)?,
    ))
}
