// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# rsa-searchlight

Searchlight representational similarity analysis over a preprocessed volume.

## Modules
- **neighborhood**: spherical offsets per radius, memoized
- **patch**: in-bounds neighbor series around one center voxel
- **engine**: the per-voxel scoring pass with cancellation and voxel budget
- **group**: grand-mean of per-subject score maps
- **pipeline**: per-subject and group orchestration driven by `RsaConfig`

## Features
- `parallel` (default): score voxels on the rayon pool
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod engine;
pub mod group;
pub mod neighborhood;
pub mod patch;
pub mod pipeline;

pub use engine::{
    CancellationToken, ProgressCallback, SearchlightEngine, SearchlightOutput, SearchlightParams,
    SearchlightSummary, VoxelScore,
};
pub use group::GroupAggregator;
pub use neighborhood::{apply_offset, sphere_offsets, NeighborhoodBuilder, NeighborhoodOffsets, VoxelOffset};
pub use patch::{extract_patch, Patch};
pub use pipeline::{GroupPipeline, GroupResult, GroupSummary, SubjectPipeline, SubjectResult};
