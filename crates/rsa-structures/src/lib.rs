// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# rsa-structures

Data model shared by the searchlight RSA crates:

- [`Volume`]: 4-D `(X, Y, Z, T)` observation array
- [`Mask`]: 3-D boolean selection of eligible voxels
- [`Labels`]: condition and chunk of every observation
- [`Dataset`]: a volume and its labels, kept in lock-step
- [`ResultVolume`]: per-voxel score map plus analysed mask and pass-through affine
- [`RsaError`]: precondition violations shared by every crate

Inputs are treated as immutable: operations that filter or reorder return new
values instead of mutating in place.
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod dataset;
pub mod error;
pub mod labels;
pub mod result_volume;
pub mod volume;

pub use dataset::Dataset;
pub use error::{RsaError, RsaResult};
pub use labels::{LabelEntry, Labels};
pub use result_volume::{Affine, ResultVolume, ScoreStatistics};
pub use volume::{Mask, SpatialShape, Volume, VoxelCoordinate};
