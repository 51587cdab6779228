// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# rsa-compute

Pure numeric kernels of the searchlight RSA pipeline. Nothing here knows about
searchlights or voxels' spatial layout; everything operates on series,
patches and matrices.

- [`preprocessing`]: chunk-wise linear detrending and z-scoring
- [`rdm`]: correlation-distance data RDMs and categorical model RDMs
- [`similarity`]: Spearman rank correlation between RDMs
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod preprocessing;
pub mod rdm;
pub mod similarity;

pub use preprocessing::{Preprocessed, PreprocessingOptions, SignalPreprocessor};
pub use rdm::{build_data_rdm, build_model_rdm, DataRdm, Rdm, UNDEFINED_DISTANCE};
pub use similarity::{Degeneracy, RdmComparison, RdmScore, SimilarityScorer};
