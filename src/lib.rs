// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # searchlight-rsa
//!
//! Searchlight representational similarity analysis (RSA) on volumetric
//! brain-imaging time series. For every voxel of interest, the observation
//! patterns of its spherical neighborhood form a dissimilarity matrix (RDM)
//! that is rank-correlated with a categorical model RDM, giving a 3-D score map.
//!
//! ## Feature Flags
//! - **`parallel`** (default): voxel loop and group mean on the rayon pool
//! - **`file-logging`**: JSON log files in timestamped run folders
//!
//! ## Usage
//!
//! ```rust,no_run
//! use searchlight_rsa::prelude::*;
//!
//! # fn load_subject() -> (Dataset, Mask) { unimplemented!() }
//! let config = load_config(None, None)?;
//! init_console_logging(&config.system.log_level)?;
//!
//! let pipeline = SubjectPipeline::new(config)?;
//! let (dataset, mask) = load_subject();
//! let subject = pipeline.run(&dataset, Some(&mask))?;
//! println!("{}", subject.summary.to_json()?);
//!
//! let group = GroupPipeline::new().aggregate([&subject])?;
//! println!("mean score: {:?}", group.summary.statistics.map(|s| s.mean));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: rsa-structures, rsa-config                 │
//! │  (Volume, Mask, Labels, ResultVolume, RsaConfig)        │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Kernels: rsa-compute                                   │
//! │  (preprocessing, RDMs, Spearman scoring)                │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Orchestration: rsa-searchlight                         │
//! │  (neighborhoods, searchlight pass, group mean)          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Loading images, labels and masks from disk, and writing or plotting the
//! resulting maps, are left to the caller.

pub use rsa_compute as compute;
pub use rsa_config as config;
pub use rsa_observability as observability;
pub use rsa_searchlight as searchlight;
pub use rsa_structures as structures;

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::structures::{
        Affine, Dataset, Labels, Mask, ResultVolume, RsaError, RsaResult, Volume, VoxelCoordinate,
    };

    pub use crate::compute::{
        build_data_rdm, build_model_rdm, Rdm, RdmComparison, SignalPreprocessor, SimilarityScorer,
    };

    pub use crate::searchlight::{
        CancellationToken, GroupAggregator, GroupPipeline, NeighborhoodBuilder, SearchlightEngine,
        SearchlightParams, SearchlightSummary, SubjectPipeline, SubjectResult,
    };

    pub use crate::config::{load_config, validate_config, CenterSelection, RsaConfig};

    pub use crate::observability::{init_console_logging, parse_debug_flags, CrateDebugFlags};
}
