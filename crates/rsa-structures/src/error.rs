// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Error types shared by every searchlight RSA crate.

All variants are precondition violations: they abort a run before (or instead
of) producing a result. Numerical degeneracies are not errors and are reported
through the scoring types of `rsa-compute`.
*/

use crate::volume::{SpatialShape, VoxelCoordinate};

/// Result type for searchlight RSA operations
pub type RsaResult<T> = Result<T, RsaError>;

/// Errors that can occur while validating inputs or running the analysis
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RsaError {
    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Label count mismatch: volume has {observations} observations but {labels} labels were given")]
    LabelCountMismatch { observations: usize, labels: usize },

    #[error("RDM size mismatch: {left}x{left} vs {right}x{right}")]
    RdmSizeMismatch { left: usize, right: usize },

    #[error("Invalid radius: {0}")]
    InvalidRadius(String),

    #[error("Empty searchlight patch centered at voxel {0}")]
    EmptyPatch(VoxelCoordinate),

    #[error("Out of bounds: voxel {voxel} not in spatial shape {shape:?}")]
    OutOfBounds {
        voxel: VoxelCoordinate,
        shape: SpatialShape,
    },

    #[error("Cannot aggregate an empty group of result volumes")]
    EmptyGroup,

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Bad parameters: {0}")]
    BadParameters(String),
}

impl RsaError {
    /// Shorthand for a spatial shape mismatch
    pub fn spatial_mismatch(what: &str, expected: SpatialShape, actual: SpatialShape) -> Self {
        RsaError::ShapeMismatch {
            what: what.to_string(),
            expected: vec![expected.0, expected.1, expected.2],
            actual: vec![actual.0, actual.1, actual.2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_mismatch_message() {
        let err = RsaError::spatial_mismatch("mask", (4, 4, 4), (4, 4, 3));
        let msg = err.to_string();
        assert!(msg.contains("mask"));
        assert!(msg.contains("[4, 4, 4]"));
        assert!(msg.contains("[4, 4, 3]"));
    }

    #[test]
    fn test_label_count_message() {
        let err = RsaError::LabelCountMismatch {
            observations: 6,
            labels: 5,
        };
        assert_eq!(
            err.to_string(),
            "Label count mismatch: volume has 6 observations but 5 labels were given"
        );
    }
}
