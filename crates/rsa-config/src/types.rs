// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `rsa_configuration.toml`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RsaConfig {
    pub system: SystemConfig,
    pub searchlight: SearchlightConfig,
    pub labels: LabelsConfig,
    pub preprocessing: PreprocessingConfig,
    pub group: GroupConfig,
}

/// System-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Worker threads for the searchlight pass (0 = rayon default)
    pub max_threads: usize,
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            max_threads: 0,
            log_level: "info".to_string(),
        }
    }
}

/// Which voxels act as searchlight centers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterSelection {
    /// Only voxels set in the analysis mask
    #[default]
    Mask,
    /// Every voxel of the grid
    FullGrid,
}

impl Display for CenterSelection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CenterSelection::Mask => write!(f, "mask"),
            CenterSelection::FullGrid => write!(f, "full_grid"),
        }
    }
}

impl FromStr for CenterSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mask" => Ok(CenterSelection::Mask),
            "full_grid" | "full-grid" | "grid" => Ok(CenterSelection::FullGrid),
            other => Err(format!("unknown center selection '{}'", other)),
        }
    }
}

/// Searchlight geometry and scheduling
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchlightConfig {
    /// Sphere radius in voxels (boundary inclusive)
    pub radius: u32,
    pub centers: CenterSelection,
    /// Stop after this many center voxels
    pub max_voxels: Option<usize>,
    /// Log progress every N voxels
    pub progress_interval: usize,
}

impl Default for SearchlightConfig {
    fn default() -> Self {
        Self {
            radius: 2,
            centers: CenterSelection::Mask,
            max_voxels: None,
            progress_interval: 1000,
        }
    }
}

/// Label filtering applied before the searchlight pass
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Conditions dropped from the analysis (e.g. baseline)
    pub exclude_conditions: Vec<String>,
    /// Reorder observations by condition name (stable)
    pub sort_by_condition: bool,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            exclude_conditions: vec!["rest".to_string(), "scrambledpix".to_string()],
            sort_by_condition: true,
        }
    }
}

/// Signal preprocessing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Process each chunk separately (otherwise the whole series is one chunk)
    pub per_chunk: bool,
    pub detrend: bool,
    pub standardize: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            per_chunk: true,
            detrend: true,
            standardize: true,
        }
    }
}

/// Group averaging
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GroupConfig {
    pub subjects: Vec<u32>,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            subjects: vec![1, 2, 3, 4, 5, 6],
        }
    }
}
