// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Checks that configuration values are within valid ranges before a run starts.

use std::collections::BTreeSet;

use tracing::debug;

use crate::{ConfigError, ConfigResult, RsaConfig};

/// Largest searchlight radius accepted, in voxels
pub const MAX_SEARCHLIGHT_RADIUS: u32 = 32;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    InvalidRadius { radius: u32 },
    DuplicateSubject { subject: u32 },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRadius { radius } => {
                write!(
                    f,
                    "Searchlight radius {} is outside valid range (1-{})",
                    radius, MAX_SEARCHLIGHT_RADIUS
                )
            }
            Self::DuplicateSubject { subject } => {
                write!(f, "Subject {} is listed more than once", subject)
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Searchlight radius in `1..=MAX_SEARCHLIGHT_RADIUS`
/// - Positive progress interval and voxel budget
/// - Non-empty log level
/// - Unique subject identifiers
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &RsaConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_searchlight(config, &mut errors);
    validate_system(config, &mut errors);
    validate_group(config, &mut errors);

    if !errors.is_empty() {
        debug!(target: "rsa-config", "Configuration rejected with {} error(s)", errors.len());
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    debug!(target: "rsa-config",
        "Configuration valid: radius={} centers={:?}",
        config.searchlight.radius, config.searchlight.centers);
    Ok(())
}

fn validate_searchlight(config: &RsaConfig, errors: &mut Vec<ConfigValidationError>) {
    let searchlight = &config.searchlight;

    if searchlight.radius == 0 || searchlight.radius > MAX_SEARCHLIGHT_RADIUS {
        errors.push(ConfigValidationError::InvalidRadius {
            radius: searchlight.radius,
        });
    }

    if searchlight.progress_interval == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "searchlight.progress_interval".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    if searchlight.max_voxels == Some(0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "searchlight.max_voxels".to_string(),
            reason: "must be greater than 0 when set".to_string(),
        });
    }
}

fn validate_system(config: &RsaConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.system.log_level.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "system.log_level".to_string(),
        });
    }
}

fn validate_group(config: &RsaConfig, errors: &mut Vec<ConfigValidationError>) {
    let mut seen = BTreeSet::new();
    for &subject in &config.group.subjects {
        if !seen.insert(subject) {
            errors.push(ConfigValidationError::DuplicateSubject { subject });
        }
    }
}
