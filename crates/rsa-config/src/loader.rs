// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{CenterSelection, ConfigError, ConfigResult, RsaConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

const CONFIG_FILE_NAME: &str = "rsa_configuration.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `RSA_CONFIG_PATH` environment variable
/// 2. Current working directory: `./rsa_configuration.toml`
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("RSA_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by RSA_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Configuration file '{}' not found in any of these locations:\n{}\n\nSet RSA_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML.
/// Validation is left to [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<RsaConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    debug!(target: "rsa-config", "Loading configuration from {}", config_file.display());
    let content = fs::read_to_string(&config_file)?;
    let mut config: RsaConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `RSA_RADIUS` -> `searchlight.radius`
/// - `RSA_CENTERS` -> `searchlight.centers` (`mask` | `full_grid`)
/// - `RSA_MAX_VOXELS` -> `searchlight.max_voxels` (`none` clears it)
/// - `RSA_MAX_THREADS` -> `system.max_threads`
/// - `RSA_LOG_LEVEL` -> `system.log_level`
///
/// Unparseable values are ignored.
pub fn apply_environment_overrides(config: &mut RsaConfig) {
    let vars: HashMap<String, String> = [
        ("radius", "RSA_RADIUS"),
        ("centers", "RSA_CENTERS"),
        ("max_voxels", "RSA_MAX_VOXELS"),
        ("max_threads", "RSA_MAX_THREADS"),
        ("log_level", "RSA_LOG_LEVEL"),
    ]
    .into_iter()
    .filter_map(|(key, var)| env::var(var).ok().map(|value| (key.to_string(), value)))
    .collect();
    if !vars.is_empty() {
        debug!(target: "rsa-config", "Environment overrides for {} key(s)", vars.len());
    }
    apply_overrides(config, &vars);
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of CLI arguments (e.g., `{"radius": "3", "centers": "full_grid"}`)
pub fn apply_cli_overrides(config: &mut RsaConfig, cli_args: &HashMap<String, String>) {
    debug!(target: "rsa-config", "CLI overrides for {} key(s)", cli_args.len());
    apply_overrides(config, cli_args);
}

fn apply_overrides(config: &mut RsaConfig, values: &HashMap<String, String>) {
    if let Some(value) = values.get("radius") {
        if let Ok(radius) = value.parse::<u32>() {
            config.searchlight.radius = radius;
        }
    }
    if let Some(value) = values.get("centers") {
        if let Ok(centers) = value.parse::<CenterSelection>() {
            config.searchlight.centers = centers;
        }
    }
    if let Some(value) = values.get("max_voxels") {
        if value.eq_ignore_ascii_case("none") {
            config.searchlight.max_voxels = None;
        } else if let Ok(max_voxels) = value.parse::<usize>() {
            config.searchlight.max_voxels = Some(max_voxels);
        }
    }
    if let Some(value) = values.get("max_threads") {
        if let Ok(threads) = value.parse::<usize>() {
            config.system.max_threads = threads;
        }
    }
    if let Some(value) = values.get("log_level") {
        config.system.log_level = value.clone();
    }
}
