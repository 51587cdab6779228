// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # rsa-observability
//!
//! Logging setup shared by the searchlight RSA crates, with per-crate debug
//! flag support.
//!
//! ## Features
//! - `file-logging`: JSON log files in timestamped run folders

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Crate names usable with `--debug-<crate>`; these match the `target:` each crate logs under
pub const KNOWN_CRATES: &[&str] = &["rsa-compute", "rsa-searchlight", "rsa-config"];
