#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistical profile extraction and reconciliation.
//!
//! Takes a pivoted census profile worksheet (rows are characteristics,
//! columns are geographic areas) and rebuilds normalized per-area
//! [`ProfileRecord`](census_profile_models::ProfileRecord) values:
//!
//! 1. [`sections`] tags rows with a topic category using ordered anchors.
//! 2. [`area_index`] resolves free-text column headers to area identifiers.
//! 3. [`derived`] computes per-area scalars (median age, tenure and
//!    education shares, dominant rows) from the raw rows.
//! 4. [`emit`] turns tagged rows into records, applying the top-K policies.
//!
//! [`extract::extract_profile`] runs the whole pipeline. The engine does
//! no I/O; callers hand it rows and areas and persist what it returns.

pub mod area_index;
pub mod config;
pub mod derived;
pub mod emit;
pub mod extract;
pub mod parsing;
pub mod progress;
pub mod sections;

use census_profile_models::config::ConfigError;
use thiserror::Error;

/// Errors that can occur while preparing a profile extraction.
///
/// Row- and cell-level anomalies are never errors; they degrade to
/// absent values or skipped records.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration is structurally invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
