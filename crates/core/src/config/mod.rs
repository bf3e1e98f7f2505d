//! Settings for the catalog connection, the scanned directory, reconciliation
//! and the tracking snapshot.
//!
//! A TOML file provides the base values. Any key can be overridden through
//! `CKANSYNC_<SECTION>__<KEY>`, e.g. `CKANSYNC_CATALOG__API_KEY`.

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str, ENV_PREFIX};
pub use types::*;
pub use validate::validate_config;

use std::path::PathBuf;

use thiserror::Error;

/// Why a ckansync configuration could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file given on the command line does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// TOML syntax, a wrong value type, or a bad environment override.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Values that parse but cannot drive a run, such as an empty catalog URL.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
