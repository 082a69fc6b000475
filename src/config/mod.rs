//! Configuration
//!
//! Layered configuration for trees and logging, loaded with the `config`
//! crate: built-in defaults, then an optional `.fstree.toml` in the tree
//! root, then `FSTREE__*` environment variables.

pub mod facade;
pub mod merge;
pub mod sources;

pub use facade::ConfigLoader;

use crate::error::TreeError;
use crate::logging::LoggingConfig;
use crate::types::NameEncoding;
use serde::{Deserialize, Serialize};

/// Name of the per-root configuration file
pub const ROOT_CONFIG_FILE: &str = ".fstree.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FstreeConfig {
    #[serde(default)]
    pub tree: TreeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tree behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Normalization applied to child names
    #[serde(default)]
    pub encoding: NameEncoding,

    /// Names hidden from the root directory
    #[serde(default = "default_ignores")]
    pub ignores: Vec<String>,

    /// fsync every file written by the default file type
    #[serde(default)]
    pub direct_sync: bool,

    /// Octal permission bits for persisted files, e.g. "644"
    #[serde(default)]
    pub file_permissions: Option<String>,

    /// Octal permission bits for persisted directories, e.g. "755"
    #[serde(default)]
    pub dir_permissions: Option<String>,
}

fn default_ignores() -> Vec<String> {
    vec![ROOT_CONFIG_FILE.to_string()]
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            encoding: NameEncoding::default(),
            ignores: default_ignores(),
            direct_sync: false,
            file_permissions: None,
            dir_permissions: None,
        }
    }
}

impl TreeConfig {
    pub fn file_permissions(&self) -> Result<Option<u32>, TreeError> {
        self.file_permissions.as_deref().map(parse_mode).transpose()
    }

    pub fn dir_permissions(&self) -> Result<Option<u32>, TreeError> {
        self.dir_permissions.as_deref().map(parse_mode).transpose()
    }
}

/// Parse octal permission bits, with or without a `0o` prefix
pub fn parse_mode(raw: &str) -> Result<u32, TreeError> {
    let digits = raw.trim().trim_start_matches("0o");
    let mode = u32::from_str_radix(digits, 8)
        .map_err(|e| TreeError::ConfigError(format!("Invalid permission mode {:?}: {}", raw, e)))?;
    if mode > 0o7777 {
        return Err(TreeError::ConfigError(format!(
            "Permission mode {:?} out of range",
            raw
        )));
    }
    Ok(mode)
}
