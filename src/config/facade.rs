//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::FstreeConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a tree rooted at `root`.
    pub fn load(root: &Path) -> Result<FstreeConfig, ConfigError> {
        MergeService::load(root)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<FstreeConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    /// Create default configuration.
    pub fn default() -> FstreeConfig {
        FstreeConfig::default()
    }
}
