//! MergeService: orchestrates sources, applies merge policy, deserializes to FstreeConfig.

use crate::config::sources::{environment, root_file};
use crate::config::FstreeConfig;
use config::{ConfigError, File};
use std::path::Path;

use super::merge_policy;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Load config for a tree root.
    /// Precedence: defaults (lowest) -> root file -> environment (highest).
    pub fn load(root: &Path) -> Result<FstreeConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = root_file::add_to_builder(builder, root)?;
        let builder = environment::add_to_builder(builder)?;

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load config from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<FstreeConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = builder.add_source(File::from(path));
        let builder = environment::add_to_builder(builder)?;

        let config = builder.build()?;
        config.try_deserialize()
    }
}
