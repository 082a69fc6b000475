//! Defaults every configuration build starts from.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with the lowest-precedence defaults.
pub(crate) fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("tree.encoding", "utf-8")?
        .set_default("tree.direct_sync", false)?
        .set_default("logging.level", "info")
}
