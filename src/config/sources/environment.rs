//! Environment variable source: FSTREE_* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
/// Uses FSTREE_ prefix and __ as separator for nested keys; `tree.ignores`
/// is read as a comma separated list.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix("FSTREE")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("tree.ignores")
            .try_parsing(true),
    );
    Ok(builder)
}
