use crate::config::types::Config;
use crate::ConfigError;
use std::path::Path;

/// Loads a configuration file without validating it.
///
/// Validation runs later, after CLI flags have been merged on top, so a file
/// that only supplies partial defaults (no domain, say) still loads.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}
