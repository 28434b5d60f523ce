//! Command handlers -- one module per subcommand

pub mod config;
pub mod ensure;
pub mod exec;
pub mod privilege;
pub mod status;
pub mod validate;

use std::path::Path;

use tracing::debug;

use lxcward_core::config::LxcwardConfig;

use crate::cli::DEFAULT_CONFIG_PATH;
use crate::error::CliError;

/// Load the effective configuration.
///
/// An absent file at the default path falls back to built-in defaults plus
/// environment overrides. An explicitly given path must exist.
pub async fn load_config(config_path: &Path) -> Result<LxcwardConfig, CliError> {
    if config_path == Path::new(DEFAULT_CONFIG_PATH) && !config_path.exists() {
        debug!(path = %config_path.display(), "config file absent, using defaults");
        return Ok(LxcwardConfig::from_env()?);
    }
    Ok(LxcwardConfig::load(config_path).await?)
}
