pub mod cli;
mod convert;
mod tools;
mod validate;

use std::path::{Path, PathBuf};

use codepact_core::api as core_api;

pub use convert::handle_convert;
pub use tools::handle_tools;
pub use validate::handle_validate;

/// Explicit path, else `./codepact.toml`, else `<config dir>/codepact/codepact.toml`,
/// else built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<core_api::AppConfig, core_api::CliError> {
    if explicit.is_some() || Path::new(core_api::DEFAULT_CONFIG_FILE).exists() {
        return Ok(core_api::load_default(explicit)?);
    }
    let user_config: Option<PathBuf> = dirs::config_dir()
        .map(|d| d.join("codepact").join(core_api::DEFAULT_CONFIG_FILE))
        .filter(|p| p.is_file());
    Ok(core_api::load_default(user_config.as_deref())?)
}
