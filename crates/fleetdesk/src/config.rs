//! CLI configuration: thin wrapper around `fleetdesk_config`.
//!
//! Resolves the config path from `--config` and applies the global flag
//! overrides (`--insecure`, `--timeout`) on top of the loaded file.

use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use fleetdesk_config::{Config, load_config, load_config_from, save_config, save_config_to};

/// Config file in effect: `--config` / `FLEETDESK_CONFIG`, else the
/// platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(fleetdesk_config::config_path)
}

/// Load the config file and apply flag overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = match global.config {
        Some(ref path) => load_config_from(path)?,
        None => load_config()?,
    };
    if global.insecure {
        cfg.defaults.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        cfg.defaults.timeout = timeout;
    }
    Ok(cfg)
}

/// Write the config to `--config` or the platform default path.
pub fn save(global: &GlobalOpts, cfg: &Config) -> Result<PathBuf, CliError> {
    match global.config {
        Some(ref path) => {
            save_config_to(cfg, path)?;
            Ok(path.clone())
        }
        None => Ok(save_config(cfg)?),
    }
}

/// Render the config as it would be written to disk.
pub fn to_toml(cfg: &Config) -> Result<String, CliError> {
    toml::to_string_pretty(cfg).map_err(|e| CliError::Validation {
        field: "config".into(),
        reason: format!("failed to serialize config: {e}"),
    })
}
