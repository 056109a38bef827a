//! Shared configuration for fleetdesk tools.
//!
//! A TOML file layered under `FLEETDESK_*` environment variables, and its
//! translation to `fleetdesk_api::ConsoleSettings`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fleetdesk_api::expiry::DEFAULT_LOGIN_PATH;
use fleetdesk_api::{
    Backend, BackendAddress, ConsoleSettings, EndpointSettings, ExpiryPolicy, TlsMode,
};

/// Prefix for environment overrides. Nested keys use `__`, e.g.
/// `FLEETDESK_GATEWAY__HOST`.
pub const ENV_PREFIX: &str = "FLEETDESK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    pub management: ManagementSection,

    pub gateway: ServiceSection,

    /// The assessment service is optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<ServiceSection>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            management: ManagementSection {
                base_url: "http://localhost:8080/api".into(),
                timeout: None,
            },
            gateway: ServiceSection {
                base_url: "http://localhost:8080/gateway".into(),
                host: None,
                scheme: None,
                timeout: None,
            },
            assessment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(default)]
    pub expiry_policy: ExpiryPolicy,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Where the session token and cached console data live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
            expiry_policy: ExpiryPolicy::default(),
            login_path: default_login_path(),
            state_dir: None,
        }
    }
}

fn default_timeout() -> u64 {
    60
}
fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.into()
}

/// The management API. Always same-origin, so no host override.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManagementSection {
    pub base_url: String,

    /// Override the default timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// A service that may be served from another origin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceSection {
    /// Absolute URL, or only a path when `host` is set.
    pub base_url: String,

    /// Replaces the origin of `base_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Scheme for `host` (defaults to https).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl ServiceSection {
    fn address(&self) -> BackendAddress {
        let address = BackendAddress::new(self.base_url.clone());
        match &self.host {
            Some(host) => address.with_origin(host.clone(), self.scheme.clone()),
            None => address,
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "fleetdesk", "fleetdesk")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fleetdesk");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default directory for session state.
pub fn default_state_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("state"),
        |dirs| dirs.data_local_dir().to_path_buf(),
    )
}

// ── Loading & saving ────────────────────────────────────────────────

/// Load the config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if it exists), then `FLEETDESK_*` variables.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    pub fn state_dir(&self) -> PathBuf {
        self.defaults
            .state_dir
            .clone()
            .unwrap_or_else(default_state_dir)
    }

    fn tls_mode(&self) -> TlsMode {
        TlsMode::resolve(self.defaults.insecure, self.defaults.ca_cert.as_deref())
    }

    /// Validate and build the settings the backend clients are made from.
    pub fn to_console_settings(&self) -> Result<ConsoleSettings, ConfigError> {
        if self.defaults.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let management = endpoint(
            Backend::Management,
            BackendAddress::new(self.management.base_url.clone()),
            self.management.timeout,
        )?;
        let gateway = endpoint(Backend::Gateway, self.gateway.address(), self.gateway.timeout)?;
        let assessment = self
            .assessment
            .as_ref()
            .map(|s| endpoint(Backend::Assessment, s.address(), s.timeout))
            .transpose()?;

        let mut settings = ConsoleSettings::new(management, gateway);
        settings.assessment = assessment;
        settings.timeout = Duration::from_secs(self.defaults.timeout);
        settings.tls = self.tls_mode();
        settings.expiry_policy = self.defaults.expiry_policy;
        settings.login_path.clone_from(&self.defaults.login_path);
        Ok(settings)
    }
}

fn endpoint(
    backend: Backend,
    address: BackendAddress,
    timeout: Option<u64>,
) -> Result<EndpointSettings, ConfigError> {
    if address.base_url.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: format!("{backend}.base_url"),
            reason: "must not be empty".into(),
        });
    }
    address.resolve().map_err(|e| ConfigError::Validation {
        field: format!("{backend}.base_url"),
        reason: e.to_string(),
    })?;
    if timeout == Some(0) {
        return Err(ConfigError::Validation {
            field: format!("{backend}.timeout"),
            reason: "must be greater than zero".into(),
        });
    }

    let mut settings = EndpointSettings::new(address);
    settings.timeout = timeout.map(Duration::from_secs);
    Ok(settings)
}
