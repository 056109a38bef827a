//! CLI error types with miette diagnostics.
//!
//! Maps classified request failures into user-facing errors with help text
//! and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use fleetdesk_api::BusinessCode;
use fleetdesk_api::session::StoreError;
use fleetdesk_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const BUSINESS: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("network error: {url}")]
    #[diagnostic(
        code(fleetdesk::unreachable),
        help("Check that the backend is running and reachable, then retry.")
    )]
    Unreachable { url: String },

    #[error("network timeout: {url}")]
    #[diagnostic(
        code(fleetdesk::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { url: String },

    #[error("{0}")]
    #[diagnostic(
        code(fleetdesk::tls),
        help("Use --insecure (-k) for self-signed certificates, or set defaults.ca_cert.")
    )]
    Tls(String),

    // ── Session ──────────────────────────────────────────────────────
    #[error("session expired, please log in again")]
    #[diagnostic(
        code(fleetdesk::session_expired),
        help("Run: fleetdesk login --token <TOKEN>")
    )]
    SessionExpired,

    // ── Responses ────────────────────────────────────────────────────
    #[error("{status} {status_text}: {url}")]
    #[diagnostic(code(fleetdesk::http_status))]
    HttpStatus {
        status: u16,
        status_text: String,
        url: String,
    },

    #[error("endpoint not found: {url}")]
    #[diagnostic(
        code(fleetdesk::endpoint_not_found),
        help("Check the request path and the backend base_url in your config.")
    )]
    EndpointNotFound { url: String },

    #[error("{message}")]
    #[diagnostic(code(fleetdesk::business), help("The backend rejected the request (code {code})."))]
    Business { code: BusinessCode, message: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(fleetdesk::response))]
    Response { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fleetdesk::validation))]
    Validation { field: String, reason: String },

    #[error("The {backend} backend is not configured")]
    #[diagnostic(
        code(fleetdesk::backend_not_configured),
        help("Add an [{backend}] section to the config file.")
    )]
    BackendNotConfigured { backend: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(fleetdesk::config), help("Inspect the effective config with: fleetdesk config show"))]
    Config(#[from] ConfigError),

    #[error("Config file already exists at {path}")]
    #[diagnostic(code(fleetdesk::config_exists), help("Pass --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(fleetdesk::session_store))]
    Store(#[from] StoreError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(fleetdesk::json), help("Check the JSON body and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(fleetdesk::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } | Self::Tls(_) => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::SessionExpired => exit_code::AUTH,
            Self::EndpointNotFound { .. } => exit_code::NOT_FOUND,
            Self::HttpStatus { status, .. } => match status {
                403 => exit_code::PERMISSION,
                404 => exit_code::NOT_FOUND,
                _ => exit_code::GENERAL,
            },
            Self::Business { .. } => exit_code::BUSINESS,
            Self::Validation { .. } | Self::ConfigExists { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Whether the user has already seen this failure before the process
    /// exits. An expired session is announced by the expiry prompt.
    pub fn already_shown(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

// ── fleetdesk_api::Error → CliError mapping ──────────────────────────

impl From<fleetdesk_api::Error> for CliError {
    fn from(err: fleetdesk_api::Error) -> Self {
        use fleetdesk_api::Error;

        match err {
            Error::Timeout { url } => Self::Timeout { url },
            Error::NetworkUnreachable { url } => Self::Unreachable { url },
            Error::Unauthorized { .. } => Self::SessionExpired,
            Error::HttpStatus {
                status,
                status_text,
                url,
            } => Self::HttpStatus {
                status,
                status_text,
                url,
            },
            Error::EndpointNotFound { url } => Self::EndpointNotFound { url },
            Error::Business { code, message } => Self::Business { code, message },
            Error::Tls(message) => Self::Tls(message),
            Error::InvalidUrl(e) => Self::Validation {
                field: "path".into(),
                reason: e.to_string(),
            },
            Error::InvalidRequest(reason) => Self::Validation {
                field: "request".into(),
                reason,
            },
            Error::Config(reason) => Self::Validation {
                field: "config".into(),
                reason,
            },
            Error::Deserialization { message, .. } => Self::Response { message },
        }
    }
}
