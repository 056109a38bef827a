use thiserror::Error;

use crate::envelope::BusinessCode;

/// Tag for a classified request failure.
///
/// Every failed façade call carries exactly one of these. Local failures
/// (bad URL, undecodable body) are not classified and have no kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    NetworkUnreachable,
    HttpStatus,
    Business,
    Unauthorized,
    EndpointNotFound,
}

/// Top-level error type for the `fleetdesk-api` crate.
///
/// The `Display` output of the classified variants is the user-facing
/// message shown by the notification sink.
#[derive(Debug, Error)]
pub enum Error {
    // ── Classified request failures ─────────────────────────────────
    /// The request did not complete within the client's timeout.
    #[error("network timeout: {url}")]
    Timeout { url: String },

    /// No response reached the client (DNS, refused connection, reset).
    #[error("network error: {url}")]
    NetworkUnreachable { url: String },

    /// The server answered with an HTTP error status.
    #[error("{status} {status_text}: {url}")]
    HttpStatus {
        status: u16,
        status_text: String,
        url: String,
    },

    /// The envelope carried a non-success `code`.
    #[error("{message}")]
    Business { code: BusinessCode, message: String },

    /// HTTP 401. Triggers the session expiry recovery.
    #[error("session expired, please log in again")]
    Unauthorized { url: String },

    /// Failure with no usable status or transport indicator.
    #[error("endpoint not found: {url}")]
    EndpointNotFound { url: String },

    // ── Local ───────────────────────────────────────────────────────
    /// URL parsing or joining error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request could not be built (unserializable params, bad header).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Building the underlying HTTP client failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The canonical value did not match the caller's expected type.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Backend configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// The classification tag, or `None` for local failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Timeout { .. } => Some(ErrorKind::Timeout),
            Self::NetworkUnreachable { .. } => Some(ErrorKind::NetworkUnreachable),
            Self::HttpStatus { .. } => Some(ErrorKind::HttpStatus),
            Self::Business { .. } => Some(ErrorKind::Business),
            Self::Unauthorized { .. } => Some(ErrorKind::Unauthorized),
            Self::EndpointNotFound { .. } => Some(ErrorKind::EndpointNotFound),
            Self::InvalidUrl(_)
            | Self::InvalidRequest(_)
            | Self::Tls(_)
            | Self::Deserialization { .. }
            | Self::Config(_) => None,
        }
    }

    /// Returns `true` if re-authentication is the only way forward.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns `true` if the same call might succeed later unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::NetworkUnreachable { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The HTTP status, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    /// The envelope `code` of a business failure.
    pub fn business_code(&self) -> Option<&BusinessCode> {
        match self {
            Self::Business { code, .. } => Some(code),
            _ => None,
        }
    }
}
