// Failure classification
//
// Maps whatever went wrong during a request into exactly one classified
// `Error`. Pure: side effects (notification, session recovery) are applied
// by the response interceptor after classification.

use crate::envelope::BusinessCode;
use crate::error::Error;

/// Transport-level fault, for requests where no response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    /// The per-request timeout elapsed.
    Timeout,
    /// The connection could not be established or was dropped.
    Connect,
    /// Anything else (body read failure, redirect loop, ...).
    Other,
}

impl From<&reqwest::Error> for TransportFault {
    fn from(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() || err.is_request() {
            Self::Connect
        } else {
            Self::Other
        }
    }
}

/// An unclassified failure observed by the response interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// No response reached the client.
    Transport(TransportFault),
    /// HTTP status >= 400. `reason` is the status text, if known.
    Status { status: u16, reason: Option<String> },
    /// Transport succeeded but the envelope `code` signalled failure.
    Business { code: BusinessCode, message: String },
}

impl Failure {
    /// Build a status failure from a reqwest status code.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        Self::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_owned),
        }
    }
}

/// Classify a failure against the request URL. First match wins:
/// timeout, unreachable, 401, status with text, business, fallback.
pub fn classify(failure: Failure, url: &str) -> Error {
    let url = url.to_owned();
    match failure {
        Failure::Transport(TransportFault::Timeout) => Error::Timeout { url },
        Failure::Transport(TransportFault::Connect) => Error::NetworkUnreachable { url },
        Failure::Status { status: 401, .. } => Error::Unauthorized { url },
        Failure::Status {
            status,
            reason: Some(status_text),
        } if !status_text.is_empty() => Error::HttpStatus {
            status,
            status_text,
            url,
        },
        Failure::Business { code, message } => Error::Business { code, message },
        Failure::Status { .. } | Failure::Transport(TransportFault::Other) => {
            Error::EndpointNotFound { url }
        }
    }
}
