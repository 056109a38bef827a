// HTTP transport for the console backends.
//
// All backends speak JSON over HTTPS and may sit behind a lab certificate,
// so the reqwest client is assembled here from a TLS trust choice plus the
// backend's request timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::error::Error;

/// Per-request timeout used when a backend does not set its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on establishing a connection, whatever the request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("fleetdesk/", env!("CARGO_PKG_VERSION"));

/// Which certificates the console trusts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Platform trust store.
    #[default]
    System,
    /// Platform store plus every certificate in a PEM bundle.
    CustomCa(PathBuf),
    /// No verification at all. Only for self-signed lab deployments.
    DangerAcceptInvalid,
}

impl TlsMode {
    /// Pick the trust mode from the two user-facing switches. Disabling
    /// verification wins over a CA bundle.
    pub fn resolve(insecure: bool, ca_bundle: Option<&Path>) -> Self {
        match (insecure, ca_bundle) {
            (true, _) => Self::DangerAcceptInvalid,
            (false, Some(path)) => Self::CustomCa(path.to_path_buf()),
            (false, None) => Self::System,
        }
    }

    fn configure(&self, builder: reqwest::ClientBuilder) -> Result<reqwest::ClientBuilder, Error> {
        match self {
            Self::System => Ok(builder),
            Self::CustomCa(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    Error::Tls(format!("cannot read CA bundle {}: {e}", path.display()))
                })?;
                let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                    Error::Tls(format!("CA bundle {} is not valid PEM: {e}", path.display()))
                })?;
                if certs.is_empty() {
                    return Err(Error::Tls(format!(
                        "CA bundle {} holds no certificates",
                        path.display()
                    )));
                }
                Ok(certs
                    .into_iter()
                    .fold(builder, reqwest::ClientBuilder::add_root_certificate))
            }
            Self::DangerAcceptInvalid => {
                tracing::warn!("TLS certificate verification is disabled");
                Ok(builder.danger_accept_invalid_certs(true))
            }
        }
    }
}

/// Build the HTTP client one backend uses.
pub(crate) fn http_client(tls: &TlsMode, timeout: Duration) -> Result<reqwest::Client, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, */*;q=0.8"));

    let builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(CONNECT_TIMEOUT));

    tls.configure(builder)?
        .build()
        .map_err(|e| Error::Tls(format!("HTTP client setup failed: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn insecure_switch_wins_over_ca_bundle() {
        let ca = Path::new("/etc/fleetdesk/ca.pem");
        assert_eq!(TlsMode::resolve(true, Some(ca)), TlsMode::DangerAcceptInvalid);
        assert_eq!(
            TlsMode::resolve(false, Some(ca)),
            TlsMode::CustomCa(ca.to_path_buf())
        );
        assert_eq!(TlsMode::resolve(false, None), TlsMode::System);
    }

    #[test]
    fn missing_ca_bundle_is_a_tls_error() {
        let dir = tempfile::tempdir().unwrap();
        let tls = TlsMode::CustomCa(dir.path().join("absent.pem"));
        let err = http_client(&tls, DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, Error::Tls(ref msg) if msg.contains("cannot read CA bundle")));
    }

    #[test]
    fn ca_bundle_without_certificates_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pem");
        std::fs::write(&path, "not a certificate\n").unwrap();
        let err = http_client(&TlsMode::CustomCa(path), DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, Error::Tls(_)));
    }

    #[test]
    fn system_and_insecure_modes_build() {
        assert!(http_client(&TlsMode::System, Duration::from_secs(5)).is_ok());
        assert!(http_client(&TlsMode::DangerAcceptInvalid, Duration::from_secs(5)).is_ok());
    }
}
