// Backend instances
//
// The console talks to three services: the primary management API, the
// device-protocol gateway, and an optional assessment service. Each gets
// one `ApiClient` built by a shared `ClientFactory`, with its own base
// address and payload normalizer.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::client::{ApiClient, ClientConfig, ClientFactory};
use crate::error::Error;
use crate::expiry::{DEFAULT_LOGIN_PATH, ExpiryPolicy, SessionExpiryHandler, SessionPrompt};
use crate::notify::Notifier;
use crate::payload::PayloadNormalizer;
use crate::session::SessionStore;
use crate::transport::{DEFAULT_TIMEOUT, TlsMode};

/// Scheme used by an origin override that does not name one.
pub const DEFAULT_OVERRIDE_SCHEME: &str = "https";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Backend {
    Management,
    Gateway,
    Assessment,
}

impl Backend {
    /// Whether the base address may be re-pointed at another origin.
    pub fn supports_origin_override(self) -> bool {
        matches!(self, Self::Gateway | Self::Assessment)
    }

    /// Payload normalizer variant spoken by this backend.
    pub fn payload_normalizer(self) -> PayloadNormalizer {
        match self {
            Self::Management => PayloadNormalizer::identity(),
            Self::Gateway | Self::Assessment => PayloadNormalizer::legacy(),
        }
    }
}

// ── Addressing ───────────────────────────────────────────────────────

/// Host (and optional scheme) that replaces the configured origin, for
/// deployments where a service is served cross-origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginOverride {
    pub scheme: Option<String>,
    pub host: String,
}

/// Where a backend lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAddress {
    /// Absolute URL, or just a path when an origin override supplies the host.
    pub base_url: String,
    pub origin: Option<OriginOverride>,
}

impl BackendAddress {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, host: impl Into<String>, scheme: Option<String>) -> Self {
        self.origin = Some(OriginOverride {
            scheme,
            host: host.into(),
        });
        self
    }

    /// Resolve to an absolute URL, applying the origin override if set.
    pub fn resolve(&self) -> Result<Url, Error> {
        let Some(origin) = &self.origin else {
            return Ok(Url::parse(&self.base_url)?);
        };

        // Keep only the path of the configured address.
        let path = match Url::parse(&self.base_url) {
            Ok(url) => url.path().to_owned(),
            Err(_) => format!("/{}", self.base_url.trim_start_matches('/')),
        };
        let scheme = origin.scheme.as_deref().unwrap_or(DEFAULT_OVERRIDE_SCHEME);
        let host = origin.host.trim_end_matches('/');
        Ok(Url::parse(&format!("{scheme}://{host}{path}"))?)
    }
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    pub address: BackendAddress,
    /// Overrides [`ConsoleSettings::timeout`] for this backend.
    pub timeout: Option<Duration>,
}

impl EndpointSettings {
    pub fn new(address: BackendAddress) -> Self {
        Self {
            address,
            timeout: None,
        }
    }
}

/// Everything needed to build the backend clients.
#[derive(Debug, Clone)]
pub struct ConsoleSettings {
    pub management: EndpointSettings,
    pub gateway: EndpointSettings,
    pub assessment: Option<EndpointSettings>,
    pub timeout: Duration,
    pub tls: TlsMode,
    pub expiry_policy: ExpiryPolicy,
    pub login_path: String,
}

impl ConsoleSettings {
    pub fn new(management: EndpointSettings, gateway: EndpointSettings) -> Self {
        Self {
            management,
            gateway,
            assessment: None,
            timeout: DEFAULT_TIMEOUT,
            tls: TlsMode::default(),
            expiry_policy: ExpiryPolicy::default(),
            login_path: DEFAULT_LOGIN_PATH.into(),
        }
    }

    fn endpoint(&self, backend: Backend) -> Option<&EndpointSettings> {
        match backend {
            Backend::Management => Some(&self.management),
            Backend::Gateway => Some(&self.gateway),
            Backend::Assessment => self.assessment.as_ref(),
        }
    }

    /// Client configuration for one backend, or `None` if it is not
    /// configured.
    pub fn client_config(&self, backend: Backend) -> Result<Option<ClientConfig>, Error> {
        let Some(endpoint) = self.endpoint(backend) else {
            return Ok(None);
        };
        if endpoint.address.origin.is_some() && !backend.supports_origin_override() {
            return Err(Error::Config(format!(
                "{backend} backend does not support an origin override"
            )));
        }
        let base_url = endpoint.address.resolve()?;
        debug!(%backend, %base_url, "resolved backend address");
        Ok(Some(
            ClientConfig::new(base_url)
                .timeout(endpoint.timeout.unwrap_or(self.timeout))
                .normalize_payload(backend.payload_normalizer()),
        ))
    }
}

// ── Instances ────────────────────────────────────────────────────────

/// One client per backend, built once at start-up.
#[derive(Debug, Clone)]
pub struct Backends {
    pub management: ApiClient,
    pub gateway: ApiClient,
    pub assessment: Option<ApiClient>,
}

impl Backends {
    /// Build every configured backend with one factory.
    pub fn build(factory: &ClientFactory, settings: &ConsoleSettings) -> Result<Self, Error> {
        let build = |backend| -> Result<Option<ApiClient>, Error> {
            settings
                .client_config(backend)?
                .map(|config| factory.build(config))
                .transpose()
        };
        let required = |backend| -> Result<ApiClient, Error> {
            build(backend)?.ok_or_else(|| Error::Config(format!("{backend} backend is required")))
        };

        Ok(Self {
            management: required(Backend::Management)?,
            gateway: required(Backend::Gateway)?,
            assessment: build(Backend::Assessment)?,
        })
    }

    /// Wire the session store, expiry handler, and factory from settings,
    /// then build every backend.
    pub fn connect(
        settings: &ConsoleSettings,
        session: Arc<SessionStore>,
        prompt: Arc<dyn SessionPrompt>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, Error> {
        let expiry = SessionExpiryHandler::new(session, prompt)
            .with_policy(settings.expiry_policy)
            .with_login_path(settings.login_path.clone());
        let factory = ClientFactory::new(expiry)
            .with_tls(settings.tls.clone())
            .with_notifier(notifier);
        Self::build(&factory, settings)
    }

    pub fn get(&self, backend: Backend) -> Option<&ApiClient> {
        match backend {
            Backend::Management => Some(&self.management),
            Backend::Gateway => Some(&self.gateway),
            Backend::Assessment => self.assessment.as_ref(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn settings() -> ConsoleSettings {
        ConsoleSettings::new(
            EndpointSettings::new(BackendAddress::new("https://console.example/api")),
            EndpointSettings::new(BackendAddress::new("https://console.example/gateway")),
        )
    }

    #[test]
    fn plain_address_resolves_as_is() {
        let url = BackendAddress::new("https://console.example/api").resolve().unwrap();
        assert_eq!(url.as_str(), "https://console.example/api");
    }

    #[test]
    fn relative_address_without_override_is_invalid() {
        let err = BackendAddress::new("/api").resolve().unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)), "got {err:?}");
    }

    #[test]
    fn origin_override_replaces_scheme_and_host() {
        let url = BackendAddress::new("http://localhost:8080/gateway/v2")
            .with_origin("gw.example:9443", Some("https".into()))
            .resolve()
            .unwrap();
        assert_eq!(url.as_str(), "https://gw.example:9443/gateway/v2");
    }

    #[test]
    fn origin_override_accepts_bare_path() {
        let url = BackendAddress::new("assessment")
            .with_origin("10.0.0.5:7000", Some("http".into()))
            .resolve()
            .unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:7000/assessment");

        let default_scheme = BackendAddress::new("/svc")
            .with_origin("svc.example", None)
            .resolve()
            .unwrap();
        assert_eq!(default_scheme.scheme(), DEFAULT_OVERRIDE_SCHEME);
    }

    #[test]
    fn management_rejects_origin_override() {
        let mut settings = settings();
        settings.management.address = settings
            .management
            .address
            .clone()
            .with_origin("elsewhere.example", None);
        let err = settings.client_config(Backend::Management).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }

    #[test]
    fn per_backend_timeout_and_normalizer() {
        let mut settings = settings();
        settings.timeout = Duration::from_secs(45);
        settings.gateway.timeout = Some(Duration::from_secs(120));

        let management = settings.client_config(Backend::Management).unwrap().unwrap();
        assert_eq!(management.timeout, Duration::from_secs(45));
        assert!(management.normalize_payload.rules().is_empty());

        let gateway = settings.client_config(Backend::Gateway).unwrap().unwrap();
        assert_eq!(gateway.timeout, Duration::from_secs(120));
        assert_eq!(gateway.normalize_payload.rules().len(), 3);

        assert!(settings.client_config(Backend::Assessment).unwrap().is_none());
    }

    #[test]
    fn connect_builds_each_configured_backend() {
        let mut settings = settings();
        settings.assessment = Some(EndpointSettings::new(
            BackendAddress::new("/assess").with_origin("assess.example", None),
        ));

        let backends = Backends::connect(
            &settings,
            Arc::new(SessionStore::in_memory()),
            Arc::new(crate::expiry::HeadlessPrompt),
            Arc::new(crate::notify::TracingNotifier),
        )
        .unwrap();

        assert_eq!(
            backends.get(Backend::Gateway).unwrap().base_url().as_str(),
            "https://console.example/gateway/"
        );
        assert_eq!(
            backends.get(Backend::Assessment).unwrap().base_url().as_str(),
            "https://assess.example/assess/"
        );
    }

    #[test]
    fn backend_names() {
        assert_eq!(Backend::Management.to_string(), "management");
        assert_eq!("gateway".parse::<Backend>().unwrap(), Backend::Gateway);
        assert!(!Backend::Management.supports_origin_override());
    }
}
