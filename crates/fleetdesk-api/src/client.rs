// Backend client factory and request façade
//
// One `ApiClient` per backend. Each carries exactly one request interceptor
// (bearer credential injection) and one response interceptor (envelope
// normalization on success, classification + notification + session expiry
// on failure). Callers only ever see canonical values or classified errors.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::classify::{Failure, TransportFault, classify};
use crate::envelope::{EnvelopeNormalizer, Outcome, SUCCESS_CODES};
use crate::error::Error;
use crate::expiry::{EpisodeTicket, SessionExpiryHandler};
use crate::notify::{FailureHook, Notifier, TracingNotifier};
use crate::payload::PayloadNormalizer;
use crate::session::SessionStore;
use crate::transport::{DEFAULT_TIMEOUT, TlsMode, http_client};

// ── Configuration ────────────────────────────────────────────────────

/// Options for one backend client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Root every request path is joined onto.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Reshapes the envelope's `data` on success.
    pub normalize_payload: PayloadNormalizer,
    /// Merge object payloads over the envelope.
    pub flatten_object_payload: bool,
    /// Envelope codes treated as success.
    pub success_codes: Vec<i64>,
    /// Called once for every classified failure.
    pub on_failure: Option<FailureHook>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("normalize_payload", &self.normalize_payload)
            .field("flatten_object_payload", &self.flatten_object_payload)
            .field("success_codes", &self.success_codes)
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            normalize_payload: PayloadNormalizer::identity(),
            flatten_object_payload: true,
            success_codes: SUCCESS_CODES.to_vec(),
            on_failure: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn normalize_payload(mut self, normalizer: PayloadNormalizer) -> Self {
        self.normalize_payload = normalizer;
        self
    }

    pub fn flatten_object_payload(mut self, flatten: bool) -> Self {
        self.flatten_object_payload = flatten;
        self
    }

    pub fn success_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.success_codes = codes.into_iter().collect();
        self
    }

    pub fn on_failure(mut self, hook: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Arc::new(hook));
        self
    }
}

/// Empty query string for verbs that take parameters.
pub const NO_PARAMS: &[(&str, &str)] = &[];

/// How `file()` delivers its parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FileMethod {
    /// Query string.
    #[default]
    Get,
    /// JSON request body, for filters too large for a URL.
    Post,
}

// ── Factory ──────────────────────────────────────────────────────────

/// Builds backend clients that share the session store, the expiry
/// handler, and the notification sink.
#[derive(Clone)]
pub struct ClientFactory {
    session: Arc<SessionStore>,
    expiry: Arc<SessionExpiryHandler>,
    notifier: Arc<dyn Notifier>,
    tls: TlsMode,
}

impl ClientFactory {
    pub fn new(expiry: SessionExpiryHandler) -> Self {
        Self {
            session: Arc::clone(expiry.session()),
            expiry: Arc::new(expiry),
            notifier: Arc::new(TracingNotifier),
            tls: TlsMode::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Build one client bound to `config.base_url`.
    pub fn build(&self, config: ClientConfig) -> Result<ApiClient, Error> {
        let http = http_client(&self.tls, config.timeout)?;
        Ok(ApiClient {
            http,
            base_url: normalize_base_url(config.base_url),
            auth: AuthInjector {
                session: Arc::clone(&self.session),
            },
            responses: ResponseInterceptor {
                envelope: EnvelopeNormalizer::new(
                    config.normalize_payload,
                    config.flatten_object_payload,
                )
                .with_success_codes(config.success_codes),
                expiry: Arc::clone(&self.expiry),
                notifier: Arc::clone(&self.notifier),
                on_failure: config.on_failure,
            },
        })
    }
}

/// Ensure the base path ends with `/` so relative joins append.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

// ── Interceptors ─────────────────────────────────────────────────────

/// Request interceptor: attaches the bearer credential, nothing else.
#[derive(Clone)]
struct AuthInjector {
    session: Arc<SessionStore>,
}

impl AuthInjector {
    /// A stored token that cannot form a header value is treated as absent.
    fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token().and_then(|token| bearer_value(&token)) {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }
}

fn bearer_value(token: &SecretString) -> Option<HeaderValue> {
    match HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())) {
        Ok(mut value) => {
            value.set_sensitive(true);
            Some(value)
        }
        Err(_) => {
            warn!("stored session token is not a valid header value, sending without credential");
            None
        }
    }
}

/// Request context the response interceptor needs.
struct Exchange {
    url: String,
    ticket: EpisodeTicket,
}

/// Response interceptor: normalizer on success, classifier on failure.
#[derive(Clone)]
struct ResponseInterceptor {
    envelope: EnvelopeNormalizer,
    expiry: Arc<SessionExpiryHandler>,
    notifier: Arc<dyn Notifier>,
    on_failure: Option<FailureHook>,
}

impl ResponseInterceptor {
    /// Classify, then surface the failure exactly once. 401s are surfaced
    /// by the expiry recovery instead of the notifier.
    fn reject(&self, failure: Failure, exchange: &Exchange) -> Error {
        let error = classify(failure, &exchange.url);
        if error.is_unauthorized() {
            self.expiry.handle_unauthorized(exchange.ticket);
        } else {
            self.notifier.notify(&error);
        }
        if let Some(hook) = &self.on_failure {
            hook(&error);
        }
        error
    }

    async fn read_envelope(
        &self,
        resp: reqwest::Response,
        exchange: &Exchange,
    ) -> Result<Value, Error> {
        let body = resp
            .bytes()
            .await
            .map_err(|e| self.reject(Failure::Transport(TransportFault::from(&e)), exchange))?;

        match self.envelope.normalize(parse_body(&body)) {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure { code, message } => {
                Err(self.reject(Failure::Business { code, message }, exchange))
            }
        }
    }
}

/// JSON when it parses, the raw text otherwise, `null` when empty.
fn parse_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
    T::deserialize(value).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: value.to_string(),
    })
}

// ── Client ───────────────────────────────────────────────────────────

/// Request façade for one backend.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    auth: AuthInjector,
    responses: ResponseInterceptor,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join a relative path (leading `/` ignored) onto the base URL.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send one request through both interceptors. HTTP error statuses are
    /// rejected here; the caller reads a successful body.
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        attach: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<(reqwest::Response, Exchange), Error> {
        let url = self.url(path)?;
        debug!("{method} {url}");

        let exchange = Exchange {
            url: url.to_string(),
            ticket: self.responses.expiry.ticket(),
        };
        let builder = attach(self.auth.apply(self.http.request(method, url)));

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) if e.is_builder() => return Err(Error::InvalidRequest(e.to_string())),
            Err(e) => {
                return Err(self
                    .responses
                    .reject(Failure::Transport(TransportFault::from(&e)), &exchange));
            }
        };

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(self.responses.reject(Failure::from_status(status), &exchange));
        }
        Ok((resp, exchange))
    }

    async fn request_value(
        &self,
        method: Method,
        path: &str,
        attach: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Value, Error> {
        let (resp, exchange) = self.dispatch(method, path, attach).await?;
        self.responses.read_envelope(resp, &exchange).await
    }

    // ── Verbs ────────────────────────────────────────────────────────

    /// GET with `params` as the query string.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &(impl Serialize + ?Sized + Sync),
    ) -> Result<T, Error> {
        let value = self
            .request_value(Method::GET, path, |b| b.query(params))
            .await?;
        decode(&value)
    }

    /// POST with a JSON body.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + ?Sized + Sync),
    ) -> Result<T, Error> {
        let value = self
            .request_value(Method::POST, path, |b| b.json(body))
            .await?;
        decode(&value)
    }

    /// PUT with a JSON body.
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + ?Sized + Sync),
    ) -> Result<T, Error> {
        let value = self
            .request_value(Method::PUT, path, |b| b.json(body))
            .await?;
        decode(&value)
    }

    /// DELETE with `params` as the query string.
    pub async fn del<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &(impl Serialize + ?Sized + Sync),
    ) -> Result<T, Error> {
        let value = self
            .request_value(Method::DELETE, path, |b| b.query(params))
            .await?;
        decode(&value)
    }

    /// Download a binary payload. The body is returned as-is whatever its
    /// content type; only HTTP and transport failures are classified.
    pub async fn file(
        &self,
        path: &str,
        params: &(impl Serialize + ?Sized + Sync),
        method: FileMethod,
    ) -> Result<Bytes, Error> {
        let (resp, exchange) = match method {
            FileMethod::Get => self.dispatch(Method::GET, path, |b| b.query(params)).await?,
            FileMethod::Post => self.dispatch(Method::POST, path, |b| b.json(params)).await?,
        };
        resp.bytes().await.map_err(|e| {
            self.responses
                .reject(Failure::Transport(TransportFault::from(&e)), &exchange)
        })
    }

    /// Multipart POST. The acknowledgement goes through the envelope
    /// pipeline like any other response.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, Error> {
        let value = self
            .request_value(Method::POST, path, |b| b.multipart(form))
            .await?;
        decode(&value)
    }
}
