// fleetdesk-api: resilient HTTP client layer for the fleetdesk console
//
// One façade per backend service. Success envelopes are normalized into
// canonical values, failures are classified into a small taxonomy, and an
// expired session triggers a single recovery action per episode.

pub mod backends;
pub mod classify;
pub mod client;
pub mod envelope;
pub mod error;
pub mod expiry;
pub mod notify;
pub mod payload;
pub mod session;
pub mod transport;

pub use backends::{
    Backend, BackendAddress, Backends, ConsoleSettings, EndpointSettings, OriginOverride,
};
pub use client::{ApiClient, ClientConfig, ClientFactory, FileMethod, NO_PARAMS};
pub use envelope::{BusinessCode, EnvelopeNormalizer, Outcome, SUCCESS_CODES};
pub use error::{Error, ErrorKind};
pub use expiry::{
    EpisodeState, EpisodeTicket, ExpiryGate, ExpiryPolicy, HeadlessPrompt, SessionExpiryHandler,
    SessionPrompt,
};
pub use notify::{FailureHook, Notifier, TracingNotifier};
pub use payload::{Page, PayloadNormalizer, PayloadRule};
pub use session::{CacheKey, KeyValueStore, KeyringStore, SessionStore};
pub use transport::{DEFAULT_TIMEOUT, TlsMode};

pub use reqwest::multipart;
