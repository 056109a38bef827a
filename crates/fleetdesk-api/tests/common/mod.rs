// Shared wiremock harness for the façade integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;
use wiremock::MockServer;

use fleetdesk_api::{
    ApiClient, ClientConfig, ClientFactory, Error, ExpiryGate, ExpiryPolicy, Notifier,
    PayloadNormalizer, SessionExpiryHandler, SessionPrompt, SessionStore,
};

/// Records every notification message.
#[derive(Debug, Default)]
pub struct SpyNotifier {
    messages: Mutex<Vec<String>>,
}

impl SpyNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for SpyNotifier {
    fn notify(&self, error: &Error) {
        self.messages.lock().unwrap().push(error.to_string());
    }
}

/// Records confirmations and navigations.
#[derive(Debug, Default)]
pub struct RecordingPrompt {
    confirms: Mutex<usize>,
    navigations: Mutex<Vec<String>>,
}

impl RecordingPrompt {
    pub fn confirms(&self) -> usize {
        *self.confirms.lock().unwrap()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

impl SessionPrompt for RecordingPrompt {
    fn confirm_expired(&self, _message: &str) {
        *self.confirms.lock().unwrap() += 1;
    }

    fn navigate_to_login(&self, login_path: &str) {
        self.navigations.lock().unwrap().push(login_path.to_owned());
    }
}

pub struct Harness {
    pub server: MockServer,
    pub session: Arc<SessionStore>,
    pub notifier: Arc<SpyNotifier>,
    pub prompt: Arc<RecordingPrompt>,
    pub factory: ClientFactory,
}

impl Harness {
    /// Mock server plus a factory on a private expiry gate.
    pub async fn start(policy: ExpiryPolicy) -> Self {
        Self::with_session(policy, SessionStore::in_memory()).await
    }

    /// Same as [`Harness::start`] over an existing session store.
    pub async fn with_session(policy: ExpiryPolicy, session: SessionStore) -> Self {
        let server = MockServer::start().await;
        let session = Arc::new(session);
        let notifier = Arc::new(SpyNotifier::default());
        let prompt = Arc::new(RecordingPrompt::default());
        let expiry = SessionExpiryHandler::new(session.clone(), prompt.clone())
            .with_gate(Arc::new(ExpiryGate::new()))
            .with_policy(policy);
        let factory = ClientFactory::new(expiry).with_notifier(notifier.clone());
        Self {
            server,
            session,
            notifier,
            prompt,
            factory,
        }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("{}/api", self.server.uri())).unwrap()
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url()).timeout(Duration::from_secs(5))
    }

    /// Client with the legacy payload rules.
    pub fn legacy_client(&self) -> ApiClient {
        self.factory
            .build(self.config().normalize_payload(PayloadNormalizer::legacy()))
            .unwrap()
    }

    pub fn client(&self, config: ClientConfig) -> ApiClient {
        self.factory.build(config).unwrap()
    }
}
