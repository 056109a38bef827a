// Session expiry handling
//
// A 401 means no caller-level retry can succeed, so the first one of an
// episode runs a global recovery: confirm with the user (unless they just
// landed on the login entry point), drop the session, and navigate to login.
// Later 401s of the same episode are observed but do nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::session::SessionStore;

/// Message shown by the confirmation prompt.
pub const EXPIRED_MESSAGE: &str = "session expired, please log in again";

/// Default login entry point.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// A login arrival younger than this skips the confirmation under
/// [`ExpiryPolicy::FastRedirect`].
pub const FAST_REDIRECT_WINDOW: Duration = Duration::from_secs(1);

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ExpiryPolicy {
    /// Navigate without confirming when the user just arrived at login.
    FastRedirect,
    /// Always confirm once before navigating.
    #[default]
    ConfirmRedirect,
}

// ── Episode gate ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    Idle,
    PromptShown,
}

/// Episode a request was sent in. Captured before the request goes out so
/// a 401 arriving after that episode's recovery is recognized as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeTicket(u64);

/// Two-state gate shared by every client in the process.
///
/// Packed into one atomic: the low bit is the state (`1` = prompt shown),
/// the remaining bits count completed episodes.
#[derive(Debug, Default)]
pub struct ExpiryGate {
    state: AtomicU64,
}

static GLOBAL_GATE: LazyLock<Arc<ExpiryGate>> = LazyLock::new(|| Arc::new(ExpiryGate::new()));

impl ExpiryGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide gate.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_GATE)
    }

    pub fn ticket(&self) -> EpisodeTicket {
        EpisodeTicket(self.state.load(Ordering::Acquire) >> 1)
    }

    pub fn state(&self) -> EpisodeState {
        if self.state.load(Ordering::Acquire) & 1 == 1 {
            EpisodeState::PromptShown
        } else {
            EpisodeState::Idle
        }
    }

    /// `Idle → PromptShown` for the ticket's episode. Fails if a prompt is
    /// already shown or the episode has since been closed.
    pub fn try_open(&self, ticket: EpisodeTicket) -> bool {
        let idle = ticket.0 << 1;
        self.state
            .compare_exchange(idle, idle | 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// `PromptShown → Idle`, closing the episode. No-op when idle.
    pub fn reset(&self) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                (v & 1 == 1).then_some(v + 1)
            });
    }
}

// ── Recovery ─────────────────────────────────────────────────────────

/// User-facing side of the recovery action.
pub trait SessionPrompt: Send + Sync {
    /// Show the blocking "session expired" confirmation. Returns once the
    /// user acknowledged or the prompt was dismissed.
    fn confirm_expired(&self, message: &str);

    /// Leave for the login entry point.
    fn navigate_to_login(&self, login_path: &str);
}

/// Prompt for non-interactive consumers: logs instead of asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessPrompt;

impl SessionPrompt for HeadlessPrompt {
    fn confirm_expired(&self, message: &str) {
        info!("{message}");
    }

    fn navigate_to_login(&self, login_path: &str) {
        info!(login_path, "login required");
    }
}

/// Runs the recovery action at most once per expiry episode.
#[derive(Clone)]
pub struct SessionExpiryHandler {
    gate: Arc<ExpiryGate>,
    policy: ExpiryPolicy,
    login_path: String,
    session: Arc<SessionStore>,
    prompt: Arc<dyn SessionPrompt>,
}

impl std::fmt::Debug for SessionExpiryHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionExpiryHandler")
            .field("gate", &self.gate)
            .field("policy", &self.policy)
            .field("login_path", &self.login_path)
            .finish_non_exhaustive()
    }
}

impl SessionExpiryHandler {
    /// Handler on the process-wide gate with the default policy.
    pub fn new(session: Arc<SessionStore>, prompt: Arc<dyn SessionPrompt>) -> Self {
        Self {
            gate: ExpiryGate::global(),
            policy: ExpiryPolicy::default(),
            login_path: DEFAULT_LOGIN_PATH.into(),
            session,
            prompt,
        }
    }

    pub fn with_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    /// Use a private gate instead of the process-wide one.
    pub fn with_gate(mut self, gate: Arc<ExpiryGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn gate(&self) -> &ExpiryGate {
        &self.gate
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn ticket(&self) -> EpisodeTicket {
        self.gate.ticket()
    }

    /// React to an Unauthorized classification. Returns `true` if this call
    /// ran the recovery action.
    pub fn handle_unauthorized(&self, ticket: EpisodeTicket) -> bool {
        if !self.gate.try_open(ticket) {
            debug!("session expiry already handled for this episode");
            return false;
        }

        info!(policy = %self.policy, "session expired, starting recovery");
        if self.just_arrived_at_login() {
            debug!("login arrival is recent, skipping confirmation");
        } else {
            self.prompt.confirm_expired(EXPIRED_MESSAGE);
        }

        self.session.clear_session();
        self.prompt.navigate_to_login(&self.login_path);
        self.gate.reset();
        true
    }

    fn just_arrived_at_login(&self) -> bool {
        if self.policy != ExpiryPolicy::FastRedirect {
            return false;
        }
        let Some(arrived) = self.session.login_arrival() else {
            return false;
        };
        // A marker from the future counts as recent.
        match (chrono::Utc::now() - arrived).to_std() {
            Ok(age) => age < FAST_REDIRECT_WINDOW,
            Err(_) => true,
        }
    }
}
