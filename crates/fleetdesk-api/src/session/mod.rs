// Session persistence
//
// The auth token lives in three tiers for compatibility between older and
// newer consumers: a durable tier, a generic durable tier, and a
// session-scoped tier. Reads walk the tiers in that order; writes and
// clears touch all of them. Cached console data lives in the generic tier.

pub mod store;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

pub use store::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StoreError};

/// Storage tiers in read-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Tier {
    Durable,
    Shared,
    Session,
}

impl Tier {
    /// Key the token is stored under in this tier.
    pub fn token_key(self) -> &'static str {
        match self {
            Self::Durable => "access_token",
            Self::Shared | Self::Session => "token",
        }
    }
}

/// Console data cached alongside the token and dropped with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CacheKey {
    UserProfile,
    MenuTree,
    Permissions,
}

impl CacheKey {
    fn key(self) -> &'static str {
        match self {
            Self::UserProfile => "user_profile",
            Self::MenuTree => "menu_tree",
            Self::Permissions => "permissions",
        }
    }
}

const LOGIN_ARRIVAL_KEY: &str = "login_arrived_at";

/// Keyring service the durable tier is stored under.
pub const KEYRING_SERVICE: &str = "fleetdesk";

/// Token and cached session data across all storage tiers.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tiers: [(Tier, Arc<dyn KeyValueStore>); 3],
}

impl SessionStore {
    pub fn new(
        durable: Arc<dyn KeyValueStore>,
        shared: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            tiers: [
                (Tier::Durable, durable),
                (Tier::Shared, shared),
                (Tier::Session, session),
            ],
        }
    }

    /// All three tiers in memory. Nothing survives the process.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        )
    }

    /// Durable tier in the system keyring, the other two as owner-only
    /// files under `dir`. A command-line session spans processes, so the
    /// session-scoped tier is file-backed as well.
    pub fn open(dir: &Path) -> Self {
        Self::new(
            Arc::new(KeyringStore::new(KEYRING_SERVICE, dir.display().to_string())),
            Arc::new(FileStore::new(dir.join("shared.json"))),
            Arc::new(FileStore::new(dir.join("session.json"))),
        )
    }

    fn tier(&self, tier: Tier) -> &dyn KeyValueStore {
        let index = match tier {
            Tier::Durable => 0,
            Tier::Shared => 1,
            Tier::Session => 2,
        };
        self.tiers[index].1.as_ref()
    }

    // ── Token ────────────────────────────────────────────────────────

    /// The first non-empty token in priority order. Tier read failures are
    /// logged and skipped.
    pub fn token(&self) -> Option<SecretString> {
        for (tier, store) in &self.tiers {
            match store.get(tier.token_key()) {
                Ok(Some(token)) if !token.is_empty() => return Some(SecretString::from(token)),
                Ok(_) => {}
                Err(e) => debug!(%tier, error = %e, "token tier unreadable, trying next"),
            }
        }
        None
    }

    /// Store a token in every tier, replacing any previous one.
    ///
    /// Every tier is attempted even when an earlier one fails; the first
    /// failure is returned afterwards.
    pub fn set_token(&self, token: &SecretString) -> Result<(), StoreError> {
        let mut first_error = None;
        for (tier, store) in &self.tiers {
            if let Err(e) = store.set(tier.token_key(), token.expose_secret()) {
                warn!(%tier, error = %e, "failed to store token tier");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                debug!("session token stored");
                Ok(())
            }
        }
    }

    /// Remove the token from every tier. Best effort.
    pub fn clear_token(&self) {
        for (tier, store) in &self.tiers {
            if let Err(e) = store.remove(tier.token_key()) {
                warn!(%tier, error = %e, "failed to clear token tier");
            }
        }
    }

    // ── Cached console data ──────────────────────────────────────────

    pub fn cache(&self, key: CacheKey, value: &Value) -> Result<(), StoreError> {
        self.tier(Tier::Shared).set(key.key(), &value.to_string())
    }

    pub fn cached(&self, key: CacheKey) -> Option<Value> {
        let raw = self.tier(Tier::Shared).get(key.key()).ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }

    /// Drop the token and every cached profile/menu/permission entry.
    pub fn clear_session(&self) {
        self.clear_token();
        for key in [CacheKey::UserProfile, CacheKey::MenuTree, CacheKey::Permissions] {
            if let Err(e) = self.tier(Tier::Shared).remove(key.key()) {
                warn!(%key, error = %e, "failed to clear cached session data");
            }
        }
        debug!("session cleared");
    }

    // ── Login arrival marker ─────────────────────────────────────────

    /// Record that the login entry point was just reached.
    pub fn mark_login_arrival(&self) {
        let now = Utc::now().timestamp_millis().to_string();
        if let Err(e) = self.tier(Tier::Session).set(LOGIN_ARRIVAL_KEY, &now) {
            warn!(error = %e, "failed to record login arrival");
        }
    }

    pub fn login_arrival(&self) -> Option<DateTime<Utc>> {
        let raw = self.tier(Tier::Session).get(LOGIN_ARRIVAL_KEY).ok().flatten()?;
        let millis: i64 = raw.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}
