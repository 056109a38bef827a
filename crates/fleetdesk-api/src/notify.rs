// User-visible failure notifications

use std::sync::Arc;

use tracing::warn;

use crate::error::Error;

/// Sink for the single user-visible notification emitted per failure.
pub trait Notifier: Send + Sync {
    fn notify(&self, error: &Error);
}

/// Default sink: the user-facing message at `warn` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, error: &Error) {
        let kind = error.kind().map(|k| k.to_string());
        warn!(kind = kind.as_deref().unwrap_or("local"), "{error}");
    }
}

/// Per-client callback invoked once for every classified failure.
pub type FailureHook = Arc<dyn Fn(&Error) + Send + Sync>;
