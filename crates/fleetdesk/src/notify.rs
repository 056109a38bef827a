//! Failure notification for one-shot commands.

use tracing::debug;

use fleetdesk_api::{Error, Notifier};

/// Leaves the user-facing message to the report `main` prints on exit, so
/// each failure is shown once. The notification itself only reaches the
/// debug log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExitReportNotifier;

impl Notifier for ExitReportNotifier {
    fn notify(&self, error: &Error) {
        let kind = error.kind().map(|k| k.to_string());
        debug!(kind = kind.as_deref().unwrap_or("local"), "{error}");
    }
}
