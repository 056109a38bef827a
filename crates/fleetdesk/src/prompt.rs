//! Terminal implementation of the session expiry prompt.

use std::io::{self, IsTerminal};

use dialoguer::Confirm;
use tracing::debug;

use fleetdesk_api::SessionPrompt;

/// Confirms through dialoguer when attached to a terminal, otherwise
/// writes the notice to stderr. Either way this is the only place an
/// expired session is announced.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompt {
    interactive: bool,
}

impl TerminalPrompt {
    /// `assume_yes` disables the interactive confirmation.
    pub fn new(assume_yes: bool) -> Self {
        Self {
            interactive: !assume_yes && io::stdin().is_terminal() && io::stderr().is_terminal(),
        }
    }
}

impl SessionPrompt for TerminalPrompt {
    fn confirm_expired(&self, message: &str) {
        if !self.interactive {
            eprintln!("{message}");
            return;
        }
        // Single-choice acknowledgement; the answer does not change the outcome.
        if let Err(e) = Confirm::new()
            .with_prompt(format!("{message}. Log in again?"))
            .default(true)
            .show_default(false)
            .interact()
        {
            debug!(error = %e, "confirmation prompt failed");
        }
    }

    fn navigate_to_login(&self, login_path: &str) {
        eprintln!(
            "Sign in again with: fleetdesk login --token <TOKEN>  (console login page: {login_path})"
        );
    }
}
