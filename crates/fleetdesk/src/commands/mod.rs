//! Command dispatch: bridges CLI args to the backend clients and output.

pub mod config_cmd;
pub mod request;
pub mod session;

use std::sync::Arc;

use fleetdesk_api::{Backend, Backends, SessionStore};

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;
use crate::notify::ExitReportNotifier;
use crate::prompt::TerminalPrompt;

/// Dispatch a command that needs session state.
pub async fn dispatch(
    cmd: Command,
    cfg: &Config,
    session: Arc<SessionStore>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => session::login(args, &session),
        Command::Logout => {
            session::logout(&session);
            Ok(())
        }
        cmd => {
            let settings = cfg.to_console_settings()?;
            let backends = Backends::connect(
                &settings,
                session,
                Arc::new(TerminalPrompt::new(global.yes)),
                Arc::new(ExitReportNotifier),
            )?;

            let backend = Backend::from(global.backend);
            let client = backends
                .get(backend)
                .ok_or_else(|| CliError::BackendNotConfigured {
                    backend: backend.to_string(),
                })?;

            tracing::debug!(%backend, base_url = %client.base_url(), "dispatching request");
            request::handle(cmd, client, global).await
        }
    }
}
