//! Login / logout handlers.

use dialoguer::Password;
use secrecy::SecretString;
use tracing::info;

use fleetdesk_api::SessionStore;

use crate::cli::LoginArgs;
use crate::error::CliError;

pub fn login(args: LoginArgs, session: &SessionStore) -> Result<(), CliError> {
    let token = match args.token {
        Some(token) => token,
        None => Password::new()
            .with_prompt("Token")
            .interact()
            .map_err(|e| CliError::Validation {
                field: "token".into(),
                reason: format!("prompt failed: {e}"),
            })?,
    };
    let token = token.trim();
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "token cannot be empty".into(),
        });
    }

    // Any tier holding the token is enough to log in.
    if let Err(e) = session.set_token(&SecretString::from(token.to_owned())) {
        if session.token().is_none() {
            return Err(e.into());
        }
        info!(error = %e, "token not stored in every tier");
    }
    session.mark_login_arrival();
    info!("token stored");
    eprintln!("Logged in.");
    Ok(())
}

pub fn logout(session: &SessionStore) {
    session.clear_session();
    eprintln!("Logged out.");
}
