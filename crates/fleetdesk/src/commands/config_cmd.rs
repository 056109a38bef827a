//! Config subcommand handlers.

use dialoguer::Input;
use tabled::Tabled;

use fleetdesk_api::Backend;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(key: impl Into<String>, value: impl ToString) -> SettingRow {
    SettingRow {
        key: key.into(),
        value: value.to_string(),
    }
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_owned()
}

fn rows(cfg: &Config) -> Vec<SettingRow> {
    let d = &cfg.defaults;
    let mut rows = vec![
        row("defaults.timeout", format!("{}s", d.timeout)),
        row("defaults.insecure", d.insecure),
        row("defaults.expiry_policy", d.expiry_policy),
        row("defaults.login_path", &d.login_path),
        row("defaults.state_dir", cfg.state_dir().display()),
        row("management.base_url", &cfg.management.base_url),
        row("gateway.base_url", &cfg.gateway.base_url),
        row("gateway.host", or_dash(cfg.gateway.host.as_deref())),
    ];
    match &cfg.assessment {
        Some(a) => {
            rows.push(row("assessment.base_url", &a.base_url));
            rows.push(row("assessment.host", or_dash(a.host.as_deref())));
        }
        None => rows.push(row("assessment", "(not configured)")),
    }
    rows
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config::config_path(global).display());
            Ok(())
        }

        ConfigCommand::Show { toml } => {
            let cfg = config::load(global)?;
            let out = if toml {
                config::to_toml(&cfg)?
            } else {
                output::render_table(&rows(&cfg))
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut cfg = Config::default();
            if !global.yes {
                eprintln!("fleetdesk configuration");
                eprintln!("   Config path: {}\n", path.display());
                cfg.management.base_url = Input::new()
                    .with_prompt(format!("{} base URL", Backend::Management))
                    .default(cfg.management.base_url)
                    .interact_text()
                    .map_err(prompt_err)?;
                cfg.gateway.base_url = Input::new()
                    .with_prompt(format!("{} base URL", Backend::Gateway))
                    .default(cfg.gateway.base_url)
                    .interact_text()
                    .map_err(prompt_err)?;
            }

            // Fail before writing anything unusable.
            cfg.to_console_settings()?;
            let written = config::save(global, &cfg)?;
            eprintln!("Config written to {}", written.display());
            Ok(())
        }
    }
}
