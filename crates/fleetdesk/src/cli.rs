//! Clap derive structures for the `fleetdesk` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use fleetdesk_api::{Backend, FileMethod};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fleetdesk -- talk to the console backends from the command line
#[derive(Debug, Parser)]
#[command(
    name = "fleetdesk",
    version,
    about = "Call the fleetdesk IoT console backends from the command line",
    long_about = "Sends requests to the management, gateway, or assessment backend\n\
        through the same client layer the console uses: bearer credentials are\n\
        attached, response envelopes are normalized, and failures are reported\n\
        with a classified message.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "FLEETDESK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Backend to send the request to
    #[arg(
        long,
        short = 'b',
        env = "FLEETDESK_BACKEND",
        default_value = "management",
        global = true
    )]
    pub backend: BackendArg,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FLEETDESK_OUTPUT",
        default_value = "json",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Never prompt; session expiry is reported without confirmation
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "FLEETDESK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, env = "FLEETDESK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Value enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Primary management API
    Management,
    /// Device-protocol gateway
    Gateway,
    /// Assessment service
    Assessment,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Management => Self::Management,
            BackendArg::Gateway => Self::Gateway,
            BackendArg::Assessment => Self::Assessment,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum FileMethodArg {
    #[default]
    Get,
    Post,
}

impl From<FileMethodArg> for FileMethod {
    fn from(arg: FileMethodArg) -> Self {
        match arg {
            FileMethodArg::Get => Self::Get,
            FileMethodArg::Post => Self::Post,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// GET a resource
    Get(QueryArgs),

    /// POST a JSON body
    Post(BodyArgs),

    /// PUT a JSON body
    Put(BodyArgs),

    /// DELETE a resource
    #[command(alias = "del")]
    Delete(QueryArgs),

    /// Download a file (raw bytes, no envelope handling)
    #[command(alias = "dl")]
    Download(DownloadArgs),

    /// Upload a file as multipart form data
    Upload(UploadArgs),

    /// Store a bearer token for subsequent requests
    Login(LoginArgs),

    /// Clear the stored token and cached console data
    Logout,

    /// Manage configuration
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Request arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Path relative to the backend base URL
    pub path: String,

    /// Query parameter (repeatable)
    #[arg(long = "param", short = 'P', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct BodyArgs {
    /// Path relative to the backend base URL
    pub path: String,

    /// Inline JSON body
    #[arg(long, short = 'd', conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Read the JSON body from a file
    #[arg(long, value_name = "PATH")]
    pub data_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Path relative to the backend base URL
    pub path: String,

    /// Request method
    #[arg(long, short = 'm', default_value = "get")]
    pub method: FileMethodArg,

    /// Parameter (query string for GET, JSON body for POST; repeatable)
    #[arg(long = "param", short = 'P', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Write to this file instead of stdout
    #[arg(long = "out", short = 'O', value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Path relative to the backend base URL
    pub path: String,

    /// File to upload
    #[arg(long, short = 'f', value_name = "PATH")]
    pub file: PathBuf,

    /// Form field name for the file part
    #[arg(long, default_value = "file")]
    pub field: String,

    /// Extra text field (repeatable)
    #[arg(long = "form", short = 'F', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub form: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Bearer token (prompted for when omitted)
    #[arg(long, env = "FLEETDESK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show {
        /// Print as TOML instead of a table
        #[arg(long)]
        toml: bool,
    },

    /// Print the config file path
    Path,

    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}
