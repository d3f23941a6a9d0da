//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Parser, Subcommand};

use crate::backend::{RecordKind, PAGE_SIZE};
use crate::output::Format;

/// Default backend base URL (same-host deployment on port 8000).
const DEFAULT_BACKEND: &str = "http://127.0.0.1:8000";

/// AI weather, warning, and earthquake broadcast monitoring from your terminal.
#[derive(Parser, Debug)]
#[command(name = "wxsentry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show backend status and AI configuration
    Status(StatusArgs),

    /// Show the current weather snapshot and AI bulletin
    Current(CurrentArgs),

    /// Trigger a manual broadcast, then re-read the committed snapshot
    Broadcast(BroadcastArgs),

    /// Browse historical records (forecasts, warnings, earthquakes)
    History(HistoryArgs),

    /// Ask the backend to regenerate one record's AI report
    ReReport(ReReportArgs),

    /// Poll the CWA open-data API directly, hourly, with AI bulletins
    Watch(WatchArgs),

    /// Start the local web dashboard
    Ui(UiArgs),
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Backend base URL
    #[arg(long, env = "WXSENTRY_BACKEND", default_value = DEFAULT_BACKEND)]
    pub backend: String,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `current` command.
#[derive(Parser, Debug)]
pub struct CurrentArgs {
    /// Backend base URL
    #[arg(long, env = "WXSENTRY_BACKEND", default_value = DEFAULT_BACKEND)]
    pub backend: String,

    /// Force the backend to regenerate the snapshot instead of reading
    /// its cache
    #[arg(long)]
    pub refresh: bool,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `broadcast` command.
#[derive(Parser, Debug)]
pub struct BroadcastArgs {
    /// Backend base URL
    #[arg(long, env = "WXSENTRY_BACKEND", default_value = DEFAULT_BACKEND)]
    pub backend: String,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `history` command.
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Record kind to browse
    #[arg(value_parser = parse_record_kind)]
    pub kind: RecordKind,

    /// Backend base URL
    #[arg(long, env = "WXSENTRY_BACKEND", default_value = DEFAULT_BACKEND)]
    pub backend: String,

    /// Page to fetch (zero-based)
    #[arg(long, short = 'p', default_value = "0")]
    pub page: usize,

    /// Rows per page
    #[arg(long, short = 'n', default_value_t = PAGE_SIZE)]
    pub limit: usize,

    /// Free-text filter
    #[arg(long, short = 'q')]
    pub query: Option<String>,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `re-report` command.
#[derive(Parser, Debug)]
pub struct ReReportArgs {
    /// Record kind (warnings or earthquakes)
    #[arg(value_parser = parse_record_kind)]
    pub kind: RecordKind,

    /// Record id to regenerate
    pub id: i64,

    /// Backend base URL
    #[arg(long, env = "WXSENTRY_BACKEND", default_value = DEFAULT_BACKEND)]
    pub backend: String,

    /// Skip the interactive confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// CWA open-data API key
    #[arg(long, env = "CWA_API_KEY", hide_env_values = true)]
    pub cwa_key: Option<String>,

    /// Gemini API key (generation degrades to raw data without it)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_key: Option<String>,

    /// Gemini model to use
    #[arg(long, default_value = "gemini-1.5-flash")]
    pub model: String,

    /// Run a single fetch-and-generate cycle, then exit
    #[arg(long)]
    pub once: bool,
}

/// Arguments for the `ui` command.
#[derive(Parser, Debug)]
pub struct UiArgs {
    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Backend base URL
    #[arg(long, env = "WXSENTRY_BACKEND", default_value = DEFAULT_BACKEND)]
    pub backend: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Parse a record kind from string.
fn parse_record_kind(s: &str) -> Result<RecordKind, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}
