use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the reading-progress binary.
#[derive(Debug, Parser)]
#[command(
    name = "reading-progress",
    version,
    about = "Reading progress tracker tooling"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "READING_PROGRESS_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Replay a recorded reading trace and print the resulting report.
    Replay(ReplayArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub overrides: ReplayOverrides,

    /// Article id to report under instead of the one in the trace.
    #[arg(long = "article-id", value_name = "ID")]
    pub article_id: Option<String>,

    /// TOML reading trace to replay.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ReplayOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Deliver analytics to this endpoint instead of logging them.
    #[arg(long = "analytics-endpoint", value_name = "URL")]
    pub analytics_endpoint: Option<String>,

    /// Override the scroll percent at which a read counts as finished.
    #[arg(long = "completion-threshold", value_name = "PERCENT")]
    pub completion_threshold: Option<f64>,

    /// Toggle analytics publishing.
    #[arg(
        long = "tracking-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub tracking_enabled: Option<bool>,
}
