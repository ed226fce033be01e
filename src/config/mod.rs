//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::options::{
    DEFAULT_COMPLETION_THRESHOLD, DEFAULT_UPDATE_INTERVAL, DEFAULT_VISIBILITY_THRESHOLD,
};
use crate::domain::types::ContentSelector;
use crate::infra::analytics::DEFAULT_QUEUE_LIMIT;

mod cli;
#[cfg(test)]
mod tests;

pub use cli::{CliArgs, Command, ReplayArgs, ReplayOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "reading-progress";
const ENV_PREFIX: &str = "READING_PROGRESS";
const DEFAULT_BATCH_LIMIT: u64 = 32;
const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub tracker: TrackerSettings,
    pub analytics: AnalyticsSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Defaults applied to every tracker the process creates.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub content_selector: ContentSelector,
    pub tracking_enabled: bool,
    pub visibility_threshold: f64,
    pub completion_threshold: f64,
    pub update_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AnalyticsSettings {
    /// Base URL of the analytics endpoints; `None` logs events instead.
    pub endpoint: Option<Url>,
    pub api_key: Option<String>,
    pub queue_limit: NonZeroUsize,
    pub batch_limit: NonZeroUsize,
    pub flush_interval: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Replay(args) => raw.apply_replay_overrides(&args.overrides),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    tracker: RawTrackerSettings,
    analytics: RawAnalyticsSettings,
}

impl RawSettings {
    fn apply_replay_overrides(&mut self, overrides: &ReplayOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(endpoint) = overrides.analytics_endpoint.as_ref() {
            self.analytics.endpoint = Some(endpoint.clone());
        }
        if let Some(threshold) = overrides.completion_threshold {
            self.tracker.completion_threshold = Some(threshold);
        }
        if let Some(enabled) = overrides.tracking_enabled {
            self.tracker.tracking_enabled = Some(enabled);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        Ok(Self {
            logging: build_logging_settings(raw.logging)?,
            tracker: build_tracker_settings(raw.tracker)?,
            analytics: build_analytics_settings(raw.analytics)?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingSettings {
                level: LevelFilter::INFO,
                format: LogFormat::Compact,
            },
            tracker: TrackerSettings::default(),
            analytics: AnalyticsSettings::default(),
        }
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            content_selector: ContentSelector::default(),
            tracking_enabled: true,
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            queue_limit: NonZeroUsize::new(DEFAULT_QUEUE_LIMIT).unwrap_or(NonZeroUsize::MIN),
            batch_limit: NonZeroUsize::new(DEFAULT_BATCH_LIMIT as usize)
                .unwrap_or(NonZeroUsize::MIN),
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_tracker_settings(tracker: RawTrackerSettings) -> Result<TrackerSettings, LoadError> {
    let content_selector = match tracker.content_selector {
        Some(selector) => ContentSelector::new(selector)
            .map_err(|err| LoadError::invalid("tracker.content_selector", err.to_string()))?,
        None => ContentSelector::default(),
    };

    let visibility_threshold = tracker
        .visibility_threshold
        .unwrap_or(DEFAULT_VISIBILITY_THRESHOLD);
    if !(visibility_threshold > 0.0 && visibility_threshold <= 1.0) {
        return Err(LoadError::invalid(
            "tracker.visibility_threshold",
            "must be within (0, 1]",
        ));
    }

    let completion_threshold = tracker
        .completion_threshold
        .unwrap_or(DEFAULT_COMPLETION_THRESHOLD);
    if !(completion_threshold > 0.0 && completion_threshold <= 100.0) {
        return Err(LoadError::invalid(
            "tracker.completion_threshold",
            "must be within (0, 100]",
        ));
    }

    let update_interval = match tracker.update_interval_ms {
        Some(0) => {
            return Err(LoadError::invalid(
                "tracker.update_interval_ms",
                "must be greater than zero",
            ));
        }
        Some(ms) => Duration::from_millis(ms),
        None => DEFAULT_UPDATE_INTERVAL,
    };

    Ok(TrackerSettings {
        content_selector,
        tracking_enabled: tracker.tracking_enabled.unwrap_or(true),
        visibility_threshold,
        completion_threshold,
        update_interval,
    })
}

fn build_analytics_settings(
    analytics: RawAnalyticsSettings,
) -> Result<AnalyticsSettings, LoadError> {
    let endpoint = match non_blank(analytics.endpoint) {
        Some(value) => {
            let url = Url::parse(&value).map_err(|err| {
                LoadError::invalid("analytics.endpoint", format!("failed to parse: {err}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "analytics.endpoint",
                    "scheme must be http or https",
                ));
            }
            Some(url)
        }
        None => None,
    };

    let queue_limit = non_zero_usize(
        analytics.queue_limit.unwrap_or(DEFAULT_QUEUE_LIMIT as u64),
        "analytics.queue_limit",
    )?;
    let batch_limit = non_zero_usize(
        analytics.batch_limit.unwrap_or(DEFAULT_BATCH_LIMIT),
        "analytics.batch_limit",
    )?;
    let flush_interval = positive_millis(
        analytics.flush_interval_ms.unwrap_or(DEFAULT_FLUSH_INTERVAL_MS),
        "analytics.flush_interval_ms",
    )?;
    let request_timeout = positive_millis(
        analytics
            .request_timeout_ms
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        "analytics.request_timeout_ms",
    )?;

    Ok(AnalyticsSettings {
        endpoint,
        api_key: non_blank(analytics.api_key),
        queue_limit,
        batch_limit,
        flush_interval,
        request_timeout,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawTrackerSettings {
    content_selector: Option<String>,
    tracking_enabled: Option<bool>,
    visibility_threshold: Option<f64>,
    completion_threshold: Option<f64>,
    update_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawAnalyticsSettings {
    endpoint: Option<String>,
    api_key: Option<String>,
    queue_limit: Option<u64>,
    batch_limit: Option<u64>,
    flush_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn positive_millis(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(value))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
