use std::io::Write;

use serial_test::serial;
use tempfile::NamedTempFile;

use super::*;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

fn replay_cli(extra: &[&str]) -> CliArgs {
    let mut args = vec!["reading-progress", "replay"];
    args.extend_from_slice(extra);
    args.push("trace.toml");
    CliArgs::parse_from(args)
}

#[test]
fn defaults_match_tracker_defaults() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.tracker.visibility_threshold, 0.1);
    assert_eq!(settings.tracker.completion_threshold, 90.0);
    assert_eq!(settings.tracker.update_interval, Duration::from_secs(1));
    assert!(settings.tracker.tracking_enabled);
    assert!(settings.analytics.endpoint.is_none());
    assert_eq!(settings.analytics.queue_limit.get(), DEFAULT_QUEUE_LIMIT);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.tracker.completion_threshold = Some(80.0);

    let overrides = ReplayOverrides {
        log_level: Some("debug".to_string()),
        completion_threshold: Some(95.0),
        analytics_endpoint: Some("https://stats.example.com/api".to_string()),
        ..Default::default()
    };

    raw.apply_replay_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.tracker.completion_threshold, 95.0);
    assert_eq!(
        settings.analytics.endpoint.as_ref().map(Url::as_str),
        Some("https://stats.example.com/api")
    );
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_replay_overrides(&ReplayOverrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn rejects_out_of_range_thresholds() {
    let mut raw = RawSettings::default();
    raw.tracker.visibility_threshold = Some(1.5);
    let err = Settings::from_raw(raw).expect_err("visibility above one");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "tracker.visibility_threshold",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.tracker.completion_threshold = Some(0.0);
    let err = Settings::from_raw(raw).expect_err("zero completion");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "tracker.completion_threshold",
            ..
        }
    ));
}

#[test]
fn rejects_zero_intervals_and_limits() {
    let mut raw = RawSettings::default();
    raw.tracker.update_interval_ms = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.analytics.queue_limit = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero queue");
    assert_eq!(
        err.to_string(),
        "invalid configuration for `analytics.queue_limit`: must be greater than zero"
    );
}

#[test]
fn rejects_non_http_endpoint() {
    let mut raw = RawSettings::default();
    raw.analytics.endpoint = Some("ftp://stats.example.com".to_string());
    let err = Settings::from_raw(raw).expect_err("ftp endpoint");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "analytics.endpoint",
            ..
        }
    ));
}

#[test]
fn blank_endpoint_and_key_are_treated_as_absent() {
    let mut raw = RawSettings::default();
    raw.analytics.endpoint = Some("   ".to_string());
    raw.analytics.api_key = Some(String::new());
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(settings.analytics.endpoint.is_none());
    assert!(settings.analytics.api_key.is_none());
}

#[test]
fn parse_replay_arguments() {
    let args = CliArgs::parse_from([
        "reading-progress",
        "replay",
        "--article-id",
        "post-77",
        "--log-json",
        "true",
        "--analytics-endpoint",
        "http://localhost:9000",
        "trace.toml",
    ]);

    let Command::Replay(replay) = args.command;
    assert_eq!(replay.article_id.as_deref(), Some("post-77"));
    assert_eq!(replay.file, std::path::PathBuf::from("trace.toml"));
    assert_eq!(replay.overrides.log_json, Some(true));
    assert_eq!(
        replay.overrides.analytics_endpoint.as_deref(),
        Some("http://localhost:9000")
    );
}

#[test]
#[serial]
fn explicit_config_file_is_loaded() {
    let file = config_file(
        r#"
[tracker]
content_selector = ".post-body"
update_interval_ms = 250

[analytics]
endpoint = "https://stats.example.com"
batch_limit = 4
"#,
    );
    let mut cli = replay_cli(&[]);
    cli.config_file = Some(file.path().to_path_buf());

    let settings = load(&cli).expect("load settings");
    assert_eq!(settings.tracker.content_selector.as_str(), ".post-body");
    assert_eq!(settings.tracker.update_interval, Duration::from_millis(250));
    assert_eq!(settings.analytics.batch_limit.get(), 4);
}

#[test]
#[serial]
#[allow(unsafe_code)]
fn environment_overrides_file_and_cli_overrides_environment() {
    let file = config_file(
        r#"
[tracker]
completion_threshold = 70.0
"#,
    );

    unsafe {
        std::env::set_var("READING_PROGRESS__TRACKER__COMPLETION_THRESHOLD", "85");
        std::env::set_var("READING_PROGRESS__LOGGING__LEVEL", "warn");
    }

    let mut cli = replay_cli(&["--log-level", "trace"]);
    cli.config_file = Some(file.path().to_path_buf());
    let result = load(&cli);

    unsafe {
        std::env::remove_var("READING_PROGRESS__TRACKER__COMPLETION_THRESHOLD");
        std::env::remove_var("READING_PROGRESS__LOGGING__LEVEL");
    }

    let settings = result.expect("load settings");
    assert_eq!(settings.tracker.completion_threshold, 85.0);
    assert_eq!(settings.logging.level, LevelFilter::TRACE);
}

#[test]
#[serial]
fn missing_explicit_config_file_fails() {
    let mut cli = replay_cli(&[]);
    cli.config_file = Some(std::path::PathBuf::from("/nonexistent/reading-progress.toml"));

    assert!(matches!(load(&cli), Err(LoadError::Build(_))));
}
