use std::{process, sync::Arc};

use reading_progress::{
    application::{analytics::AnalyticsClient, error::AppError, options::TrackerOptions},
    config::{self, ReplayArgs, Settings},
    domain::types::ArticleId,
    infra::{
        analytics::{HttpAnalyticsClient, LogAnalyticsClient},
        error::InfraError,
        replay::{ReplayScript, replay},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Replay(args) => run_replay(settings, args).await,
    }
}

async fn run_replay(settings: Settings, args: ReplayArgs) -> Result<(), AppError> {
    let script = ReplayScript::load(&args.file).await?;
    let article_id = ArticleId::parse(args.article_id.unwrap_or_else(|| script.article_id.clone()))?;
    let options = TrackerOptions::from_settings(article_id, &settings.tracker)
        .with_word_count(script.word_count);

    let client: Arc<dyn AnalyticsClient> = match settings.analytics.endpoint.as_ref() {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "Delivering analytics over HTTP");
            Arc::new(HttpAnalyticsClient::new(
                endpoint,
                settings.analytics.api_key.clone(),
                settings.analytics.request_timeout,
            )?)
        }
        None => {
            info!("No analytics endpoint configured; events are logged only");
            Arc::new(LogAnalyticsClient)
        }
    };

    let report = replay(&script, options, &settings.analytics, client).await?;
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| AppError::unexpected(format!("failed to render report: {err}")))?;
    println!("{rendered}");
    Ok(())
}
