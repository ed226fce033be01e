//! HTTP delivery of analytics events.

use std::time::Duration;

use async_trait::async_trait;
use reading_progress_api_types::{
    ARTICLE_COMPLETION_PATH, ArticleCompletionRequest, IDEMPOTENCY_KEY_HEADER,
    READING_PROGRESS_PATH, ReadingProgressRequest,
};
use reqwest::{Client, Url, header::AUTHORIZATION};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::application::analytics::{AnalyticsClient, AnalyticsError};
use crate::domain::types::ArticleId;
use crate::infra::error::InfraError;

/// Posts events as JSON to `{endpoint}/reading-progress` and
/// `{endpoint}/article-completion`.
#[derive(Clone, Debug)]
pub struct HttpAnalyticsClient {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl HttpAnalyticsClient {
    pub fn new(
        endpoint: &Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let base = directory_url(endpoint);
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http(format!("failed to build analytics client: {err}")))?;
        Ok(Self {
            client,
            base,
            api_key,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("reading-progress/", env!("CARGO_PKG_VERSION"))
    }

    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, AnalyticsError> {
        self.base
            .join(path)
            .map_err(|err| AnalyticsError::Endpoint(err.to_string()))
    }

    async fn post<T: Serialize + Sync>(
        &self,
        path: &str,
        event_id: Uuid,
        body: &T,
    ) -> Result<(), AnalyticsError> {
        let url = self.url(path)?;
        let mut request = self
            .client
            .post(url)
            .header(IDEMPOTENCY_KEY_HEADER, event_id.to_string())
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|err| AnalyticsError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyticsError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%event_id, path, status = status.as_u16(), "Analytics event accepted");
        Ok(())
    }
}

/// Ensure relative joins land under the endpoint instead of replacing its last segment.
fn directory_url(endpoint: &Url) -> Url {
    let mut base = endpoint.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.set_fragment(None);
    base
}

#[async_trait]
impl AnalyticsClient for HttpAnalyticsClient {
    async fn track_reading_progress(
        &self,
        event_id: Uuid,
        article_id: &ArticleId,
        percent: f64,
        time_spent_seconds: u64,
    ) -> Result<(), AnalyticsError> {
        let body = ReadingProgressRequest {
            article_id: article_id.as_str().to_string(),
            percent,
            time_spent_seconds,
        };
        self.post(READING_PROGRESS_PATH, event_id, &body).await
    }

    async fn track_article_completion(
        &self,
        event_id: Uuid,
        article_id: &ArticleId,
        time_spent_seconds: u64,
        word_count: u64,
    ) -> Result<(), AnalyticsError> {
        let body = ArticleCompletionRequest {
            article_id: article_id.as_str().to_string(),
            time_spent_seconds,
            word_count,
        };
        self.post(ARTICLE_COMPLETION_PATH, event_id, &body).await
    }
}
