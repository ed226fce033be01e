use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::application::analytics::{AnalyticsClient, AnalyticsError};
use crate::domain::types::ArticleId;

/// Client used when no analytics endpoint is configured: events are only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAnalyticsClient;

#[async_trait]
impl AnalyticsClient for LogAnalyticsClient {
    async fn track_reading_progress(
        &self,
        event_id: Uuid,
        article_id: &ArticleId,
        percent: f64,
        time_spent_seconds: u64,
    ) -> Result<(), AnalyticsError> {
        info!(
            %event_id,
            %article_id,
            percent,
            time_spent_seconds,
            "Reading progress"
        );
        Ok(())
    }

    async fn track_article_completion(
        &self,
        event_id: Uuid,
        article_id: &ArticleId,
        time_spent_seconds: u64,
        word_count: u64,
    ) -> Result<(), AnalyticsError> {
        info!(
            %event_id,
            %article_id,
            time_spent_seconds,
            word_count,
            "Article completed"
        );
        Ok(())
    }
}
