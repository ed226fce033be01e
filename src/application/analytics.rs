//! Analytics collaborator ports.
//!
//! The tracker only ever *publishes* events through [`AnalyticsSink`]; the
//! call must not block and cannot fail. Delivery to the analytics backend
//! happens elsewhere through an [`AnalyticsClient`], whose errors stay on
//! that side of the boundary.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::ArticleId;

/// Events the tracker forwards to analytics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    ReadingProgress {
        article_id: ArticleId,
        percent: f64,
        time_spent_seconds: u64,
    },
    ArticleCompletion {
        article_id: ArticleId,
        time_spent_seconds: u64,
        word_count: u64,
    },
}

impl AnalyticsEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyticsEvent::ReadingProgress { .. } => "reading_progress",
            AnalyticsEvent::ArticleCompletion { .. } => "article_completion",
        }
    }

    pub fn article_id(&self) -> &ArticleId {
        match self {
            AnalyticsEvent::ReadingProgress { article_id, .. }
            | AnalyticsEvent::ArticleCompletion { article_id, .. } => article_id,
        }
    }
}

/// An event with the identity it is delivered under.
#[derive(Debug, Clone)]
pub struct AnalyticsEnvelope {
    /// Idempotency key sent with the delivery (UUIDv4).
    pub id: Uuid,
    pub event: AnalyticsEvent,
    pub enqueued_at: OffsetDateTime,
}

impl AnalyticsEnvelope {
    pub fn new(event: AnalyticsEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            enqueued_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Non-blocking, fire-and-forget publish side used by the tracker.
pub trait AnalyticsSink: Send + Sync {
    fn publish(&self, event: AnalyticsEvent);

    /// Hint that pending events should be delivered now (page unload).
    fn flush(&self) {}
}

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("analytics transport failed: {0}")]
    Transport(String),
    #[error("analytics endpoint rejected event with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid analytics endpoint: {0}")]
    Endpoint(String),
}

/// Delivery side of the analytics collaborator.
#[async_trait]
pub trait AnalyticsClient: Send + Sync {
    async fn track_reading_progress(
        &self,
        event_id: Uuid,
        article_id: &ArticleId,
        percent: f64,
        time_spent_seconds: u64,
    ) -> Result<(), AnalyticsError>;

    async fn track_article_completion(
        &self,
        event_id: Uuid,
        article_id: &ArticleId,
        time_spent_seconds: u64,
        word_count: u64,
    ) -> Result<(), AnalyticsError>;
}

/// Route an envelope to the matching client entry point.
pub async fn deliver(
    client: &dyn AnalyticsClient,
    envelope: &AnalyticsEnvelope,
) -> Result<(), AnalyticsError> {
    match &envelope.event {
        AnalyticsEvent::ReadingProgress {
            article_id,
            percent,
            time_spent_seconds,
        } => {
            client
                .track_reading_progress(envelope.id, article_id, *percent, *time_spent_seconds)
                .await
        }
        AnalyticsEvent::ArticleCompletion {
            article_id,
            time_spent_seconds,
            word_count,
        } => {
            client
                .track_article_completion(
                    envelope.id,
                    article_id,
                    *time_spent_seconds,
                    *word_count,
                )
                .await
        }
    }
}
