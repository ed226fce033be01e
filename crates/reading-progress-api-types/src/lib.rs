//! Request bodies accepted by the reading analytics endpoints.
//!
//! Both the tracker's HTTP client and any server implementing the endpoints
//! serialize through these types so the wire shape lives in one place.

use serde::{Deserialize, Serialize};

/// Path (relative to the analytics endpoint) for progress samples.
pub const READING_PROGRESS_PATH: &str = "reading-progress";

/// Path (relative to the analytics endpoint) for completion records.
pub const ARTICLE_COMPLETION_PATH: &str = "article-completion";

/// Header carrying the client-generated event id.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// A single reading progress sample for an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingProgressRequest {
    pub article_id: String,
    /// Scroll percent in `[0, 100]`.
    pub percent: f64,
    pub time_spent_seconds: u64,
}

/// Sent once per reading session when the reader reaches the completion threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleCompletionRequest {
    pub article_id: String,
    pub time_spent_seconds: u64,
    pub word_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_request_uses_snake_case_fields() {
        let body = ReadingProgressRequest {
            article_id: "post-42".to_string(),
            percent: 37.5,
            time_spent_seconds: 12,
        };

        let value = serde_json::to_value(&body).expect("serialize progress");
        assert_eq!(value["article_id"], "post-42");
        assert_eq!(value["percent"], 37.5);
        assert_eq!(value["time_spent_seconds"], 12);
    }

    #[test]
    fn completion_request_parses_from_json() {
        let body: ArticleCompletionRequest = serde_json::from_str(
            r#"{"article_id":"post-7","time_spent_seconds":240,"word_count":1200}"#,
        )
        .expect("parse completion");

        assert_eq!(
            body,
            ArticleCompletionRequest {
                article_id: "post-7".to_string(),
                time_spent_seconds: 240,
                word_count: 1200,
            }
        );
    }
}
