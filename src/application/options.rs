//! Tracker initialization options.

use std::time::Duration;

use crate::config::TrackerSettings;
use crate::domain::types::{ArticleId, ContentSelector};

use super::error::AppError;

pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.1;
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 90.0;
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(1000);

/// Options accepted when a tracker is initialized for one article view.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerOptions {
    pub article_id: ArticleId,
    pub content_selector: ContentSelector,
    /// Total words in the article, used for the words-read estimate.
    pub word_count: u64,
    pub tracking_enabled: bool,
    /// Fraction of the element that must intersect the viewport, in `(0, 1]`.
    pub visibility_threshold: f64,
    /// Scroll percent at which the read counts as finished, in `(0, 100]`.
    pub completion_threshold: f64,
    pub update_interval: Duration,
}

impl TrackerOptions {
    pub fn new(article_id: ArticleId) -> Self {
        Self {
            article_id,
            content_selector: ContentSelector::default(),
            word_count: 0,
            tracking_enabled: true,
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }

    /// Options for `article_id` with defaults taken from resolved settings.
    pub fn from_settings(article_id: ArticleId, settings: &TrackerSettings) -> Self {
        Self {
            article_id,
            content_selector: settings.content_selector.clone(),
            word_count: 0,
            tracking_enabled: settings.tracking_enabled,
            visibility_threshold: settings.visibility_threshold,
            completion_threshold: settings.completion_threshold,
            update_interval: settings.update_interval,
        }
    }

    pub fn with_word_count(mut self, word_count: u64) -> Self {
        self.word_count = word_count;
        self
    }

    pub fn with_content_selector(mut self, selector: ContentSelector) -> Self {
        self.content_selector = selector;
        self
    }

    pub fn with_tracking_enabled(mut self, enabled: bool) -> Self {
        self.tracking_enabled = enabled;
        self
    }

    pub fn with_visibility_threshold(mut self, threshold: f64) -> Self {
        self.visibility_threshold = threshold;
        self
    }

    pub fn with_completion_threshold(mut self, threshold: f64) -> Self {
        self.completion_threshold = threshold;
        self
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Scroll percent at which reading counts as started.
    pub fn start_percent(&self) -> f64 {
        self.visibility_threshold * 100.0
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.visibility_threshold > 0.0 && self.visibility_threshold <= 1.0) {
            return Err(AppError::validation(format!(
                "visibility threshold must be within (0, 1], got {}",
                self.visibility_threshold
            )));
        }
        if !(self.completion_threshold > 0.0 && self.completion_threshold <= 100.0) {
            return Err(AppError::validation(format!(
                "completion threshold must be within (0, 100], got {}",
                self.completion_threshold
            )));
        }
        if self.update_interval.is_zero() {
            return Err(AppError::validation(
                "update interval must be greater than zero",
            ));
        }
        Ok(())
    }
}
