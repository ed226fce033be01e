//! Scroll geometry and the percent-scrolled approximation.
//!
//! Progress is measured as the fraction of the content height that has moved
//! above the top edge of the viewport. It approximates reading progress; it
//! does not measure what was actually on screen.

use serde::{Deserialize, Serialize};

/// Bounding box of the tracked element relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentRect {
    /// Distance from the viewport top to the element top; negative once scrolled past.
    pub top: f64,
    pub height: f64,
}

impl ContentRect {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    /// Bottom edge relative to the viewport top.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Map element geometry and viewport height to a percentage in `[0, 100]`.
pub fn scroll_percent(rect: ContentRect, viewport_height: f64) -> f64 {
    if !rect.top.is_finite() || !rect.height.is_finite() || rect.height <= 0.0 {
        return 0.0;
    }

    if rect.bottom() < 0.0 {
        return 100.0;
    }

    if rect.top > viewport_height {
        return 0.0;
    }

    let scrolled = (-rect.top).max(0.0) / rect.height;
    (scrolled * 100.0).clamp(0.0, 100.0)
}

/// Estimated words read for a given percent, rounded to the nearest word.
pub fn words_read(word_count: u64, percent: f64) -> u64 {
    (word_count as f64 * percent / 100.0).round() as u64
}
