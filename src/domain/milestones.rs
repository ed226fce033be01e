//! Reading milestones: the first crossing of each fixed progress threshold.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Thresholds recorded once per session, in ascending order.
pub const MILESTONE_THRESHOLDS: [u8; 4] = [25, 50, 75, 100];

/// Immutable record of a threshold crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub percent: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub time_spent_seconds: u64,
}

/// Append-only milestone list for one reading session.
#[derive(Debug, Clone, Default)]
pub struct MilestoneLog {
    entries: Vec<Milestone>,
}

impl MilestoneLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every threshold reached by `percent` that is not yet in the log.
    ///
    /// The final (100) milestone is reached at `min(100, completion_threshold)`
    /// so a finished read always carries it. Returns the newly recorded
    /// milestones in ascending order.
    pub fn record_crossed(
        &mut self,
        percent: f64,
        time_spent_seconds: u64,
        completion_threshold: f64,
        at: OffsetDateTime,
    ) -> &[Milestone] {
        let before = self.entries.len();

        for threshold in MILESTONE_THRESHOLDS {
            if self.contains(threshold) {
                continue;
            }
            if percent >= effective_threshold(threshold, completion_threshold) {
                self.entries.push(Milestone {
                    percent: threshold,
                    timestamp: at,
                    time_spent_seconds,
                });
            }
        }

        &self.entries[before..]
    }

    pub fn contains(&self, threshold: u8) -> bool {
        self.entries.iter().any(|m| m.percent == threshold)
    }

    pub fn as_slice(&self) -> &[Milestone] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// The final milestone never sits below the one before it, so a forward
/// scroll always records milestones in ascending order.
fn effective_threshold(threshold: u8, completion_threshold: f64) -> f64 {
    let threshold = f64::from(threshold);
    if threshold >= 100.0 {
        threshold.min(completion_threshold).max(75.0)
    } else {
        threshold
    }
}
