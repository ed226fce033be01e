//! Reading phase state machine and per-tick progress snapshots.

use serde::{Deserialize, Serialize};

/// Forward-only reading phase.
///
/// `NotStarted -> Started -> Finished`; the only way back is a full reset,
/// which replaces the phase with `NotStarted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingPhase {
    #[default]
    NotStarted,
    Started,
    Finished,
}

impl ReadingPhase {
    /// Advance according to the sampled percent. Never moves backwards.
    pub fn advance(self, percent: f64, start_percent: f64, completion_percent: f64) -> Self {
        let target = if percent >= completion_percent {
            ReadingPhase::Finished
        } else if percent >= start_percent {
            ReadingPhase::Started
        } else {
            ReadingPhase::NotStarted
        };
        self.max(target)
    }

    pub fn has_started(self) -> bool {
        self >= ReadingPhase::Started
    }

    pub fn has_finished(self) -> bool {
        self == ReadingPhase::Finished
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReadingPhase::NotStarted => "not_started",
            ReadingPhase::Started => "started",
            ReadingPhase::Finished => "finished",
        }
    }
}

/// Progress state exposed to the owning view, recomputed on every update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub scroll_percent: f64,
    pub time_spent_seconds: u64,
    pub words_read: u64,
    pub is_visible: bool,
    pub has_started_reading: bool,
    pub has_finished_reading: bool,
}

impl ProgressSnapshot {
    pub fn new(
        scroll_percent: f64,
        time_spent_seconds: u64,
        words_read: u64,
        is_visible: bool,
        phase: ReadingPhase,
    ) -> Self {
        Self {
            scroll_percent,
            time_spent_seconds,
            words_read,
            is_visible,
            has_started_reading: phase.has_started(),
            has_finished_reading: phase.has_finished(),
        }
    }

    /// Estimated reading speed in words per minute, or 0 without data.
    pub fn estimated_reading_speed_wpm(&self) -> u64 {
        if self.words_read == 0 || self.time_spent_seconds == 0 {
            return 0;
        }
        (self.words_read as f64 / self.time_spent_seconds as f64 * 60.0).round() as u64
    }

    /// Linear extrapolation of the remaining reading time, or 0 before any progress.
    pub fn estimated_time_remaining_seconds(&self) -> u64 {
        if self.scroll_percent <= 0.0 {
            return 0;
        }
        let remaining = self.time_spent_seconds as f64 / self.scroll_percent
            * (100.0 - self.scroll_percent);
        remaining.round().max(0.0) as u64
    }

    pub fn metrics(&self) -> ReadingMetrics {
        ReadingMetrics {
            estimated_reading_speed_wpm: self.estimated_reading_speed_wpm(),
            estimated_time_remaining_seconds: self.estimated_time_remaining_seconds(),
        }
    }
}

/// Metrics derived from a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingMetrics {
    pub estimated_reading_speed_wpm: u64,
    pub estimated_time_remaining_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_moves_forward_with_progress() {
        let phase = ReadingPhase::default();
        let phase = phase.advance(5.0, 10.0, 90.0);
        assert_eq!(phase, ReadingPhase::NotStarted);
        let phase = phase.advance(12.0, 10.0, 90.0);
        assert_eq!(phase, ReadingPhase::Started);
        let phase = phase.advance(91.0, 10.0, 90.0);
        assert_eq!(phase, ReadingPhase::Finished);
    }

    #[test]
    fn phase_never_moves_backwards() {
        let samples = [50.0, 0.0, 95.0, 20.0, 0.0, 100.0, 1.0];
        let mut phase = ReadingPhase::NotStarted;
        let mut previous = phase;
        for percent in samples {
            phase = phase.advance(percent, 10.0, 90.0);
            assert!(phase >= previous);
            previous = phase;
        }
        assert!(phase.has_finished());
    }

    #[test]
    fn finishing_implies_started() {
        let phase = ReadingPhase::NotStarted.advance(100.0, 10.0, 90.0);
        assert!(phase.has_started());
        assert!(phase.has_finished());
    }

    #[test]
    fn snapshot_flags_follow_phase() {
        let snapshot = ProgressSnapshot::new(40.0, 30, 320, true, ReadingPhase::Started);
        assert!(snapshot.has_started_reading);
        assert!(!snapshot.has_finished_reading);
    }

    #[test]
    fn reading_speed_requires_words_and_time() {
        let snapshot = ProgressSnapshot::new(50.0, 0, 400, true, ReadingPhase::Started);
        assert_eq!(snapshot.estimated_reading_speed_wpm(), 0);

        let snapshot = ProgressSnapshot::new(50.0, 120, 400, true, ReadingPhase::Started);
        assert_eq!(snapshot.estimated_reading_speed_wpm(), 200);
    }

    #[test]
    fn remaining_time_extrapolates_linearly() {
        let snapshot = ProgressSnapshot::new(25.0, 60, 200, true, ReadingPhase::Started);
        assert_eq!(snapshot.estimated_time_remaining_seconds(), 180);

        let snapshot = ProgressSnapshot::new(0.0, 60, 0, true, ReadingPhase::NotStarted);
        assert_eq!(snapshot.estimated_time_remaining_seconds(), 0);

        let snapshot = ProgressSnapshot::new(100.0, 60, 800, true, ReadingPhase::Finished);
        assert_eq!(snapshot.metrics().estimated_time_remaining_seconds, 0);
    }
}
