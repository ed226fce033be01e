//! Session timer: accumulates time only while tracking is running.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SessionTimer {
    /// Set when the content first became visible.
    started_at: Option<Instant>,
    /// Time folded in from earlier running stretches.
    baseline: Duration,
    /// Start of the current running stretch.
    anchor: Option<Instant>,
    running: bool,
}

impl SessionTimer {
    pub fn new(running: bool) -> Self {
        Self {
            started_at: None,
            baseline: Duration::ZERO,
            anchor: None,
            running,
        }
    }

    /// Record the session start reference. Later calls are ignored.
    pub fn mark_started(&mut self, now: Instant) {
        if self.started_at.is_some() {
            return;
        }
        self.started_at = Some(now);
        if self.running && self.anchor.is_none() {
            self.anchor = Some(now);
        }
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whole seconds of active time as of `now`.
    ///
    /// Without a start reference the first sample anchors the running stretch,
    /// so time accrues between successive samples.
    pub fn sample(&mut self, now: Instant) -> u64 {
        if self.running && self.anchor.is_none() {
            self.anchor = Some(now);
        }
        self.elapsed(now).as_secs()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        let current = self
            .anchor
            .map(|anchor| now.saturating_duration_since(anchor))
            .unwrap_or_default();
        self.baseline + current
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(anchor) = self.anchor.take() {
            self.baseline += now.saturating_duration_since(anchor);
        }
        self.running = false;
    }

    pub fn resume(&mut self, now: Instant) {
        if self.running {
            return;
        }
        self.running = true;
        self.anchor = Some(now);
    }

    /// Drop the start reference and all accumulated time.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.baseline = Duration::ZERO;
        self.anchor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    #[test]
    fn counts_from_start_reference() {
        let t0 = Instant::now();
        let mut timer = SessionTimer::new(true);
        timer.mark_started(t0);

        assert_eq!(timer.sample(t0 + Duration::from_millis(2_900)), 2);
        assert_eq!(timer.sample(t0 + secs(10)), 10);
    }

    #[test]
    fn falls_back_to_delta_accounting_without_start() {
        let t0 = Instant::now();
        let mut timer = SessionTimer::new(true);

        assert_eq!(timer.sample(t0), 0);
        assert_eq!(timer.sample(t0 + secs(3)), 3);
        assert!(timer.started_at().is_none());
    }

    #[test]
    fn late_start_reference_keeps_accrued_time() {
        let t0 = Instant::now();
        let mut timer = SessionTimer::new(true);
        timer.sample(t0);
        timer.mark_started(t0 + secs(4));

        assert_eq!(timer.sample(t0 + secs(6)), 6);
    }

    #[test]
    fn paused_interval_is_not_counted() {
        let t0 = Instant::now();
        let mut timer = SessionTimer::new(true);
        timer.mark_started(t0);

        timer.pause(t0 + secs(5));
        assert_eq!(timer.sample(t0 + secs(60)), 5);

        timer.resume(t0 + secs(60));
        assert_eq!(timer.sample(t0 + secs(62)), 7);
    }

    #[test]
    fn resume_while_running_is_a_no_op() {
        let t0 = Instant::now();
        let mut timer = SessionTimer::new(true);
        timer.mark_started(t0);
        timer.resume(t0 + secs(5));
        assert_eq!(timer.sample(t0 + secs(8)), 8);
    }

    #[test]
    fn reset_clears_reference_and_time() {
        let t0 = Instant::now();
        let mut timer = SessionTimer::new(true);
        timer.mark_started(t0);
        timer.sample(t0 + secs(30));

        timer.reset();

        assert!(timer.started_at().is_none());
        assert_eq!(timer.sample(t0 + secs(31)), 0);
        assert_eq!(timer.sample(t0 + secs(33)), 2);
    }
}
