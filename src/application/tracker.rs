//! Reading progress tracker for one article view.
//!
//! [`ReadingTracker`] is the synchronous core: every trigger (interval tick,
//! scroll, resize, unload) funnels into [`ReadingTracker::update_progress`],
//! which recomputes the snapshot, records milestones and publishes analytics.
//! The async driver in [`super::session`] owns the timers and event feeds.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{
    geometry::{scroll_percent, words_read},
    milestones::{Milestone, MilestoneLog},
    progress::{ProgressSnapshot, ReadingMetrics, ReadingPhase},
};

use super::{
    analytics::{AnalyticsEvent, AnalyticsSink},
    clock::Clock,
    error::AppError,
    options::TrackerOptions,
    surface::{ReadingSurface, SurfaceEvent},
    timer::SessionTimer,
    visibility::{VisibilityChange, VisibilityDetector},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Active,
    TornDown,
}

pub struct ReadingTracker {
    options: TrackerOptions,
    surface: Arc<dyn ReadingSurface>,
    analytics: Arc<dyn AnalyticsSink>,
    clock: Arc<dyn Clock>,
    visibility: VisibilityDetector,
    timer: SessionTimer,
    milestones: MilestoneLog,
    phase: ReadingPhase,
    snapshot: ProgressSnapshot,
    completion_reported: bool,
    lifecycle: Lifecycle,
}

impl ReadingTracker {
    /// Initialize a tracking session.
    pub fn new(
        options: TrackerOptions,
        surface: Arc<dyn ReadingSurface>,
        analytics: Arc<dyn AnalyticsSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        options.validate()?;

        let visibility = VisibilityDetector::attach(
            surface.as_ref(),
            &options.content_selector,
            options.visibility_threshold,
        );
        let timer = SessionTimer::new(options.tracking_enabled);

        info!(
            article_id = %options.article_id,
            selector = %options.content_selector,
            word_count = options.word_count,
            tracking_enabled = options.tracking_enabled,
            visibility_inert = visibility.is_inert(),
            "Reading tracker initialized"
        );

        Ok(Self {
            options,
            surface,
            analytics,
            clock,
            visibility,
            timer,
            milestones: MilestoneLog::new(),
            phase: ReadingPhase::NotStarted,
            snapshot: ProgressSnapshot::default(),
            completion_reported: false,
            lifecycle: Lifecycle::Active,
        })
    }

    pub fn options(&self) -> &TrackerOptions {
        &self.options
    }

    pub fn progress(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    pub fn milestones(&self) -> &[Milestone] {
        self.milestones.as_slice()
    }

    pub fn metrics(&self) -> ReadingMetrics {
        self.snapshot.metrics()
    }

    pub fn phase(&self) -> ReadingPhase {
        self.phase
    }

    /// Whether the periodic update path is running.
    pub fn is_ticking(&self) -> bool {
        self.lifecycle == Lifecycle::Active && self.timer.is_running()
    }

    pub fn is_torn_down(&self) -> bool {
        self.lifecycle == Lifecycle::TornDown
    }

    /// Run one recomputation cycle now.
    pub fn update_progress(&mut self) -> &ProgressSnapshot {
        if self.is_torn_down() {
            return &self.snapshot;
        }

        let now = self.clock.now();
        let percent = self
            .surface
            .content_rect(&self.options.content_selector)
            .map(|rect| scroll_percent(rect, self.surface.viewport_height()))
            .unwrap_or(0.0);
        let time_spent = self.timer.sample(now);
        let words = words_read(self.options.word_count, percent);

        let previous_phase = self.phase;
        self.phase = self.phase.advance(
            percent,
            self.options.start_percent(),
            self.options.completion_threshold,
        );

        let recorded = self.milestones.record_crossed(
            percent,
            time_spent,
            self.options.completion_threshold,
            self.clock.now_utc(),
        );
        for milestone in recorded {
            info!(
                article_id = %self.options.article_id,
                milestone = milestone.percent,
                time_spent_seconds = milestone.time_spent_seconds,
                "Reading milestone reached"
            );
        }

        self.snapshot = ProgressSnapshot::new(
            percent,
            time_spent,
            words,
            self.visibility.is_visible(),
            self.phase,
        );

        if self.phase != previous_phase {
            debug!(
                article_id = %self.options.article_id,
                from = previous_phase.as_str(),
                to = self.phase.as_str(),
                "Reading phase advanced"
            );
        }

        debug!(
            article_id = %self.options.article_id,
            scroll_percent = percent,
            time_spent_seconds = time_spent,
            words_read = words,
            "Reading progress updated"
        );

        self.publish_progress();
        &self.snapshot
    }

    /// Interval tick; ignored while paused.
    pub fn tick(&mut self) {
        if self.is_ticking() {
            self.update_progress();
        }
    }

    /// Route a host event to the matching trigger.
    pub fn handle_event(&mut self, event: SurfaceEvent) {
        if self.is_torn_down() {
            return;
        }
        match event {
            SurfaceEvent::Scroll | SurfaceEvent::Resize => {
                self.update_progress();
            }
            SurfaceEvent::Intersection { ratio } => self.observe_intersection(ratio),
            SurfaceEvent::Unload => self.handle_unload(),
        }
    }

    pub fn observe_intersection(&mut self, ratio: f64) {
        match self.visibility.observe(ratio) {
            Some(VisibilityChange::BecameVisible) => {
                // Only the first call after initialize or reset sets the reference.
                self.timer.mark_started(self.clock.now());
                debug!(article_id = %self.options.article_id, "Content became visible");
                self.snapshot.is_visible = true;
            }
            Some(VisibilityChange::BecameHidden) => {
                self.snapshot.is_visible = false;
            }
            None => {}
        }
    }

    /// Final forced update before the page is discarded.
    pub fn handle_unload(&mut self) {
        if self.is_torn_down() {
            return;
        }
        self.update_progress();
        self.analytics.flush();
        info!(
            article_id = %self.options.article_id,
            scroll_percent = self.snapshot.scroll_percent,
            time_spent_seconds = self.snapshot.time_spent_seconds,
            finished = self.snapshot.has_finished_reading,
            "Reading session flushed on unload"
        );
    }

    /// Stop the periodic update path. Visibility keeps being observed.
    pub fn pause_tracking(&mut self) {
        if !self.is_ticking() {
            return;
        }
        self.timer.pause(self.clock.now());
        debug!(article_id = %self.options.article_id, "Reading tracking paused");
    }

    /// Restart the periodic update path if tracking is enabled.
    pub fn resume_tracking(&mut self) {
        if self.is_torn_down() || !self.options.tracking_enabled || self.timer.is_running() {
            return;
        }
        self.timer.resume(self.clock.now());
        debug!(article_id = %self.options.article_id, "Reading tracking resumed");
    }

    /// Return every field to its zero state without re-initializing.
    pub fn reset_progress(&mut self) {
        self.snapshot = ProgressSnapshot::default();
        self.milestones.clear();
        self.phase = ReadingPhase::NotStarted;
        self.timer.reset();
        self.completion_reported = false;
        debug!(article_id = %self.options.article_id, "Reading progress reset");
    }

    /// Release the session: stop the interval, disconnect visibility, stop
    /// listening for host events. Idempotent.
    pub fn teardown(&mut self) {
        if self.is_torn_down() {
            return;
        }
        self.timer.pause(self.clock.now());
        self.visibility.disconnect();
        self.lifecycle = Lifecycle::TornDown;
        info!(
            article_id = %self.options.article_id,
            milestones = self.milestones.len(),
            "Reading tracker torn down"
        );
    }

    fn publish_progress(&mut self) {
        if !self.options.tracking_enabled || !self.phase.has_started() {
            return;
        }

        self.analytics.publish(AnalyticsEvent::ReadingProgress {
            article_id: self.options.article_id.clone(),
            percent: self.snapshot.scroll_percent,
            time_spent_seconds: self.snapshot.time_spent_seconds,
        });
        self.publish_completion();
    }

    fn publish_completion(&mut self) {
        if !self.options.tracking_enabled || !self.phase.has_finished() || self.completion_reported
        {
            return;
        }

        self.completion_reported = true;
        self.analytics.publish(AnalyticsEvent::ArticleCompletion {
            article_id: self.options.article_id.clone(),
            time_spent_seconds: self.snapshot.time_spent_seconds,
            word_count: self.options.word_count,
        });
        info!(
            article_id = %self.options.article_id,
            time_spent_seconds = self.snapshot.time_spent_seconds,
            "Article completion reported"
        );
    }
}
