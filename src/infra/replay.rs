//! Replay of recorded reading traces.
//!
//! A trace is a TOML document with the article id, its word count and a list
//! of samples. Each sample places the content element relative to the
//! viewport at a point in time and names the trigger that fires there. The
//! replay drives a [`ReadingTracker`] over a [`ScriptedSurface`] and a
//! [`ManualClock`], fires unload after the last sample, then delivers the
//! queued analytics.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use crate::application::{
    analytics::AnalyticsClient,
    clock::ManualClock,
    error::AppError,
    options::TrackerOptions,
    surface::{ReadingSurface, SurfaceEvent},
    tracker::ReadingTracker,
};
use crate::config::AnalyticsSettings;
use crate::domain::{
    geometry::ContentRect,
    milestones::Milestone,
    progress::{ProgressSnapshot, ReadingMetrics},
    types::{ArticleId, ContentSelector},
};
use crate::util::lock::mutex_lock;

use super::analytics::{AnalyticsDispatcher, AnalyticsQueue, DeliveryReport};
use super::error::InfraError;

const SOURCE: &str = "infra::replay";

#[derive(Debug, Clone, Copy)]
struct SurfaceState {
    rect: Option<ContentRect>,
    viewport_height: f64,
}

/// Host surface whose geometry is set explicitly.
#[derive(Debug)]
pub struct ScriptedSurface {
    state: Mutex<SurfaceState>,
    intersection: bool,
}

impl ScriptedSurface {
    /// `rect` of `None` means the content selector matches nothing.
    pub fn new(rect: Option<ContentRect>, viewport_height: f64) -> Self {
        Self {
            state: Mutex::new(SurfaceState {
                rect,
                viewport_height,
            }),
            intersection: true,
        }
    }

    /// Report intersection observation as unavailable.
    pub fn without_intersection(mut self) -> Self {
        self.intersection = false;
        self
    }

    pub fn set_rect(&self, rect: Option<ContentRect>) {
        mutex_lock(&self.state, SOURCE, "set_rect").rect = rect;
    }

    pub fn set_viewport_height(&self, height: f64) {
        mutex_lock(&self.state, SOURCE, "set_viewport_height").viewport_height = height;
    }
}

impl ReadingSurface for ScriptedSurface {
    fn content_rect(&self, _selector: &ContentSelector) -> Option<ContentRect> {
        mutex_lock(&self.state, SOURCE, "content_rect").rect
    }

    fn viewport_height(&self) -> f64 {
        mutex_lock(&self.state, SOURCE, "viewport_height").viewport_height
    }

    fn supports_intersection(&self) -> bool {
        self.intersection
    }
}

/// A recorded reading session.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayScript {
    pub article_id: String,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub samples: Vec<ReplaySample>,
}

/// One point of a trace. Content fields are absent when the selector matched nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaySample {
    /// Milliseconds since the trace started.
    pub elapsed_ms: u64,
    pub content_top: Option<f64>,
    pub content_height: Option<f64>,
    pub viewport_height: f64,
    /// Intersection ratio observed at this point, if any.
    pub visible_ratio: Option<f64>,
    #[serde(default)]
    pub trigger: ReplayTrigger,
    pub action: Option<ReplayAction>,
}

impl ReplaySample {
    fn rect(&self) -> Option<ContentRect> {
        match (self.content_top, self.content_height) {
            (Some(top), Some(height)) => Some(ContentRect::new(top, height)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayTrigger {
    #[default]
    Tick,
    Scroll,
    Resize,
    /// Only apply the geometry, visibility and action.
    #[serde(rename = "none")]
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayAction {
    Pause,
    Resume,
    Reset,
}

impl ReplayScript {
    pub fn parse(source: &str) -> Result<Self, AppError> {
        let script: ReplayScript = toml::from_str(source)
            .map_err(|err| AppError::validation(format!("invalid reading trace: {err}")))?;
        script.validate()?;
        Ok(script)
    }

    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(InfraError::from)?;
        Self::parse(&source)
    }

    fn validate(&self) -> Result<(), AppError> {
        ArticleId::parse(self.article_id.as_str())?;
        let mut previous = 0;
        for (index, sample) in self.samples.iter().enumerate() {
            if sample.elapsed_ms < previous {
                return Err(AppError::validation(format!(
                    "sample {index} goes back in time ({} ms after {previous} ms)",
                    sample.elapsed_ms
                )));
            }
            previous = sample.elapsed_ms;
        }
        Ok(())
    }
}

/// Summary printed after a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub article_id: ArticleId,
    pub snapshot: ProgressSnapshot,
    pub milestones: Vec<Milestone>,
    pub metrics: ReadingMetrics,
    pub events_published: usize,
    pub delivery: DeliveryReport,
}

/// Replay `script` through a fresh tracker and deliver its analytics via `client`.
#[instrument(skip_all, fields(article_id = %options.article_id, samples = script.samples.len()))]
pub async fn replay(
    script: &ReplayScript,
    options: TrackerOptions,
    analytics: &AnalyticsSettings,
    client: Arc<dyn AnalyticsClient>,
) -> Result<ReplayReport, AppError> {
    let first_viewport = script
        .samples
        .first()
        .map(|sample| sample.viewport_height)
        .unwrap_or_default();
    let surface = Arc::new(ScriptedSurface::new(
        script.samples.first().and_then(ReplaySample::rect),
        first_viewport,
    ));
    let clock = Arc::new(ManualClock::new(OffsetDateTime::now_utc()));
    let queue = Arc::new(AnalyticsQueue::new(analytics.queue_limit.get()));

    let mut tracker = ReadingTracker::new(options, surface.clone(), queue.clone(), clock.clone())?;

    for sample in &script.samples {
        let target = Duration::from_millis(sample.elapsed_ms);
        clock.advance(target.saturating_sub(clock.elapsed()));
        surface.set_rect(sample.rect());
        surface.set_viewport_height(sample.viewport_height);

        if let Some(ratio) = sample.visible_ratio {
            tracker.handle_event(SurfaceEvent::Intersection { ratio });
        }
        match sample.action {
            Some(ReplayAction::Pause) => tracker.pause_tracking(),
            Some(ReplayAction::Resume) => tracker.resume_tracking(),
            Some(ReplayAction::Reset) => tracker.reset_progress(),
            None => {}
        }
        match sample.trigger {
            ReplayTrigger::Tick => tracker.tick(),
            ReplayTrigger::Scroll => tracker.handle_event(SurfaceEvent::Scroll),
            ReplayTrigger::Resize => tracker.handle_event(SurfaceEvent::Resize),
            ReplayTrigger::Idle => {}
        }

        debug!(
            elapsed_ms = sample.elapsed_ms,
            scroll_percent = tracker.progress().scroll_percent,
            time_spent_seconds = tracker.progress().time_spent_seconds,
            "Trace sample applied"
        );
    }

    tracker.handle_event(SurfaceEvent::Unload);
    tracker.teardown();

    let dispatcher = AnalyticsDispatcher::new(
        queue.clone(),
        client,
        analytics.batch_limit.get(),
        analytics.flush_interval,
    );
    let delivery = dispatcher.deliver_pending().await;

    let report = ReplayReport {
        article_id: tracker.options().article_id.clone(),
        snapshot: tracker.progress().clone(),
        milestones: tracker.milestones().to_vec(),
        metrics: tracker.metrics(),
        events_published: queue.published_total(),
        delivery,
    };

    info!(
        scroll_percent = report.snapshot.scroll_percent,
        milestones = report.milestones.len(),
        events_published = report.events_published,
        delivered = report.delivery.delivered,
        replay_ms = clock.elapsed().as_millis() as u64,
        "Reading trace replayed"
    );

    Ok(report)
}
