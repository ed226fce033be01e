//! Async driver that owns a tracker's interval timer and event subscriptions.
//!
//! A [`TrackingSession`] runs its [`ReadingTracker`] on one tokio task, so
//! update cycles are serialized. Teardown (explicit or on drop) releases the
//! interval, the visibility detector and the host event feed in that order.

use serde::Serialize;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::domain::{
    milestones::Milestone,
    progress::{ProgressSnapshot, ReadingMetrics},
};

use super::{error::AppError, surface::SurfaceEvent, tracker::ReadingTracker};

/// Suggested capacity for the host event channel.
pub const SURFACE_EVENT_BUFFER: usize = 64;

const CONTROL_BUFFER: usize = 16;

/// Everything the owning view reads from a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackerView {
    pub progress: ProgressSnapshot,
    pub milestones: Vec<Milestone>,
    pub metrics: ReadingMetrics,
    pub ticking: bool,
}

impl TrackerView {
    fn of(tracker: &ReadingTracker) -> Self {
        Self {
            progress: tracker.progress().clone(),
            milestones: tracker.milestones().to_vec(),
            metrics: tracker.metrics(),
            ticking: tracker.is_ticking(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Update,
    Pause,
    Resume,
    Reset,
    Teardown,
}

struct ControlMessage {
    control: Control,
    ack: oneshot::Sender<TrackerView>,
}

pub struct TrackingSession {
    controls: mpsc::Sender<ControlMessage>,
    view: watch::Receiver<TrackerView>,
    task: Option<JoinHandle<ReadingTracker>>,
}

impl TrackingSession {
    /// Start driving `tracker` from its interval and the host's `events`.
    pub fn spawn(tracker: ReadingTracker, events: mpsc::Receiver<SurfaceEvent>) -> Self {
        let (controls_tx, controls_rx) = mpsc::channel(CONTROL_BUFFER);
        let (view_tx, view_rx) = watch::channel(TrackerView::of(&tracker));

        let task = tokio::spawn(run(tracker, events, controls_rx, view_tx));

        Self {
            controls: controls_tx,
            view: view_rx,
            task: Some(task),
        }
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.view.borrow().progress.clone()
    }

    pub fn milestones(&self) -> Vec<Milestone> {
        self.view.borrow().milestones.clone()
    }

    pub fn view(&self) -> TrackerView {
        self.view.borrow().clone()
    }

    /// Receiver notified after every update cycle.
    pub fn subscribe(&self) -> watch::Receiver<TrackerView> {
        self.view.clone()
    }

    pub async fn update_progress(&self) -> Result<TrackerView, AppError> {
        self.send(Control::Update).await
    }

    pub async fn pause_tracking(&self) -> Result<TrackerView, AppError> {
        self.send(Control::Pause).await
    }

    pub async fn resume_tracking(&self) -> Result<TrackerView, AppError> {
        self.send(Control::Resume).await
    }

    pub async fn reset_progress(&self) -> Result<TrackerView, AppError> {
        self.send(Control::Reset).await
    }

    /// Release every resource and hand back the torn-down tracker.
    pub async fn teardown(mut self) -> Result<ReadingTracker, AppError> {
        self.send(Control::Teardown).await?;
        let task = self
            .task
            .take()
            .ok_or_else(|| AppError::unexpected("tracking session already released"))?;
        task.await
            .map_err(|err| AppError::unexpected(format!("tracking task failed: {err}")))
    }

    async fn send(&self, control: Control) -> Result<TrackerView, AppError> {
        let (ack, ack_rx) = oneshot::channel();
        self.controls
            .send(ControlMessage { control, ack })
            .await
            .map_err(|_| AppError::unexpected("tracking session is closed"))?;
        ack_rx
            .await
            .map_err(|_| AppError::unexpected("tracking session stopped before acknowledging"))
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    mut tracker: ReadingTracker,
    mut events: mpsc::Receiver<SurfaceEvent>,
    mut controls: mpsc::Receiver<ControlMessage>,
    view: watch::Sender<TrackerView>,
) -> ReadingTracker {
    let period = tracker.options().update_interval;
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut listening = true;
    let mut teardown_ack = None;

    loop {
        tokio::select! {
            _ = interval.tick(), if tracker.is_ticking() => tracker.tick(),
            event = events.recv(), if listening => match event {
                Some(event) => {
                    debug!(event = event.kind(), "Surface event received");
                    tracker.handle_event(event);
                }
                None => {
                    listening = false;
                    debug!("Surface event feed closed");
                }
            },
            message = controls.recv() => {
                let Some(ControlMessage { control, ack }) = message else {
                    break;
                };
                match control {
                    Control::Update => {
                        tracker.update_progress();
                    }
                    Control::Pause => tracker.pause_tracking(),
                    Control::Resume => {
                        let was_ticking = tracker.is_ticking();
                        tracker.resume_tracking();
                        if !was_ticking && tracker.is_ticking() {
                            interval.reset();
                        }
                    }
                    Control::Reset => tracker.reset_progress(),
                    Control::Teardown => {
                        teardown_ack = Some(ack);
                        break;
                    }
                }
                let _ = ack.send(TrackerView::of(&tracker));
            }
        }

        view.send_replace(TrackerView::of(&tracker));
    }

    // Release order: interval, visibility detector, host event feed.
    drop(interval);
    tracker.teardown();
    drop(events);
    info!(
        article_id = %tracker.options().article_id,
        "Tracking session released"
    );

    let released = TrackerView::of(&tracker);
    view.send_replace(released.clone());
    if let Some(ack) = teardown_ack {
        let _ = ack.send(released);
    }
    tracker
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::application::analytics::AnalyticsEvent;
    use crate::application::clock::SystemClock;
    use crate::application::options::TrackerOptions;
    use crate::domain::geometry::ContentRect;
    use crate::domain::types::ArticleId;
    use crate::infra::analytics::AnalyticsQueue;
    use crate::infra::replay::ScriptedSurface;

    struct Fixture {
        session: TrackingSession,
        events: mpsc::Sender<SurfaceEvent>,
        surface: Arc<ScriptedSurface>,
        queue: Arc<AnalyticsQueue>,
    }

    fn fixture(percent: f64) -> Fixture {
        let surface = Arc::new(ScriptedSurface::new(
            Some(ContentRect::new(-percent * 10.0, 1000.0)),
            1000.0,
        ));
        let queue = Arc::new(AnalyticsQueue::new(64));
        let options = TrackerOptions::new(ArticleId::parse("post-5").expect("valid id"))
            .with_word_count(1000);
        let tracker = ReadingTracker::new(
            options,
            surface.clone(),
            queue.clone(),
            Arc::new(SystemClock),
        )
        .expect("valid tracker");
        let (events, events_rx) = mpsc::channel(SURFACE_EVENT_BUFFER);

        Fixture {
            session: TrackingSession::spawn(tracker, events_rx),
            events,
            surface,
            queue,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_update_the_view() {
        let fixture = fixture(50.0);
        let mut view = fixture.session.subscribe();

        view.changed().await.expect("first tick");
        assert_eq!(view.borrow().progress.scroll_percent, 50.0);
        assert_eq!(view.borrow().progress.words_read, 500);

        time::sleep(Duration::from_millis(2_100)).await;
        let current = fixture.session.update_progress().await.expect("update");
        assert_eq!(current.progress.time_spent_seconds, 2);
        assert_eq!(current.milestones.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticks_but_not_events() {
        let fixture = fixture(30.0);

        let paused = fixture.session.pause_tracking().await.expect("pause");
        assert!(!paused.ticking);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fixture.session.progress(), ProgressSnapshot::default());

        fixture.surface.set_rect(Some(ContentRect::new(-500.0, 1000.0)));
        fixture
            .events
            .send(SurfaceEvent::Scroll)
            .await
            .expect("send scroll");
        let view = fixture.session.update_progress().await.expect("update");
        assert_eq!(view.progress.scroll_percent, 50.0);
        assert_eq!(view.progress.time_spent_seconds, 0);

        let resumed = fixture.session.resume_tracking().await.expect("resume");
        assert!(resumed.ticking);
    }

    #[tokio::test(start_paused = true)]
    async fn unload_event_reports_completion_once() {
        let fixture = fixture(95.0);
        fixture
            .events
            .send(SurfaceEvent::Unload)
            .await
            .expect("send unload");
        fixture.session.update_progress().await.expect("update");

        let completions = fixture
            .queue
            .drain(usize::MAX)
            .into_iter()
            .filter(|e| matches!(e.event, AnalyticsEvent::ArticleCompletion { .. }))
            .count();
        assert_eq!(completions, 1);
        assert_eq!(fixture.session.milestones().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_view() {
        let fixture = fixture(80.0);
        fixture.session.update_progress().await.expect("update");

        let view = fixture.session.reset_progress().await.expect("reset");
        assert_eq!(view.progress, ProgressSnapshot::default());
        assert!(view.milestones.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_releases_event_feed() {
        let Fixture {
            session, events, ..
        } = fixture(10.0);

        let tracker = session.teardown().await.expect("teardown");
        assert!(tracker.is_torn_down());
        assert!(!tracker.is_ticking());
        assert!(events.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_session_releases_event_feed() {
        let Fixture {
            session, events, ..
        } = fixture(10.0);

        drop(session);
        time::timeout(Duration::from_secs(1), events.closed())
            .await
            .expect("event feed closed after drop");
    }
}
