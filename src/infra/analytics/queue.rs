//! Bounded in-memory queue between the tracker and analytics delivery.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::{counter, gauge};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::application::analytics::{AnalyticsEnvelope, AnalyticsEvent, AnalyticsSink};
use crate::infra::telemetry::{METRIC_EVENT_DROPPED, METRIC_QUEUE_LEN};
use crate::util::lock::mutex_lock;

const SOURCE: &str = "infra::analytics::queue";

/// Default number of envelopes kept before the oldest are dropped.
pub const DEFAULT_QUEUE_LIMIT: usize = 256;

/// FIFO queue of analytics envelopes.
///
/// Publishing never blocks; when the queue is full the oldest progress
/// envelope (or the oldest envelope if none is progress) is dropped and counted.
pub struct AnalyticsQueue {
    queue: Mutex<VecDeque<AnalyticsEnvelope>>,
    limit: usize,
    published: AtomicUsize,
    flush: Notify,
}

impl AnalyticsQueue {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(limit.min(DEFAULT_QUEUE_LIMIT))),
            limit,
            published: AtomicUsize::new(0),
            flush: Notify::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of events ever enqueued, including ones later dropped.
    pub fn published_total(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }

    /// Enqueue an event under a fresh idempotency key.
    pub fn enqueue(&self, event: AnalyticsEvent) -> AnalyticsEnvelope {
        let envelope = AnalyticsEnvelope::new(event);
        self.published.fetch_add(1, Ordering::Relaxed);

        debug!(
            event_id = %envelope.id,
            event_kind = envelope.event.kind(),
            article_id = %envelope.event.article_id(),
            "Analytics event enqueued"
        );

        let mut queue = mutex_lock(&self.queue, SOURCE, "enqueue");
        while queue.len() >= self.limit {
            // Progress samples are superseded by later ones; completions are not.
            let victim = queue
                .iter()
                .position(|queued| matches!(queued.event, AnalyticsEvent::ReadingProgress { .. }))
                .unwrap_or(0);
            if let Some(dropped) = queue.remove(victim) {
                counter!(METRIC_EVENT_DROPPED, "reason" => "overflow").increment(1);
                warn!(
                    event_id = %dropped.id,
                    event_kind = dropped.event.kind(),
                    limit = self.limit,
                    "Analytics queue full; dropped event"
                );
            }
        }
        queue.push_back(envelope.clone());
        gauge!(METRIC_QUEUE_LEN).set(queue.len() as f64);

        envelope
    }

    /// Drain up to `limit` envelopes in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<AnalyticsEnvelope> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        let drained = queue.drain(..count).collect();
        gauge!(METRIC_QUEUE_LEN).set(queue.len() as f64);
        drained
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.queue, SOURCE, "clear").clear();
        gauge!(METRIC_QUEUE_LEN).set(0.0);
    }

    /// Ask the dispatcher to deliver now.
    pub fn request_flush(&self) {
        self.flush.notify_one();
    }

    /// Resolves once a flush has been requested. A request made while nobody
    /// waits is kept for the next waiter.
    pub async fn flush_requested(&self) {
        self.flush.notified().await;
    }
}

impl Default for AnalyticsQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_LIMIT)
    }
}

impl AnalyticsSink for AnalyticsQueue {
    fn publish(&self, event: AnalyticsEvent) {
        self.enqueue(event);
    }

    fn flush(&self) {
        self.request_flush();
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::time::Duration;

    use super::*;
    use crate::domain::types::ArticleId;

    fn progress(percent: f64) -> AnalyticsEvent {
        AnalyticsEvent::ReadingProgress {
            article_id: ArticleId::parse("post-1").expect("valid id"),
            percent,
            time_spent_seconds: 1,
        }
    }

    #[test]
    fn drain_respects_limit_and_order() {
        let queue = AnalyticsQueue::new(8);
        queue.publish(progress(10.0));
        queue.publish(progress(20.0));
        queue.publish(progress(30.0));

        let first = queue.drain(2);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].event, progress(10.0));
        assert_eq!(first[1].event, progress(20.0));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn overflow_drops_oldest() {
        let queue = AnalyticsQueue::new(2);
        queue.publish(progress(10.0));
        queue.publish(progress(20.0));
        queue.publish(progress(30.0));

        let drained = queue.drain(usize::MAX);
        let percents: Vec<_> = drained
            .iter()
            .map(|envelope| match envelope.event {
                AnalyticsEvent::ReadingProgress { percent, .. } => percent,
                AnalyticsEvent::ArticleCompletion { .. } => -1.0,
            })
            .collect();
        assert_eq!(percents, vec![20.0, 30.0]);
        assert_eq!(queue.published_total(), 3);
    }

    #[test]
    fn overflow_keeps_completion_over_progress() {
        let queue = AnalyticsQueue::new(2);
        queue.publish(AnalyticsEvent::ArticleCompletion {
            article_id: ArticleId::parse("post-1").expect("valid id"),
            time_spent_seconds: 90,
            word_count: 400,
        });
        for percent in [92.0, 96.0, 100.0] {
            queue.publish(progress(percent));
        }

        let drained = queue.drain(usize::MAX);
        assert_eq!(drained.len(), 2);
        assert!(matches!(
            drained[0].event,
            AnalyticsEvent::ArticleCompletion { .. }
        ));
        assert_eq!(drained[1].event, progress(100.0));
    }

    #[test]
    fn zero_limit_keeps_latest_event() {
        let queue = AnalyticsQueue::new(0);
        assert_eq!(queue.limit(), 1);
        queue.publish(progress(10.0));
        queue.publish(progress(20.0));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn queue_recovers_after_poisoned_lock() {
        let queue = AnalyticsQueue::new(4);
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = queue.queue.lock().expect("lock should be acquired");
            panic!("poison queue lock");
        }));

        queue.publish(progress(40.0));
        assert_eq!(queue.len(), 1);
        queue.clear();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn flush_request_is_kept_for_next_waiter() {
        let queue = AnalyticsQueue::new(4);
        queue.flush();
        tokio::time::timeout(Duration::from_secs(1), queue.flush_requested())
            .await
            .expect("pending flush request resolves immediately");
    }
}
