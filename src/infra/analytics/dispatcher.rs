//! Background delivery of queued analytics envelopes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::Serialize;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, instrument, warn};

use crate::application::analytics::{AnalyticsClient, deliver};
use crate::infra::error::InfraError;
use crate::infra::telemetry::{METRIC_DELIVER_MS, METRIC_DELIVERED, METRIC_DELIVERY_FAILED};

use super::queue::AnalyticsQueue;

/// Outcome of one or more delivery passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }

    fn absorb(&mut self, other: DeliveryReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }
}

pub struct AnalyticsDispatcher {
    queue: Arc<AnalyticsQueue>,
    client: Arc<dyn AnalyticsClient>,
    batch_limit: usize,
    flush_interval: Duration,
}

impl AnalyticsDispatcher {
    pub fn new(
        queue: Arc<AnalyticsQueue>,
        client: Arc<dyn AnalyticsClient>,
        batch_limit: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            queue,
            client,
            batch_limit: batch_limit.max(1),
            flush_interval,
        }
    }

    pub fn queue(&self) -> &Arc<AnalyticsQueue> {
        &self.queue
    }

    /// Deliver at most one batch. Failed envelopes are logged and dropped.
    #[instrument(skip(self))]
    pub async fn deliver_batch(&self) -> DeliveryReport {
        let envelopes = self.queue.drain(self.batch_limit);
        if envelopes.is_empty() {
            return DeliveryReport::default();
        }

        let started_at = Instant::now();
        let mut report = DeliveryReport::default();
        for envelope in &envelopes {
            match deliver(self.client.as_ref(), envelope).await {
                Ok(()) => {
                    report.delivered += 1;
                    counter!(METRIC_DELIVERED, "kind" => envelope.event.kind()).increment(1);
                }
                Err(err) => {
                    report.failed += 1;
                    counter!(METRIC_DELIVERY_FAILED, "kind" => envelope.event.kind())
                        .increment(1);
                    warn!(
                        event_id = %envelope.id,
                        event_kind = envelope.event.kind(),
                        article_id = %envelope.event.article_id(),
                        error = %err,
                        "Analytics delivery failed; event dropped"
                    );
                }
            }
        }

        histogram!(METRIC_DELIVER_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        debug!(
            delivered = report.delivered,
            failed = report.failed,
            "Analytics batch delivered"
        );
        report
    }

    /// Deliver batches until the queue is empty.
    pub async fn deliver_pending(&self) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        loop {
            let pass = self.deliver_batch().await;
            if pass.total() == 0 {
                break;
            }
            report.absorb(pass);
        }
        report
    }

    /// Run on the flush interval and on flush requests until shut down.
    pub fn spawn(self) -> DispatcherHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));
        DispatcherHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn run(self, mut shutdown: oneshot::Receiver<()>) -> DeliveryReport {
        let mut interval = time::interval(self.flush_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // Skip the first immediate tick

        let mut report = DeliveryReport::default();
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => report.absorb(self.deliver_pending().await),
                _ = self.queue.flush_requested() => {
                    report.absorb(self.deliver_pending().await);
                    interval.reset();
                }
            }
        }

        report.absorb(self.deliver_pending().await);
        info!(
            delivered = report.delivered,
            failed = report.failed,
            "Analytics dispatcher stopped"
        );
        report
    }
}

/// Handle to a spawned dispatcher. Dropping it aborts delivery.
pub struct DispatcherHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<DeliveryReport>>,
}

impl DispatcherHandle {
    /// Stop after delivering whatever is still queued.
    pub async fn shutdown(mut self) -> Result<DeliveryReport, InfraError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let Some(task) = self.task.take() else {
            return Ok(DeliveryReport::default());
        };
        task.await.map_err(|err| {
            InfraError::http(format!("analytics dispatcher task failed: {err}"))
        })
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
