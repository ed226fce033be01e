//! Time sources for the tracker.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use time::OffsetDateTime;

use crate::util::lock::mutex_lock;

const SOURCE: &str = "application::clock";

/// Monotonic and wall-clock time as seen by a tracker.
pub trait Clock: Send + Sync {
    /// Monotonic instant used for time-spent accounting.
    fn now(&self) -> Instant;

    /// Wall-clock time used to stamp milestones.
    fn now_utc(&self) -> OffsetDateTime;
}

/// Clock backed by the runtime.
///
/// Monotonic time goes through tokio so paused test runtimes control it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to. Used for trace replay and tests.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    base_utc: OffsetDateTime,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new(base_utc: OffsetDateTime) -> Self {
        Self {
            base: Instant::now(),
            base_utc,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *mutex_lock(&self.offset, SOURCE, "advance") += by;
    }

    pub fn elapsed(&self) -> Duration {
        *mutex_lock(&self.offset, SOURCE, "elapsed")
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    fn now_utc(&self) -> OffsetDateTime {
        self.base_utc + self.elapsed()
    }
}
