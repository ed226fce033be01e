//! Analytics delivery: bounded queue, background dispatcher and clients.

mod dispatcher;
mod http;
mod log;
mod queue;

pub use dispatcher::{AnalyticsDispatcher, DeliveryReport, DispatcherHandle};
pub use http::HttpAnalyticsClient;
pub use log::LogAnalyticsClient;
pub use queue::{AnalyticsQueue, DEFAULT_QUEUE_LIMIT};
