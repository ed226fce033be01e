//! Reading progress tracking for article views.
//!
//! The tracker samples where an article's content sits in the viewport,
//! derives scroll percent, time spent and words read, records 25/50/75/100
//! milestones and forwards progress and completion events to analytics.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub(crate) mod util;
