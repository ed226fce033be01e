//! Application services: the tracker, its ports, and the session driver.

pub mod analytics;
pub mod clock;
pub mod error;
pub mod options;
pub mod session;
pub mod surface;
pub mod timer;
pub mod tracker;
pub mod visibility;
