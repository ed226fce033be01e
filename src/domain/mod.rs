//! Domain layer types and invariants.

pub mod error;
pub mod geometry;
pub mod milestones;
pub mod progress;
pub mod types;
