//! Port over the host page: element geometry and the events that drive updates.

use crate::domain::{geometry::ContentRect, types::ContentSelector};

/// Geometry queries a host page must answer for the tracker.
pub trait ReadingSurface: Send + Sync {
    /// Bounding box of the first element matching `selector`, or `None` when nothing matches.
    fn content_rect(&self, selector: &ContentSelector) -> Option<ContentRect>;

    /// Current viewport height in the same units as [`ContentRect`].
    fn viewport_height(&self) -> f64;

    /// Whether the host can report intersection ratios at all.
    fn supports_intersection(&self) -> bool {
        true
    }
}

/// Events a host forwards to a running tracking session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    Scroll,
    Resize,
    /// Fraction of the tracked element currently intersecting the viewport.
    Intersection { ratio: f64 },
    /// The page is about to be discarded.
    Unload,
}

impl SurfaceEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SurfaceEvent::Scroll => "scroll",
            SurfaceEvent::Resize => "resize",
            SurfaceEvent::Intersection { .. } => "intersection",
            SurfaceEvent::Unload => "unload",
        }
    }
}
