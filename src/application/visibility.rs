//! Visibility detection for the tracked content region.

use tracing::debug;

use crate::domain::types::ContentSelector;

use super::surface::ReadingSurface;

/// Result of feeding an intersection ratio to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityChange {
    BecameVisible,
    BecameHidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    Observing,
    /// Nothing to observe; always reports not visible.
    Inert,
    Disconnected,
}

/// Turns intersection ratios into visible / hidden transitions.
#[derive(Debug, Clone)]
pub struct VisibilityDetector {
    threshold: f64,
    state: DetectorState,
    visible: bool,
}

impl VisibilityDetector {
    /// Attach to the element matching `selector`.
    ///
    /// A surface without intersection support, or a selector that matches
    /// nothing, yields an inert detector.
    pub fn attach(surface: &dyn ReadingSurface, selector: &ContentSelector, threshold: f64) -> Self {
        let state = if !surface.supports_intersection() {
            debug!(selector = %selector, "Intersection observation unavailable; visibility inert");
            DetectorState::Inert
        } else if surface.content_rect(selector).is_none() {
            debug!(selector = %selector, "Content selector matched nothing; visibility inert");
            DetectorState::Inert
        } else {
            DetectorState::Observing
        };

        Self {
            threshold,
            state,
            visible: false,
        }
    }

    /// Feed one intersection observation. Returns a change only when visibility flips.
    pub fn observe(&mut self, ratio: f64) -> Option<VisibilityChange> {
        if self.state != DetectorState::Observing {
            return None;
        }

        let visible = ratio.is_finite() && ratio > 0.0 && ratio >= self.threshold;
        if visible == self.visible {
            return None;
        }
        self.visible = visible;

        if visible {
            Some(VisibilityChange::BecameVisible)
        } else {
            Some(VisibilityChange::BecameHidden)
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_inert(&self) -> bool {
        self.state == DetectorState::Inert
    }

    pub fn is_connected(&self) -> bool {
        self.state != DetectorState::Disconnected
    }

    /// Stop observing; later observations are ignored.
    pub fn disconnect(&mut self) {
        self.state = DetectorState::Disconnected;
        self.visible = false;
    }
}
