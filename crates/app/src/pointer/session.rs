//! Session flags shared between HTTP handlers and the capture loop.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::pointer::gesture::RearmPolicy;

/// Immutable view of the session flags.
///
/// Readers take a whole snapshot, so a frame never sees a half-applied
/// update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub camera_active: bool,
    pub tracking_enabled: bool,
    pub pinch_threshold: f64,
    pub rearm_policy: RearmPolicy,
}

impl SessionSnapshot {
    pub fn new(pinch_threshold: f64, rearm_policy: RearmPolicy) -> Self {
        Self {
            camera_active: false,
            tracking_enabled: false,
            pinch_threshold,
            rearm_policy,
        }
    }
}

/// Shared, swappable session snapshot.
pub struct SessionState {
    current: Mutex<Arc<SessionSnapshot>>,
}

impl SessionState {
    pub fn new(initial: SessionSnapshot) -> Self {
        Self {
            current: Mutex::new(Arc::new(initial)),
        }
    }

    /// Current snapshot; cheap to clone and never blocks on a writer for long.
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `f` to a copy of the current snapshot and publish the result.
    pub fn update(&self, f: impl FnOnce(&mut SessionSnapshot)) -> Arc<SessionSnapshot> {
        let mut guard = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = SessionSnapshot::clone(&guard);
        f(&mut next);
        let next = Arc::new(next);
        *guard = next.clone();
        next
    }

    pub fn set_camera_active(&self, active: bool) {
        self.update(|s| s.camera_active = active);
    }

    pub fn set_tracking(&self, enabled: bool) {
        self.update(|s| s.tracking_enabled = enabled);
    }

    pub fn set_pinch_threshold(&self, threshold: f64) {
        self.update(|s| s.pinch_threshold = threshold);
    }

    pub fn set_rearm_policy(&self, policy: RearmPolicy) {
        self.update(|s| s.rearm_policy = policy);
    }
}
