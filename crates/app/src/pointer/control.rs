//! Session lifecycle: camera start/stop and live setting changes.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use hand_landmarks::LandmarkSource;
use thiserror::Error;
use tracing::{info, warn};
use video_ingest::{CaptureError, FrameSource};

use crate::pointer::{
    capture::{CaptureHandle, FrameProcessor, SharedDetector, SharedInjector, spawn_capture_loop},
    frames::FrameSlot,
    gesture::{GestureInterpreter, RearmPolicy},
    injector::{PointerInjector, ScreenSize},
    session::{SessionSnapshot, SessionState},
};

/// Opens the configured camera.
pub type CameraOpener =
    Box<dyn Fn() -> Result<Box<dyn FrameSource>, CaptureError> + Send + Sync>;
/// Loads the landmark detector; called at most once per successful load.
pub type DetectorLoader = Box<dyn Fn() -> anyhow::Result<Box<dyn LandmarkSource>> + Send + Sync>;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("camera is already running")]
    AlreadyRunning,
    #[error("landmark detector unavailable: {0:#}")]
    Detector(anyhow::Error),
    #[error("Could not open camera: {0}")]
    Camera(#[from] CaptureError),
    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Owns the capture session and the shared state HTTP handlers act on.
pub struct SessionController {
    session: Arc<SessionState>,
    slot: FrameSlot,
    capture: Mutex<Option<CaptureHandle>>,
    detector: Mutex<Option<SharedDetector>>,
    injector: SharedInjector,
    open_camera: CameraOpener,
    load_detector: DetectorLoader,
    screen: ScreenSize,
    debounce: Duration,
    track_on_start: bool,
}

/// Construction parameters for [`SessionController`].
pub struct ControllerOptions {
    pub screen: ScreenSize,
    pub debounce: Duration,
    pub pinch_threshold: f64,
    pub rearm_policy: RearmPolicy,
    pub track_on_start: bool,
}

impl SessionController {
    pub fn new(
        options: ControllerOptions,
        injector: Box<dyn PointerInjector>,
        open_camera: CameraOpener,
        load_detector: DetectorLoader,
    ) -> Self {
        let initial = SessionSnapshot::new(options.pinch_threshold, options.rearm_policy);
        Self {
            session: Arc::new(SessionState::new(initial)),
            slot: FrameSlot::new(),
            capture: Mutex::new(None),
            detector: Mutex::new(None),
            injector: Arc::new(Mutex::new(injector)),
            open_camera,
            load_detector,
            screen: options.screen,
            debounce: options.debounce,
            track_on_start: options.track_on_start,
        }
    }

    pub fn slot(&self) -> &FrameSlot {
        &self.slot
    }

    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.session.snapshot()
    }

    /// Open the camera and start the capture loop.
    ///
    /// Blocks while the detector loads (first start only) and the device
    /// opens; call it off the async executor.
    pub fn start(&self) -> Result<(), ControlError> {
        let mut capture = self.capture.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = capture.take() {
            if !handle.is_finished() {
                *capture = Some(handle);
                return Err(ControlError::AlreadyRunning);
            }
            warn!("previous capture loop exited unexpectedly; restarting");
            handle.stop();
        }

        let detector = self.detector()?;
        let source = (self.open_camera)()?;
        let camera = source.describe().to_string();

        let processor = FrameProcessor::new(
            detector,
            self.injector.clone(),
            GestureInterpreter::new(self.screen, self.debounce),
            self.session.clone(),
            self.slot.clone(),
        );
        *capture = Some(spawn_capture_loop(source, processor)?);

        let track = self.track_on_start;
        self.session.update(|s| {
            s.camera_active = true;
            if track {
                s.tracking_enabled = true;
            }
        });
        info!("camera {camera} started");
        Ok(())
    }

    /// Stop the capture loop and release the camera. Idempotent.
    pub fn stop(&self) {
        let handle = self
            .capture
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop();
            info!("camera stopped");
        }
        self.session.set_camera_active(false);
    }

    pub fn set_tracking(&self, enabled: bool) {
        self.session.set_tracking(enabled);
        info!("tracking {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn set_pinch_threshold(&self, threshold: f64) {
        self.session.set_pinch_threshold(threshold);
        info!("pinch threshold set to {threshold}");
    }

    pub fn set_rearm_policy(&self, policy: RearmPolicy) {
        self.session.set_rearm_policy(policy);
        info!("click re-arm policy set to {}", policy.label());
    }

    fn detector(&self) -> Result<SharedDetector, ControlError> {
        let mut slot = self.detector.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(detector) = slot.as_ref() {
            return Ok(detector.clone());
        }
        let detector: SharedDetector = Arc::new(Mutex::new(
            (self.load_detector)().map_err(ControlError::Detector)?,
        ));
        *slot = Some(detector.clone());
        Ok(detector)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}
