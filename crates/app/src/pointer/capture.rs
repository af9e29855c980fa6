//! Capture loop: camera → landmarks → gestures → pointer + preview frame.
//!
//! The loop runs on its own thread and owns the camera for the lifetime of a
//! session. It checks the cancellation token before every read and releases
//! the device when it exits, so a stop request that has returned guarantees no
//! further reads.

use std::{
    io,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use hand_landmarks::LandmarkSource;
use image::imageops;
use tracing::{debug, warn};
use video_ingest::{Frame, FrameSource};

use crate::pointer::{
    annotation::{apply_annotations, bgr_to_rgb, draw_info, draw_skeleton},
    frames::{FramePacket, FrameSlot},
    gesture::GestureInterpreter,
    injector::PointerInjector,
    session::SessionState,
    telemetry,
};

/// Pause after every processed frame.
pub(crate) const FRAME_PAUSE: Duration = Duration::from_millis(10);
/// Back-off after a failed camera read.
pub(crate) const READ_RETRY_PAUSE: Duration = Duration::from_millis(50);
/// Minimum gap between two "read failed" warnings.
const READ_FAILURE_LOG_INTERVAL: Duration = Duration::from_secs(2);

pub(crate) type SharedDetector = Arc<Mutex<Box<dyn LandmarkSource>>>;
pub(crate) type SharedInjector = Arc<Mutex<Box<dyn PointerInjector>>>;

/// Per-frame work, independent of the thread that drives it.
pub(crate) struct FrameProcessor {
    detector: SharedDetector,
    injector: SharedInjector,
    interpreter: GestureInterpreter,
    session: Arc<SessionState>,
    slot: FrameSlot,
    frame_number: u64,
    smoothed_fps: f32,
    last_instant: Option<Instant>,
}

impl FrameProcessor {
    pub(crate) fn new(
        detector: SharedDetector,
        injector: SharedInjector,
        interpreter: GestureInterpreter,
        session: Arc<SessionState>,
        slot: FrameSlot,
    ) -> Self {
        Self {
            detector,
            injector,
            interpreter,
            session,
            slot,
            frame_number: 0,
            smoothed_fps: 0.0,
            last_instant: None,
        }
    }

    /// Process one captured frame and publish the annotated result.
    pub(crate) fn process(&mut self, frame: &Frame, now: Instant) -> Result<()> {
        let stage_start = Instant::now();
        self.frame_number = self.frame_number.wrapping_add(1);
        self.update_fps(now);
        let _frame_guard = tracing::info_span!(
            "capture.frame",
            frame = self.frame_number,
            fps = self.smoothed_fps,
            timestamp = frame.timestamp_ms
        )
        .entered();

        let mut image = bgr_to_rgb(frame)?;
        imageops::flip_horizontal_in_place(&mut image);

        let hand = {
            let mut detector = self.detector.lock().unwrap_or_else(PoisonError::into_inner);
            match detector.detect(&image) {
                Ok(hand) => hand,
                Err(err) => {
                    metrics::counter!("pointer_detector_errors_total").increment(1);
                    debug!("landmark detection failed on frame {}: {err:#}", self.frame_number);
                    None
                }
            }
        };

        if let Some(hand) = hand.as_ref() {
            draw_skeleton(&mut image, hand);
        }

        let session = self.session.snapshot();
        let output = self
            .interpreter
            .interpret(hand.as_ref(), image.dimensions(), &session, now);

        if output.cursor.is_some() || !output.clicks.is_empty() {
            let mut injector = self.injector.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(cursor) = output.cursor {
                injector.move_to(cursor.x, cursor.y);
            }
            for kind in &output.clicks {
                metrics::counter!("pointer_clicks_total", "button" => kind.label()).increment(1);
                debug!("{} click on frame {}", kind.label(), self.frame_number);
                injector.click(*kind);
            }
        }

        apply_annotations(&mut image, &output.annotations);
        draw_info(&mut image, self.frame_number, self.smoothed_fps);

        if self.frame_number % 30 == 0 {
            debug!(
                "Capture heartbeat: frame #{}, {:.1} fps, hand={}",
                self.frame_number,
                self.smoothed_fps,
                hand.as_ref()
                    .map_or_else(|| "none".to_string(), |h| format!("{:.2}", h.score))
            );
        }

        self.slot.publish(FramePacket {
            image,
            frame_number: self.frame_number,
            timestamp_ms: frame.timestamp_ms,
            fps: self.smoothed_fps,
        });

        metrics::counter!("pointer_frames_total").increment(1);
        metrics::histogram!("pointer_frame_processing_seconds")
            .record(stage_start.elapsed().as_secs_f64());
        Ok(())
    }

    fn update_fps(&mut self, now: Instant) {
        if let Some(last) = self.last_instant.replace(now) {
            let elapsed = now.saturating_duration_since(last).as_secs_f32();
            if elapsed > 0.0 {
                let instant = 1.0 / elapsed;
                self.smoothed_fps = if self.smoothed_fps == 0.0 {
                    instant
                } else {
                    0.9 * self.smoothed_fps + 0.1 * instant
                };
            }
        }
        metrics::gauge!("pointer_capture_fps").set(self.smoothed_fps as f64);
    }
}

/// Running capture session.
pub(crate) struct CaptureHandle {
    active: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl CaptureHandle {
    /// Whether the loop thread has exited on its own.
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Clear the token and wait until the loop has released the camera.
    pub(crate) fn stop(self) {
        self.active.store(false, Ordering::SeqCst);
        if self.handle.join().is_err() {
            warn!("capture loop panicked");
        }
    }
}

/// Start the capture loop on a dedicated thread.
///
/// The loop owns `source` and drops it on exit.
pub(crate) fn spawn_capture_loop(
    mut source: Box<dyn FrameSource>,
    mut processor: FrameProcessor,
) -> io::Result<CaptureHandle> {
    let active = Arc::new(AtomicBool::new(true));
    let token = active.clone();
    let handle = telemetry::spawn_thread("pointer-capture", move || {
        let loop_span = tracing::info_span!("capture.loop", source = %source.describe());
        let _loop_guard = loop_span.enter();
        let mut last_failure_log: Option<Instant> = None;

        while token.load(Ordering::SeqCst) {
            match source.read_frame() {
                Ok(frame) => {
                    if let Err(err) = processor.process(&frame, Instant::now()) {
                        warn!("dropping frame: {err:#}");
                    }
                    thread::sleep(FRAME_PAUSE);
                }
                Err(err) => {
                    metrics::counter!("pointer_capture_read_failures_total").increment(1);
                    let now = Instant::now();
                    let due = last_failure_log
                        .is_none_or(|at| now.duration_since(at) >= READ_FAILURE_LOG_INTERVAL);
                    if due {
                        warn!("camera read failed, retrying: {err}");
                        last_failure_log = Some(now);
                    }
                    thread::sleep(READ_RETRY_PAUSE);
                }
            }
        }

        debug!("capture loop exiting; releasing {}", source.describe());
        drop(source);
    })?;

    Ok(CaptureHandle { active, handle })
}
