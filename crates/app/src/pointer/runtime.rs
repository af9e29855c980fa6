//! Wires configuration, telemetry, the controller and the HTTP server.

use std::sync::Arc;

use anyhow::Result;
use hand_landmarks::LandmarkSource;
use tracing::{debug, info};
use video_ingest::{CaptureError, FrameSource};

use crate::pointer::{
    InjectorKind, PointerConfig,
    control::{CameraOpener, ControllerOptions, DetectorLoader, SessionController},
    frames::placeholder_image,
    injector::{LoggingInjector, PointerInjector, XdotoolInjector, resolve_screen_size},
    server::{ServerState, run_server},
    telemetry,
};

/// Serve the dashboard until shutdown, then release the camera.
pub fn run(config: PointerConfig) -> Result<()> {
    let _telemetry_guard = telemetry::init_tracing(&config.telemetry);
    let _ = telemetry::init_metrics_recorder();
    let run_span = tracing::info_span!(
        "pointer.run",
        source = %config.camera_uri,
        width = config.capture_size.0,
        height = config.capture_size.1,
        bind = %config.bind,
        injector = ?config.injector
    );
    let _run_guard = run_span.enter();

    let injector = build_injector(config.injector)?;
    let screen = resolve_screen_size(config.screen_size, &*injector);
    info!("pointer mapped onto a {}x{} screen", screen.width, screen.height);
    debug!(
        "pinch threshold {} px, debounce {:?}, re-arm {}",
        config.pinch_threshold,
        config.debounce,
        config.rearm_policy.label()
    );

    let controller = Arc::new(SessionController::new(
        ControllerOptions {
            screen,
            debounce: config.debounce,
            pinch_threshold: config.pinch_threshold,
            rearm_policy: config.rearm_policy,
            track_on_start: config.track_on_start,
        },
        injector,
        camera_opener(&config),
        detector_loader(&config),
    ));

    let state = ServerState {
        controller: controller.clone(),
        placeholder: Arc::new(placeholder_image()),
        jpeg_quality: config.jpeg_quality,
        stream_interval: config.stream_interval,
    };
    let served = run_server(config.bind, state);

    info!("shutting down");
    controller.stop();
    served
}

fn build_injector(kind: InjectorKind) -> Result<Box<dyn PointerInjector>> {
    match kind {
        InjectorKind::Xdotool => Ok(Box::new(XdotoolInjector::new()?)),
        InjectorKind::Log => {
            info!("dry run: pointer commands are only logged");
            Ok(Box::new(LoggingInjector))
        }
    }
}

fn camera_opener(config: &PointerConfig) -> CameraOpener {
    let uri = config.camera_uri.clone();
    let size = config.capture_size;
    Box::new(move || -> Result<Box<dyn FrameSource>, CaptureError> {
        video_ingest::open_camera(&uri, size)
    })
}

#[cfg(feature = "with-tch")]
fn detector_loader(config: &PointerConfig) -> DetectorLoader {
    use anyhow::Context;
    use hand_landmarks::{detector::TorchLandmarkDetector, tch::Device};

    let model = config.model_path.clone();
    let input_size = config.detector_size;
    let min_confidence = config.min_detection_confidence;
    Box::new(move || -> Result<Box<dyn LandmarkSource>> {
        let model = model
            .as_ref()
            .context("--model is required to load the landmark detector")?;
        let detector = TorchLandmarkDetector::new(model, Device::cuda_if_available(), input_size)
            .with_context(|| format!("failed to load landmark model {}", model.display()))?
            .with_presence_threshold(min_confidence);
        info!(
            "landmark detector loaded from {} on {:?}",
            model.display(),
            detector.device()
        );
        Ok(Box::new(detector))
    })
}

#[cfg(not(feature = "with-tch"))]
fn detector_loader(config: &PointerConfig) -> DetectorLoader {
    debug!(
        "detector options ignored (model {:?}, size {}, confidence {})",
        config.model_path, config.detector_size, config.min_detection_confidence
    );
    Box::new(|| -> Result<Box<dyn LandmarkSource>> {
        anyhow::bail!("built without a landmark detector; rebuild with --features with-tch")
    })
}
