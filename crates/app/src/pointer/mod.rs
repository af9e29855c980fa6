//! Hand-gesture pointer: camera capture, pinch interpretation, OS pointer
//! injection and an HTTP dashboard with a live MJPEG preview.
//!
//! The module is split into focused submodules:
//! - `config`: CLI configuration parsing.
//! - `gesture`: Pinch interpretation and click debouncing.
//! - `session`: Shared session snapshot.
//! - `capture`: Capture loop and per-frame processing.
//! - `control`: Session lifecycle (start/stop, live settings).
//! - `frames`: Latest-frame slot shared with the server.
//! - `annotation`: Drawing primitives for the preview.
//! - `encoding`: JPEG and multipart framing.
//! - `injector`: OS pointer backends.
//! - `server`: Actix Web dashboard and API.
//! - `telemetry`: Tracing and Prometheus setup.

/// Re-export settings so callers can configure runs without reaching into
/// submodules.
pub use config::{InjectorKind, PointerCliArgs, PointerConfig};
/// Launch the dashboard and block until shutdown.
pub use runtime::run;

mod annotation;
mod capture;
mod config;
mod control;
mod encoding;
mod frames;
mod gesture;
mod injector;
mod runtime;
mod server;
mod session;
mod telemetry;
