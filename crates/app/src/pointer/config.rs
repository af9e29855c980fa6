//! Configuration parsing for the gesture pointer.
//!
//! CLI arguments are parsed by clap into [`PointerCliArgs`] and validated into
//! a [`PointerConfig`] which the rest of the application uses without
//! re-reading flags.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};

use crate::pointer::{gesture::RearmPolicy, injector::ScreenSize};

pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub(crate) const DEFAULT_PINCH_THRESHOLD: f64 = 20.0;
pub(crate) const DEFAULT_DEBOUNCE_MS: u64 = 700;

/// Backend used to move the OS pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InjectorKind {
    /// Drive the X11 pointer through the `xdotool` command.
    Xdotool,
    /// Only log pointer commands (dry run).
    Log,
}

#[derive(Clone, Debug)]
/// Validated configuration shared by the server, controller and capture loop.
pub struct PointerConfig {
    /// Camera URI or device identifier.
    pub camera_uri: String,
    /// Capture size requested from the camera.
    pub capture_size: (u32, u32),
    /// TorchScript landmark model.
    pub model_path: Option<PathBuf>,
    /// Square detector input size.
    pub detector_size: u32,
    /// Minimum hand presence score.
    pub min_detection_confidence: f32,
    /// HTTP listen address.
    pub bind: SocketAddr,
    /// Screen size override; resolved from the injector when absent.
    pub screen_size: Option<ScreenSize>,
    /// Initial pinch threshold in frame pixels.
    pub pinch_threshold: f64,
    /// Minimum gap between two clicks of the same button.
    pub debounce: Duration,
    /// Initial click re-arm policy.
    pub rearm_policy: RearmPolicy,
    /// JPEG quality for the preview stream.
    pub jpeg_quality: u8,
    /// Delay between two streamed preview frames.
    pub stream_interval: Duration,
    /// Pointer backend.
    pub injector: InjectorKind,
    /// Start with tracking enabled.
    pub track_on_start: bool,
    /// Telemetry and instrumentation options.
    pub telemetry: TelemetryOptions,
}

#[derive(Clone, Debug, Default)]
/// Optional telemetry knobs for tracing output.
pub struct TelemetryOptions {
    /// Write a Chrome trace JSON file capturing capture-loop spans.
    pub chrome_trace_path: Option<PathBuf>,
    /// Default log level when `RUST_LOG` is unset.
    pub verbose: bool,
}

/// CLI arguments accepted by `gesture-pointer`.
#[derive(Debug, Args)]
pub struct PointerCliArgs {
    /// Camera index, `/dev/videoN` path, file or stream URL.
    #[arg(long = "source", value_name = "URI", default_value = "0")]
    pub source: String,
    /// Capture width in pixels.
    #[arg(long = "width", value_name = "PX", default_value_t = 640)]
    pub width: u32,
    /// Capture height in pixels.
    #[arg(long = "height", value_name = "PX", default_value_t = 480)]
    pub height: u32,
    /// TorchScript hand landmark model.
    #[arg(long = "model", value_name = "PATH")]
    pub model: Option<PathBuf>,
    /// Square detector input size in pixels.
    #[arg(long = "detector-size", value_name = "PX", default_value_t = 224)]
    pub detector_size: u32,
    /// Minimum hand presence score (0-1).
    #[arg(long = "min-detection-confidence", value_name = "SCORE", default_value_t = 0.7)]
    pub min_detection_confidence: f32,
    /// HTTP listen address.
    #[arg(long = "bind", value_name = "ADDR", default_value = DEFAULT_BIND)]
    pub bind: String,
    /// Screen width override in pixels.
    #[arg(long = "screen-width", value_name = "PX", requires = "screen_height")]
    pub screen_width: Option<u32>,
    /// Screen height override in pixels.
    #[arg(long = "screen-height", value_name = "PX", requires = "screen_width")]
    pub screen_height: Option<u32>,
    /// Initial pinch distance threshold in frame pixels.
    #[arg(long = "click-distance", value_name = "PX", default_value_t = DEFAULT_PINCH_THRESHOLD)]
    pub click_distance: f64,
    /// Minimum milliseconds between two clicks of the same button.
    #[arg(long = "debounce-ms", value_name = "MS", default_value_t = DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,
    /// When a held pinch may click again.
    #[arg(long = "rearm", value_enum, default_value_t = RearmPolicy::Interval)]
    pub rearm: RearmPolicy,
    /// JPEG quality used by the preview stream (1-100).
    #[arg(long = "jpeg-quality", value_name = "QUALITY", default_value_t = 85)]
    pub jpeg_quality: u8,
    /// Milliseconds between two streamed preview frames.
    #[arg(long = "stream-interval-ms", value_name = "MS", default_value_t = 33)]
    pub stream_interval_ms: u64,
    /// Pointer backend.
    #[arg(long = "injector", value_enum, default_value_t = InjectorKind::Xdotool)]
    pub injector: InjectorKind,
    /// Enable tracking as soon as the camera starts.
    #[arg(long = "track-on-start", action = clap::ArgAction::SetTrue)]
    pub track_on_start: bool,
    /// Enable verbose logging (read failures, detector errors).
    #[arg(long = "verbose", action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
    /// Emit Chrome trace JSON for post-mortem analysis.
    #[arg(long = "chrome-trace", value_name = "PATH")]
    pub chrome_trace: Option<PathBuf>,
}

impl TryFrom<PointerCliArgs> for PointerConfig {
    type Error = anyhow::Error;

    fn try_from(args: PointerCliArgs) -> Result<Self> {
        if args.width == 0 || args.height == 0 {
            bail!("Capture width and height must be positive integers");
        }
        if args.detector_size == 0 {
            bail!("--detector-size must be a positive integer");
        }
        if !(0.0..=1.0).contains(&args.min_detection_confidence) {
            bail!("--min-detection-confidence must be between 0 and 1");
        }
        if !args.click_distance.is_finite() || args.click_distance < 0.0 {
            bail!("--click-distance must be a non-negative number");
        }
        if !(1..=100).contains(&args.jpeg_quality) {
            bail!("--jpeg-quality must be an integer between 1 and 100");
        }
        if args.stream_interval_ms == 0 {
            bail!("--stream-interval-ms must be at least 1");
        }

        let bind: SocketAddr = args
            .bind
            .parse()
            .with_context(|| format!("--bind must be an address such as {DEFAULT_BIND}"))?;

        let screen_size = match (args.screen_width, args.screen_height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Some(ScreenSize { width, height })
            }
            (None, None) => None,
            _ => bail!("--screen-width and --screen-height must both be positive integers"),
        };

        let telemetry = TelemetryOptions {
            chrome_trace_path: args.chrome_trace,
            verbose: args.verbose,
        };

        Ok(Self {
            camera_uri: args.source,
            capture_size: (args.width, args.height),
            model_path: args.model,
            detector_size: args.detector_size,
            min_detection_confidence: args.min_detection_confidence,
            bind,
            screen_size,
            pinch_threshold: args.click_distance,
            debounce: Duration::from_millis(args.debounce_ms),
            rearm_policy: args.rearm,
            jpeg_quality: args.jpeg_quality,
            stream_interval: Duration::from_millis(args.stream_interval_ms),
            injector: args.injector,
            track_on_start: args.track_on_start,
            telemetry,
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: PointerCliArgs,
    }

    fn parse(args: &[&str]) -> Result<PointerConfig> {
        let argv = std::iter::once("gesture-pointer").chain(args.iter().copied());
        let cli = TestCli::try_parse_from(argv)?;
        PointerConfig::try_from(cli.args)
    }

    #[test]
    fn defaults_match_dashboard_expectations() {
        let config = parse(&[]).expect("defaults are valid");
        assert_eq!(config.camera_uri, "0");
        assert_eq!(config.capture_size, (640, 480));
        assert_eq!(config.bind, DEFAULT_BIND.parse::<SocketAddr>().unwrap());
        assert_eq!(config.pinch_threshold, 20.0);
        assert_eq!(config.debounce, Duration::from_millis(700));
        assert_eq!(config.rearm_policy, RearmPolicy::Interval);
        assert_eq!(config.injector, InjectorKind::Xdotool);
        assert!(config.screen_size.is_none());
        assert!(!config.track_on_start);
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let config = parse(&[
            "--source",
            "/dev/video2",
            "--screen-width",
            "2560",
            "--screen-height",
            "1440",
            "--click-distance",
            "32.5",
            "--debounce-ms",
            "250",
            "--rearm",
            "release",
            "--injector",
            "log",
            "--bind",
            "0.0.0.0:8080",
        ])
        .expect("valid flags");
        assert_eq!(config.camera_uri, "/dev/video2");
        assert_eq!(
            config.screen_size,
            Some(ScreenSize {
                width: 2560,
                height: 1440
            })
        );
        assert_eq!(config.pinch_threshold, 32.5);
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.rearm_policy, RearmPolicy::Release);
        assert_eq!(config.injector, InjectorKind::Log);
        assert_eq!(config.bind.port(), 8080);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse(&["--jpeg-quality", "0"]).is_err());
        assert!(parse(&["--width", "0"]).is_err());
        assert!(parse(&["--click-distance", "-1"]).is_err());
        assert!(parse(&["--bind", "not-an-address"]).is_err());
        assert!(parse(&["--screen-width", "1920"]).is_err());
        assert!(parse(&["--stream-interval-ms", "0"]).is_err());
    }
}
