use std::{
    io::Read,
    path::Path,
    process::{Child, Command, Stdio},
    thread,
    time::Duration,
};

use anyhow::anyhow;
use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use tracing::{debug, warn};

use crate::{
    parse_device_index,
    types::{CaptureError, Frame, FrameFormat, FrameSource},
};

/// Upper bound on a single [`FfmpegCamera::read_frame`] call.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
/// How long [`FfmpegCamera::open`] waits for the first frame.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Camera backed by an `ffmpeg` process emitting raw BGR24 frames on stdout.
///
/// A reader thread slices stdout into frames and forwards them over a small
/// bounded channel. Dropping the camera kills the process, which closes the
/// pipe and ends the reader thread.
pub struct FfmpegCamera {
    uri: String,
    rx: Receiver<Result<Frame, CaptureError>>,
    child: Child,
    read_timeout: Duration,
    pending: Option<Frame>,
}

impl FfmpegCamera {
    /// Spawn `ffmpeg` for `uri`, scaling output to `target_size`.
    ///
    /// The camera only counts as open once the first frame has arrived; a
    /// busy device, a bad path or an unreachable stream fails here instead of
    /// on the first read.
    pub fn open(uri: &str, target_size: (u32, u32)) -> Result<Self, CaptureError> {
        if let Some(device) = v4l_device_path(uri) {
            if !Path::new(&device).exists() {
                return Err(CaptureError::Open {
                    uri: uri.to_string(),
                });
            }
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.args(ffmpeg_args(uri, target_size));
        Self::spawn(cmd, uri, target_size, DEFAULT_OPEN_TIMEOUT)
    }

    /// Run `cmd` as the frame producer and wait up to `open_timeout` for its
    /// first frame.
    fn spawn(
        mut cmd: Command,
        uri: &str,
        target_size: (u32, u32),
        open_timeout: Duration,
    ) -> Result<Self, CaptureError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|err| {
            warn!("failed to spawn ffmpeg for {uri}: {err}");
            CaptureError::Open {
                uri: uri.to_string(),
            }
        })?;
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                reap(&mut child);
                return Err(CaptureError::Other(anyhow!("failed to capture ffmpeg stdout")));
            }
        };

        let (tx, rx) = bounded(2);
        let reader_uri = uri.to_string();
        let spawned = thread::Builder::new()
            .name("ffmpeg-reader".into())
            .spawn(move || {
                if let Err(err) = read_raw_frames(stdout, target_size, &tx) {
                    debug!("ffmpeg reader for {reader_uri} stopped: {err}");
                    let _ = tx.send(Err(err));
                }
            });
        if let Err(err) = spawned {
            reap(&mut child);
            return Err(CaptureError::Other(err.into()));
        }

        let first = match rx.recv_timeout(open_timeout) {
            Ok(Ok(frame)) => frame,
            Ok(Err(err)) => {
                warn!("ffmpeg produced no frame for {uri}: {err}");
                reap(&mut child);
                return Err(CaptureError::Open {
                    uri: uri.to_string(),
                });
            }
            Err(err) => {
                warn!("ffmpeg produced no frame for {uri}: {err}");
                reap(&mut child);
                return Err(CaptureError::Open {
                    uri: uri.to_string(),
                });
            }
        };

        Ok(Self {
            uri: uri.to_string(),
            rx,
            child,
            read_timeout: DEFAULT_READ_TIMEOUT,
            pending: Some(first),
        })
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl FrameSource for FfmpegCamera {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        if let Some(frame) = self.pending.take() {
            return Ok(frame);
        }
        match self.rx.recv_timeout(self.read_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(CaptureError::Timeout {
                uri: self.uri.clone(),
                timeout_ms: self.read_timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::Closed {
                uri: self.uri.clone(),
            }),
        }
    }

    fn describe(&self) -> &str {
        &self.uri
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        reap(&mut self.child);
        debug!("released ffmpeg capture for {}", self.uri);
    }
}

/// Build the `ffmpeg` argument list producing raw BGR24 frames of `target_size`.
pub fn ffmpeg_args(uri: &str, target_size: (u32, u32)) -> Vec<String> {
    let (width, height) = target_size;
    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let input = match v4l_device_path(uri) {
        Some(device) => {
            args.extend(
                [
                    "-f".to_string(),
                    "video4linux2".to_string(),
                    "-video_size".to_string(),
                    format!("{width}x{height}"),
                ]
                .into_iter(),
            );
            device
        }
        None => uri.to_string(),
    };

    args.extend([
        "-i".to_string(),
        input,
        "-an".to_string(),
        "-vf".to_string(),
        format!("scale={width}:{height}"),
        "-pix_fmt".to_string(),
        "bgr24".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-".to_string(),
    ]);
    args
}

fn v4l_device_path(uri: &str) -> Option<String> {
    if uri.starts_with("/dev/video") {
        return Some(uri.to_string());
    }
    parse_device_index(uri).map(|index| format!("/dev/video{index}"))
}

/// Slice a raw BGR24 byte stream into frames until the stream ends or the
/// receiver goes away.
fn read_raw_frames(
    mut stdout: impl Read,
    target_size: (u32, u32),
    tx: &Sender<Result<Frame, CaptureError>>,
) -> Result<(), CaptureError> {
    let frame_bytes = Frame::expected_len(target_size.0, target_size.1, FrameFormat::Bgr8);
    let mut buffer = vec![0u8; frame_bytes];

    loop {
        match stdout.read_exact(&mut buffer) {
            Ok(()) => {
                let frame = Frame {
                    data: buffer.clone(),
                    width: target_size.0,
                    height: target_size.1,
                    timestamp_ms: Utc::now().timestamp_millis(),
                    format: FrameFormat::Bgr8,
                };
                if tx.send(Ok(frame)).is_err() {
                    return Ok(());
                }
            }
            Err(err) => return Err(CaptureError::Other(err.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn device_index_uses_v4l_input() {
        let args = ffmpeg_args("0", (640, 480));
        let joined = args.join(" ");
        assert!(joined.contains("-f video4linux2 -video_size 640x480 -i /dev/video0"));
        assert!(joined.ends_with("-pix_fmt bgr24 -f rawvideo -"));
    }

    #[test]
    fn stream_urls_pass_through() {
        let args = ffmpeg_args("rtsp://camera.local/stream", (320, 240));
        assert!(!args.iter().any(|a| a == "video4linux2"));
        let input = args.iter().position(|a| a == "-i").expect("input flag");
        assert_eq!(args[input + 1], "rtsp://camera.local/stream");
        assert!(args.iter().any(|a| a == "scale=320:240"));
    }

    #[test]
    fn missing_device_fails_to_open() {
        match FfmpegCamera::open("/dev/video987", (640, 480)) {
            Err(CaptureError::Open { uri }) => assert_eq!(uri, "/dev/video987"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("nonexistent device opened"),
        }
    }

    fn shell(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    }

    #[test]
    fn source_that_exits_early_fails_to_open() {
        let cmd = shell("echo 'No such file or directory' >&2; exit 1");
        match FfmpegCamera::spawn(cmd, "/tmp/missing.mp4", (64, 48), Duration::from_secs(5)) {
            Err(CaptureError::Open { uri }) => assert_eq!(uri, "/tmp/missing.mp4"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unreadable source opened"),
        }
    }

    #[test]
    fn silent_source_times_out_on_open() {
        let cmd = shell("exec sleep 5");
        let started = std::time::Instant::now();
        let result = FfmpegCamera::spawn(cmd, "rtsp://stalled", (2, 2), Duration::from_millis(100));
        assert!(matches!(result, Err(CaptureError::Open { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn first_frame_is_kept_for_the_first_read() {
        let frame_len = Frame::expected_len(2, 2, FrameFormat::Bgr8);
        let cmd = shell(&format!("head -c {frame_len} /dev/zero; exec sleep 5"));
        let mut camera = FfmpegCamera::spawn(cmd, "fake", (2, 2), Duration::from_secs(5))
            .expect("first frame arrives");
        let frame = camera.read_frame().expect("pending frame");
        assert_eq!(frame.data, vec![0u8; frame_len]);
        assert_eq!((frame.width, frame.height), (2, 2));
    }

    #[test]
    fn raw_reader_splits_stream_into_frames() {
        let frame_len = Frame::expected_len(2, 2, FrameFormat::Bgr8);
        let mut bytes = vec![1u8; frame_len];
        bytes.extend(vec![2u8; frame_len]);
        bytes.extend(vec![3u8; frame_len / 2]);

        let (tx, rx) = bounded(4);
        let result = read_raw_frames(Cursor::new(bytes), (2, 2), &tx);
        assert!(matches!(result, Err(CaptureError::Other(_))));

        let first = rx.try_recv().expect("first frame").expect("ok frame");
        let second = rx.try_recv().expect("second frame").expect("ok frame");
        assert_eq!(first.data, vec![1u8; frame_len]);
        assert_eq!(second.data, vec![2u8; frame_len]);
        assert_eq!((second.width, second.height), (2, 2));
        assert!(rx.try_recv().is_err());
    }
}
