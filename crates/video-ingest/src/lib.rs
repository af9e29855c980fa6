//! Camera ingest for the gesture pointer.
//!
//! Frames are delivered as packed BGR8 buffers through the [`FrameSource`]
//! trait. The default backend drives an `ffmpeg` subprocess; the OpenCV
//! backend is available behind the `with-opencv` feature.

#[cfg(feature = "with-opencv")]
mod camera;
mod ffmpeg;
mod types;

#[cfg(feature = "with-opencv")]
pub use camera::OpenCvCamera;
pub use ffmpeg::{DEFAULT_OPEN_TIMEOUT, DEFAULT_READ_TIMEOUT, FfmpegCamera, ffmpeg_args};
pub use types::{CaptureError, Frame, FrameFormat, FrameSource};

/// Open the camera identified by `uri` with the backend selected at build time.
///
/// `uri` may be a device index (`"0"`), a `/dev/videoN` path, a file, or a
/// stream URL understood by the backend.
pub fn open_camera(
    uri: &str,
    target_size: (u32, u32),
) -> Result<Box<dyn FrameSource>, CaptureError> {
    #[cfg(feature = "with-opencv")]
    {
        let camera = OpenCvCamera::open(uri, target_size)?;
        Ok(Box::new(camera))
    }
    #[cfg(not(feature = "with-opencv"))]
    {
        let camera = FfmpegCamera::open(uri, target_size)?;
        Ok(Box::new(camera))
    }
}

/// Parse a `/dev/videoX` style URI and return the zero-based index if present.
pub(crate) fn parse_device_index(uri: &str) -> Option<i32> {
    if let Ok(index) = uri.parse::<i32>() {
        return Some(index);
    }
    if let Some(stripped) = uri.strip_prefix("/dev/video") {
        if !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit()) {
            return stripped.parse::<i32>().ok();
        }
    }
    None
}
