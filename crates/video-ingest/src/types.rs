use thiserror::Error;

/// Raw frame captured from a video source.
#[derive(Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: i64,
    pub format: FrameFormat,
}

impl Frame {
    /// Number of bytes a tightly packed frame of this size occupies.
    pub fn expected_len(width: u32, height: u32, format: FrameFormat) -> usize {
        (width as usize) * (height as usize) * format.bytes_per_pixel()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameFormat {
    Bgr8,
}

impl FrameFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            FrameFormat::Bgr8 => 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open video source {uri:?}")]
    Open { uri: String },
    #[error("no frame from {uri:?} within {timeout_ms} ms")]
    Timeout { uri: String, timeout_ms: u64 },
    #[error("video source {uri:?} closed")]
    Closed { uri: String },
    #[error("video source returned an empty frame")]
    EmptyFrame,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A camera-like device that yields one frame per call.
///
/// Implementations own the underlying handle; dropping the source releases it.
pub trait FrameSource: Send {
    /// Block until the next frame is available or the read fails.
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Human readable identifier used in logs.
    fn describe(&self) -> &str;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        (**self).read_frame()
    }

    fn describe(&self) -> &str {
        (**self).describe()
    }
}
