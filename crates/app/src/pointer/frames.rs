use std::sync::Arc;

use image::RgbImage;
use tokio::sync::watch;

/// Placeholder shown before the first frame arrives.
pub(crate) const PLACEHOLDER_SIZE: (u32, u32) = (640, 480);

/// One annotated preview frame.
#[derive(Debug, Clone)]
pub struct FramePacket {
    pub image: RgbImage,
    pub frame_number: u64,
    pub timestamp_ms: i64,
    pub fps: f32,
}

/// Single-slot buffer holding the latest annotated frame.
///
/// Publishing replaces the previous frame; readers always see the newest one
/// and may see the same frame more than once. The slot outlives capture
/// sessions, so the last frame stays visible after the camera stops.
#[derive(Clone)]
pub struct FrameSlot {
    tx: Arc<watch::Sender<Option<Arc<FramePacket>>>>,
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, packet: FramePacket) {
        self.tx.send_replace(Some(Arc::new(packet)));
    }

    pub fn latest(&self) -> Option<Arc<FramePacket>> {
        self.tx.borrow().clone()
    }
}

/// Black frame served while the slot is empty.
pub(crate) fn placeholder_image() -> RgbImage {
    RgbImage::new(PLACEHOLDER_SIZE.0, PLACEHOLDER_SIZE.1)
}
