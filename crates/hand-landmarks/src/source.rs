use anyhow::Result;
use image::RgbImage;

use crate::landmarks::HandLandmarks;

/// Anything that can find at most one hand in an RGB frame.
pub trait LandmarkSource: Send {
    /// Detect a hand in `image`, returning `None` when no hand is present.
    fn detect(&mut self, image: &RgbImage) -> Result<Option<HandLandmarks>>;
}

impl<T: LandmarkSource + ?Sized> LandmarkSource for Box<T> {
    fn detect(&mut self, image: &RgbImage) -> Result<Option<HandLandmarks>> {
        (**self).detect(image)
    }
}
