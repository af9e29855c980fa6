use std::{convert::TryFrom, path::Path};

use anyhow::{Result, bail};
use image::{
    RgbImage,
    imageops::{self, FilterType},
};
use tch::{self, Device, Kind, Tensor};
use tracing::debug;

use crate::{
    landmarks::{HandLandmarks, LANDMARK_COUNT},
    source::LandmarkSource,
};

/// TorchScript-backed hand landmark detector.
///
/// The module receives a `[1, 3, S, S]` float tensor scaled to `0..1` and must
/// return either `[1, 63]` normalized keypoints or `[1, 64]` where the last
/// value is the hand presence score.
pub struct TorchLandmarkDetector {
    module: tch::CModule,
    device: Device,
    input_size: u32,
    presence_threshold: f32,
}

impl TorchLandmarkDetector {
    /// Load a TorchScript module onto `device`.
    pub fn new<P: AsRef<Path>>(model_path: P, device: Device, input_size: u32) -> Result<Self> {
        if input_size == 0 {
            bail!("detector input size must be positive");
        }
        let model_path = model_path.as_ref();
        let module = tch::CModule::load_on_device(model_path, device)?;
        debug!(
            "loaded landmark module {} ({}x{} input)",
            model_path.display(),
            input_size,
            input_size
        );
        Ok(Self {
            module,
            device,
            input_size,
            presence_threshold: 0.7,
        })
    }

    /// Override the minimum presence score for reporting a hand.
    pub fn with_presence_threshold(mut self, threshold: f32) -> Self {
        self.presence_threshold = threshold;
        self
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Resize an RGB frame to the model input and convert it to NCHW floats.
    pub fn image_to_tensor(&self, image: &RgbImage) -> Result<Tensor> {
        let size = self.input_size;
        let resized;
        let source = if image.dimensions() == (size, size) {
            image
        } else {
            resized = imageops::resize(image, size, size, FilterType::Triangle);
            &resized
        };

        let side = size as i64;
        let tensor = Tensor::from_slice(source.as_raw())
            .to_device(self.device)
            .to_kind(Kind::Float)
            .view([1, side, side, 3])
            .permute([0, 3, 1, 2])
            / 255.0;
        Ok(tensor)
    }

    /// Run the module and decode at most one hand.
    pub fn infer(&self, input: &Tensor) -> Result<Option<HandLandmarks>> {
        let output = tch::no_grad(|| self.module.forward_ts(&[input]))?;
        let flat = output
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .flatten(0, -1);
        let values = Vec::<f32>::try_from(&flat)?;

        let coords = LANDMARK_COUNT * 3;
        let (points, score) = match values.len() {
            n if n == coords => (&values[..], 1.0),
            n if n == coords + 1 => (&values[..coords], values[coords]),
            n => bail!("unexpected landmark output length {n}, expected {coords} or {}", coords + 1),
        };

        if score < self.presence_threshold {
            return Ok(None);
        }
        Ok(Some(HandLandmarks::from_flat(points, score)?))
    }
}

impl LandmarkSource for TorchLandmarkDetector {
    fn detect(&mut self, image: &RgbImage) -> Result<Option<HandLandmarks>> {
        let input = self.image_to_tensor(image)?;
        self.infer(&input)
    }
}
