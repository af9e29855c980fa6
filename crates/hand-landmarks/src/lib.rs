//! Hand landmark types shared between the detector and the gesture pipeline.
//!
//! A detected hand is a fixed set of 21 keypoints in normalized image
//! coordinates. Detectors implement [`LandmarkSource`]; the TorchScript-backed
//! detector is available behind the `with-tch` feature.

#[cfg(feature = "with-tch")]
pub mod detector;
pub mod landmarks;
pub mod source;

pub use landmarks::{HAND_CONNECTIONS, HandJoint, HandLandmarks, LANDMARK_COUNT, Landmark, LandmarkError};
pub use source::LandmarkSource;

#[cfg(feature = "with-tch")]
pub use tch;
