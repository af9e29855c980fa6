use thiserror::Error;

/// Number of keypoints in a hand landmark set.
pub const LANDMARK_COUNT: usize = 21;

/// The 21 hand keypoints, in detector output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandJoint {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl HandJoint {
    /// Position of the joint in a landmark set (0-20).
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Skeleton edges used when drawing a hand overlay.
pub const HAND_CONNECTIONS: [(HandJoint, HandJoint); 21] = [
    (HandJoint::Wrist, HandJoint::ThumbCmc),
    (HandJoint::ThumbCmc, HandJoint::ThumbMcp),
    (HandJoint::ThumbMcp, HandJoint::ThumbIp),
    (HandJoint::ThumbIp, HandJoint::ThumbTip),
    (HandJoint::Wrist, HandJoint::IndexMcp),
    (HandJoint::IndexMcp, HandJoint::IndexPip),
    (HandJoint::IndexPip, HandJoint::IndexDip),
    (HandJoint::IndexDip, HandJoint::IndexTip),
    (HandJoint::IndexMcp, HandJoint::MiddleMcp),
    (HandJoint::MiddleMcp, HandJoint::MiddlePip),
    (HandJoint::MiddlePip, HandJoint::MiddleDip),
    (HandJoint::MiddleDip, HandJoint::MiddleTip),
    (HandJoint::MiddleMcp, HandJoint::RingMcp),
    (HandJoint::RingMcp, HandJoint::RingPip),
    (HandJoint::RingPip, HandJoint::RingDip),
    (HandJoint::RingDip, HandJoint::RingTip),
    (HandJoint::RingMcp, HandJoint::PinkyMcp),
    (HandJoint::Wrist, HandJoint::PinkyMcp),
    (HandJoint::PinkyMcp, HandJoint::PinkyPip),
    (HandJoint::PinkyPip, HandJoint::PinkyDip),
    (HandJoint::PinkyDip, HandJoint::PinkyTip),
];

/// Single keypoint. `x`/`y` are fractions of the frame width/height; `z` is
/// relative depth and unused by the pointer pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LandmarkError {
    #[error("expected 63 flat coordinates, got {0}")]
    FlatLength(usize),
    #[error("landmark coordinate {0} is not finite")]
    NonFinite(usize),
}

/// Landmarks for one detected hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
    /// Detector confidence that a hand is present.
    pub score: f32,
}

impl HandLandmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT], score: f32) -> Self {
        Self { points, score }
    }

    /// Build from `[x0, y0, z0, x1, y1, z1, ...]`.
    ///
    /// Values outside `0..1` are kept (a fingertip may leave the frame), but
    /// NaN and infinities are rejected.
    pub fn from_flat(values: &[f32], score: f32) -> Result<Self, LandmarkError> {
        if values.len() != LANDMARK_COUNT * 3 {
            return Err(LandmarkError::FlatLength(values.len()));
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(LandmarkError::NonFinite(index));
        }
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        for (point, xyz) in points.iter_mut().zip(values.chunks_exact(3)) {
            *point = Landmark::new(xyz[0], xyz[1], xyz[2]);
        }
        Ok(Self { points, score })
    }

    pub fn get(&self, joint: HandJoint) -> Landmark {
        self.points[joint.index()]
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    /// Frame-space pixel position of `joint` for a `width` x `height` frame.
    pub fn pixel(&self, joint: HandJoint, width: u32, height: u32) -> (f64, f64) {
        let point = self.get(joint);
        (
            point.x as f64 * width as f64,
            point.y as f64 * height as f64,
        )
    }
}
