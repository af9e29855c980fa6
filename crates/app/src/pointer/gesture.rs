//! Pinch gesture interpretation.
//!
//! Turns one frame's hand landmarks into a cursor target, debounced left/right
//! click events and the markers drawn on the preview. The interpreter is pure
//! apart from its per-button debounce state; time is passed in by the caller.

use std::time::{Duration, Instant};

use clap::ValueEnum;
use hand_landmarks::{HandJoint, HandLandmarks};
use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::pointer::{injector::ScreenSize, session::SessionSnapshot};

pub(crate) const MARKER_RADIUS: u32 = 8;
pub(crate) const INDEX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub(crate) const THUMB_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub(crate) const FINGER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub(crate) const LEFT_LABEL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub(crate) const RIGHT_LABEL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Mouse button fired by a pinch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickKind {
    /// Thumb to middle fingertip.
    Left,
    /// Thumb to ring fingertip.
    Right,
}

impl ClickKind {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ClickKind::Left => "left",
            ClickKind::Right => "right",
        }
    }

    fn finger(self) -> HandJoint {
        match self {
            ClickKind::Left => HandJoint::MiddleTip,
            ClickKind::Right => HandJoint::RingTip,
        }
    }

    fn banner(self) -> Annotation {
        match self {
            ClickKind::Left => Annotation::Label {
                text: "LEFT CLICK",
                origin: (50, 50),
                color: LEFT_LABEL_COLOR,
            },
            ClickKind::Right => Annotation::Label {
                text: "RIGHT CLICK",
                origin: (50, 100),
                color: RIGHT_LABEL_COLOR,
            },
        }
    }
}

/// When a button may fire again after a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RearmPolicy {
    /// Re-arm once the debounce interval has elapsed; a held pinch repeats.
    Interval,
    /// Additionally require the pinch to open before the next click.
    Release,
}

impl RearmPolicy {
    pub(crate) fn label(self) -> &'static str {
        match self {
            RearmPolicy::Interval => "interval",
            RearmPolicy::Release => "release",
        }
    }
}

/// Absolute screen position for the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorCommand {
    pub x: f64,
    pub y: f64,
}

/// Drawing directive produced alongside the commands.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// Filled circle centred on a frame pixel.
    Marker {
        center: (i32, i32),
        radius: u32,
        color: Rgb<u8>,
    },
    /// Text whose baseline starts at `origin`.
    Label {
        text: &'static str,
        origin: (i32, i32),
        color: Rgb<u8>,
    },
}

/// Everything the interpreter decided for one frame.
#[derive(Debug, Default, PartialEq)]
pub struct GestureOutput {
    pub cursor: Option<CursorCommand>,
    pub clicks: Vec<ClickKind>,
    pub annotations: Vec<Annotation>,
}

/// Debounce state for one button.
#[derive(Debug, Clone)]
struct ClickTrigger {
    last_fired: Option<Instant>,
    released: bool,
}

impl Default for ClickTrigger {
    fn default() -> Self {
        Self {
            last_fired: None,
            released: true,
        }
    }
}

impl ClickTrigger {
    /// Returns true when this frame's pinch fires a click.
    fn evaluate(
        &mut self,
        distance: f64,
        threshold: f64,
        debounce: Duration,
        policy: RearmPolicy,
        now: Instant,
    ) -> bool {
        if distance >= threshold {
            self.released = true;
            return false;
        }

        let cooled = self
            .last_fired
            .is_none_or(|fired| now.saturating_duration_since(fired) >= debounce);
        let armed = match policy {
            RearmPolicy::Interval => true,
            RearmPolicy::Release => self.released,
        };
        if !(cooled && armed) {
            return false;
        }

        self.last_fired = Some(now);
        self.released = false;
        true
    }
}

/// Per-session pinch interpreter.
pub struct GestureInterpreter {
    screen: ScreenSize,
    debounce: Duration,
    left: ClickTrigger,
    right: ClickTrigger,
}

impl GestureInterpreter {
    pub fn new(screen: ScreenSize, debounce: Duration) -> Self {
        Self {
            screen,
            debounce,
            left: ClickTrigger::default(),
            right: ClickTrigger::default(),
        }
    }

    /// Interpret one frame.
    ///
    /// Produces nothing when tracking is disabled or no hand is present.
    pub fn interpret(
        &mut self,
        hand: Option<&HandLandmarks>,
        frame_size: (u32, u32),
        session: &SessionSnapshot,
        now: Instant,
    ) -> GestureOutput {
        let hand = match hand {
            Some(hand) if session.tracking_enabled => hand,
            _ => return GestureOutput::default(),
        };
        let (frame_w, frame_h) = frame_size;

        let index = hand.get(HandJoint::IndexTip);
        let cursor = CursorCommand {
            x: index.x as f64 * self.screen.width as f64,
            y: index.y as f64 * self.screen.height as f64,
        };

        let index_px = hand.pixel(HandJoint::IndexTip, frame_w, frame_h);
        let thumb_px = hand.pixel(HandJoint::ThumbTip, frame_w, frame_h);
        let middle_px = hand.pixel(HandJoint::MiddleTip, frame_w, frame_h);
        let ring_px = hand.pixel(HandJoint::RingTip, frame_w, frame_h);

        let mut annotations = vec![
            marker(index_px, INDEX_COLOR),
            marker(thumb_px, THUMB_COLOR),
            marker(middle_px, FINGER_COLOR),
            marker(ring_px, FINGER_COLOR),
        ];

        let mut clicks = Vec::new();
        for kind in [ClickKind::Left, ClickKind::Right] {
            let finger_px = hand.pixel(kind.finger(), frame_w, frame_h);
            let distance = pixel_distance(thumb_px, finger_px);
            let trigger = match kind {
                ClickKind::Left => &mut self.left,
                ClickKind::Right => &mut self.right,
            };
            if trigger.evaluate(
                distance,
                session.pinch_threshold,
                self.debounce,
                session.rearm_policy,
                now,
            ) {
                clicks.push(kind);
                annotations.push(kind.banner());
            }
        }

        GestureOutput {
            cursor: Some(cursor),
            clicks,
            annotations,
        }
    }
}

fn marker(center: (f64, f64), color: Rgb<u8>) -> Annotation {
    Annotation::Marker {
        center: (center.0.round() as i32, center.1.round() as i32),
        radius: MARKER_RADIUS,
        color,
    }
}

fn pixel_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}
