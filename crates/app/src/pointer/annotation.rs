//! Drawing primitives for the preview frame.

use anyhow::{Result, anyhow};
use hand_landmarks::{HAND_CONNECTIONS, HandLandmarks};
use image::{Rgb, RgbImage};
use video_ingest::Frame;

use crate::pointer::gesture::Annotation;

/// Pixel scale applied to the 5x7 glyphs of click banners.
pub(crate) const LABEL_SCALE: u32 = 3;
const GLYPH_HEIGHT: i32 = 7;
const GLYPH_ADVANCE: i32 = 6;

const SKELETON_LINE: Rgb<u8> = Rgb([224, 224, 224]);
const SKELETON_JOINT: Rgb<u8> = Rgb([255, 48, 48]);
const INFO_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const INFO_TEXT: Rgb<u8> = Rgb([255, 255, 255]);

/// Convert a captured BGR frame into an RGB image.
pub(crate) fn bgr_to_rgb(frame: &Frame) -> Result<RgbImage> {
    let expected = Frame::expected_len(frame.width, frame.height, frame.format);
    if frame.data.len() != expected {
        return Err(anyhow!(
            "frame holds {} bytes, expected {expected} for {}x{}",
            frame.data.len(),
            frame.width,
            frame.height
        ));
    }
    let mut rgb = Vec::with_capacity(expected);
    for chunk in frame.data.chunks_exact(3) {
        rgb.extend_from_slice(&[chunk[2], chunk[1], chunk[0]]);
    }
    RgbImage::from_vec(frame.width, frame.height, rgb)
        .ok_or_else(|| anyhow!("failed to convert frame into image buffer"))
}

/// Draw interpreter markers and labels.
pub(crate) fn apply_annotations(image: &mut RgbImage, annotations: &[Annotation]) {
    for annotation in annotations {
        match annotation {
            Annotation::Marker {
                center,
                radius,
                color,
            } => fill_circle(image, *center, *radius, *color),
            Annotation::Label {
                text,
                origin,
                color,
            } => {
                let top = origin.1 - GLYPH_HEIGHT * LABEL_SCALE as i32;
                draw_label(image, origin.0, top, text, *color, LABEL_SCALE);
            }
        }
    }
}

/// Overlay the 21-point hand skeleton.
///
/// Detector output is not range checked, so joints may lie far outside the
/// frame; lines are clipped and off-frame joints skipped.
pub(crate) fn draw_skeleton(image: &mut RgbImage, hand: &HandLandmarks) {
    let (width, height) = image.dimensions();
    for (from, to) in HAND_CONNECTIONS {
        let segment = clip_segment(
            image.dimensions(),
            hand.pixel(from, width, height),
            hand.pixel(to, width, height),
        );
        if let Some((from, to)) = segment {
            rasterize_line(image, from, to, SKELETON_LINE);
        }
    }
    for point in hand.points() {
        let (x, y) = (point.x as f64 * width as f64, point.y as f64 * height as f64);
        if x.is_finite() && y.is_finite() {
            fill_circle(image, (x.round() as i32, y.round() as i32), 3, SKELETON_JOINT);
        }
    }
}

/// Frame counter and FPS in the bottom-right corner.
pub(crate) fn draw_info(image: &mut RgbImage, frame_number: u64, fps: f32) {
    let (width, height) = (image.width() as i32, image.height() as i32);
    let info = format!("FRAME {:06}  FPS {:4.1}", frame_number, fps);
    let info_width = (info.chars().count() as i32 * GLYPH_ADVANCE).min(width);
    let info_x = (width - info_width - 4).max(0);
    let info_y = (height - 12).max(0);
    fill_rect(
        image,
        info_x,
        info_y,
        info_x + info_width + 4,
        info_y + 8,
        INFO_BACKGROUND,
    );
    draw_label(image, info_x + 2, info_y, &info, INFO_TEXT, 1);
}

pub(crate) fn fill_circle(image: &mut RgbImage, center: (i32, i32), radius: u32, color: Rgb<u8>) {
    let r = radius.min(i16::MAX as u32) as i32;
    let (cx, cy) = (i64::from(center.0), i64::from(center.1));
    let reach = i64::from(r);
    if cx + reach < 0
        || cy + reach < 0
        || cx - reach >= i64::from(image.width())
        || cy - reach >= i64::from(image.height())
    {
        return;
    }
    let r2 = r * r;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r2 {
                put_pixel(image, center.0 + dx, center.1 + dy, color);
            }
        }
    }
}

/// Bresenham line, clipped to the image.
pub(crate) fn draw_line(image: &mut RgbImage, from: (i32, i32), to: (i32, i32), color: Rgb<u8>) {
    let segment = clip_segment(
        image.dimensions(),
        (from.0 as f64, from.1 as f64),
        (to.0 as f64, to.1 as f64),
    );
    if let Some((from, to)) = segment {
        rasterize_line(image, from, to, color);
    }
}

/// Liang-Barsky clip of a segment to the pixel grid of a `width` x `height`
/// image. `None` when the segment misses the image or is not finite.
fn clip_segment(
    (width, height): (u32, u32),
    from: (f64, f64),
    to: (f64, f64),
) -> Option<((i32, i32), (i32, i32))> {
    if width == 0 || height == 0 || ![from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let max_x = f64::from(width - 1);
    let max_y = f64::from(height - 1);
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (mut enter, mut exit) = (0.0f64, 1.0f64);
    for (p, q) in [
        (-dx, from.0),
        (dx, max_x - from.0),
        (-dy, from.1),
        (dy, max_y - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > exit {
                return None;
            }
            enter = enter.max(t);
        } else {
            if t < enter {
                return None;
            }
            exit = exit.min(t);
        }
    }
    let at = |t: f64| {
        (
            (from.0 + t * dx).round().clamp(0.0, max_x) as i32,
            (from.1 + t * dy).round().clamp(0.0, max_y) as i32,
        )
    };
    Some((at(enter), at(exit)))
}

/// Endpoints must already lie inside the image.
fn rasterize_line(image: &mut RgbImage, from: (i32, i32), to: (i32, i32), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(image, x, y, color);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn fill_rect(image: &mut RgbImage, left: i32, top: i32, right: i32, bottom: i32, color: Rgb<u8>) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let left = left.clamp(0, width.saturating_sub(1));
    let right = right.clamp(0, width.saturating_sub(1));
    let top = top.clamp(0, height.saturating_sub(1));
    let bottom = bottom.clamp(0, height.saturating_sub(1));

    for y in top..=bottom {
        for x in left..=right {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Render `text` with its top-left corner at (`x`, `y`), each glyph pixel
/// drawn as a `scale` x `scale` block.
fn draw_label(image: &mut RgbImage, mut x: i32, y: i32, text: &str, color: Rgb<u8>, scale: u32) {
    let scale = scale.max(1) as i32;
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                for col in 0..5 {
                    if (pattern >> (4 - col)) & 1 == 1 {
                        let px = x + col * scale;
                        let py = y + row as i32 * scale;
                        for oy in 0..scale {
                            for ox in 0..scale {
                                put_pixel(image, px + ox, py + oy, color);
                            }
                        }
                    }
                }
            }
        }
        x += GLYPH_ADVANCE * scale;
    }
}

fn put_pixel(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    match ch {
        'A' => Some([
            0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001,
        ]),
        'C' => Some([
            0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110,
        ]),
        'E' => Some([
            0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111,
        ]),
        'F' => Some([
            0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000,
        ]),
        'G' => Some([
            0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111,
        ]),
        'H' => Some([
            0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001,
        ]),
        'I' => Some([
            0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        'K' => Some([
            0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001,
        ]),
        'L' => Some([
            0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111,
        ]),
        'M' => Some([
            0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001,
        ]),
        'P' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000,
        ]),
        'R' => Some([
            0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001,
        ]),
        'S' => Some([
            0b01111, 0b10000, 0b01110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        'T' => Some([
            0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100,
        ]),
        '0' => Some([
            0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110,
        ]),
        '1' => Some([
            0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110,
        ]),
        '2' => Some([
            0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111,
        ]),
        '3' => Some([
            0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110,
        ]),
        '4' => Some([
            0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010,
        ]),
        '5' => Some([
            0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110,
        ]),
        '6' => Some([
            0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110,
        ]),
        '7' => Some([
            0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000,
        ]),
        '8' => Some([
            0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110,
        ]),
        '9' => Some([
            0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100,
        ]),
        '.' => Some([0, 0, 0, 0, 0, 0b00110, 0b00110]),
        ' ' => Some([0, 0, 0, 0, 0, 0, 0]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use hand_landmarks::{HandJoint, LANDMARK_COUNT, Landmark};
    use image::Rgb;
    use video_ingest::FrameFormat;

    use super::*;
    use crate::pointer::gesture::{LEFT_LABEL_COLOR, MARKER_RADIUS, THUMB_COLOR};

    #[test]
    fn swaps_bgr_channels() {
        let frame = Frame {
            data: vec![10, 20, 30, 40, 50, 60],
            width: 2,
            height: 1,
            timestamp_ms: 0,
            format: FrameFormat::Bgr8,
        };
        let rgb = bgr_to_rgb(&frame).expect("convert");
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([30, 20, 10]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([60, 50, 40]));
    }

    #[test]
    fn rejects_truncated_frames() {
        let frame = Frame {
            data: vec![0; 5],
            width: 2,
            height: 1,
            timestamp_ms: 0,
            format: FrameFormat::Bgr8,
        };
        assert!(bgr_to_rgb(&frame).is_err());
    }

    #[test]
    fn marker_is_a_filled_disc() {
        let mut image = RgbImage::new(64, 64);
        apply_annotations(
            &mut image,
            &[Annotation::Marker {
                center: (32, 32),
                radius: MARKER_RADIUS,
                color: THUMB_COLOR,
            }],
        );
        assert_eq!(image.get_pixel(32, 32), &THUMB_COLOR);
        assert_eq!(image.get_pixel(32 + MARKER_RADIUS, 32), &THUMB_COLOR);
        assert_eq!(image.get_pixel(32 + MARKER_RADIUS + 1, 32), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(38, 38), &Rgb([0, 0, 0]));
    }

    #[test]
    fn shapes_clip_at_the_border() {
        let mut image = RgbImage::new(16, 16);
        fill_circle(&mut image, (0, 0), 8, THUMB_COLOR);
        draw_line(&mut image, (-10, 5), (40, 5), THUMB_COLOR);
        assert_eq!(image.get_pixel(0, 0), &THUMB_COLOR);
        assert_eq!(image.get_pixel(15, 5), &THUMB_COLOR);
    }

    #[test]
    fn far_off_frame_joints_do_not_break_the_skeleton() {
        let mut points = [Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        points[HandJoint::IndexTip.index()] = Landmark::new(1.0e7, 0.5, 0.0);
        points[HandJoint::PinkyTip.index()] = Landmark::new(-3.0e9, f32::MAX, 0.0);
        points[HandJoint::ThumbTip.index()] = Landmark::new(f32::NAN, 0.5, 0.0);
        let hand = HandLandmarks::new(points, 0.9);

        let mut image = RgbImage::new(640, 480);
        draw_skeleton(&mut image, &hand);
        assert_eq!(image.get_pixel(320, 240), &SKELETON_JOINT);
        // The index finger segment runs off the right edge at the same row.
        assert_eq!(image.get_pixel(639, 240), &SKELETON_LINE);
    }

    #[test]
    fn huge_coordinates_are_clipped() {
        let mut image = RgbImage::new(32, 32);
        draw_line(&mut image, (i32::MIN, 10), (i32::MAX, 10), THUMB_COLOR);
        fill_circle(&mut image, (i32::MAX, i32::MAX), MARKER_RADIUS, THUMB_COLOR);
        assert_eq!(image.get_pixel(0, 10), &THUMB_COLOR);
        assert_eq!(image.get_pixel(31, 10), &THUMB_COLOR);
        assert_eq!(image.get_pixel(31, 31), &Rgb([0, 0, 0]));
    }

    #[test]
    fn lines_outside_the_image_draw_nothing() {
        let mut image = RgbImage::new(16, 16);
        draw_line(&mut image, (-5, -5), (40, -1), THUMB_COLOR);
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn line_reaches_both_endpoints() {
        let mut image = RgbImage::new(20, 20);
        draw_line(&mut image, (2, 3), (17, 11), THUMB_COLOR);
        assert_eq!(image.get_pixel(2, 3), &THUMB_COLOR);
        assert_eq!(image.get_pixel(17, 11), &THUMB_COLOR);
    }

    #[test]
    fn label_sits_above_its_baseline() {
        let mut image = RgbImage::new(400, 120);
        apply_annotations(
            &mut image,
            &[Annotation::Label {
                text: "LEFT CLICK",
                origin: (50, 50),
                color: LEFT_LABEL_COLOR,
            }],
        );
        let painted: Vec<(u32, u32)> = image
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == LEFT_LABEL_COLOR)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!painted.is_empty());
        assert!(painted.iter().all(|(_, y)| *y < 50 && *y >= 50 - 21));
        assert!(painted.iter().all(|(x, _)| *x >= 50));
    }

    #[test]
    fn every_banner_character_has_a_glyph() {
        for ch in "LEFT CLICK RIGHT CLICK FRAME 0123456789 FPS .".chars() {
            assert!(glyph_bits(ch).is_some(), "missing glyph for {ch:?}");
        }
    }

    #[test]
    fn info_strip_paints_bottom_right() {
        let mut image = RgbImage::from_pixel(320, 240, Rgb([9, 9, 9]));
        draw_info(&mut image, 42, 29.7);
        assert_eq!(image.get_pixel(319, 235), &INFO_BACKGROUND);
        assert_eq!(image.get_pixel(0, 0), &Rgb([9, 9, 9]));
        assert!(image.enumerate_pixels().any(|(_, _, p)| *p == INFO_TEXT));
    }
}
