//! Pure calculation functions for image geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// A source rectangle to sample from when producing a cropped resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Calculate the source window for a center-cropped resize.
///
/// The axis with the smaller scale ratio is the one that overflows the target
/// once the other axis fits, so that axis is cropped around the center and the
/// other axis is used in full.
///
/// `offset` shifts the window away from center. The window is always clamped
/// inside the source so an offset can never sample outside the image.
///
/// # Examples
/// ```
/// # use shoebox::imaging::{crop_window, CropWindow};
/// // 400x200 landscape into a 100x100 square: crop the width to 200, centered.
/// assert_eq!(
///     crop_window((400, 200), (100, 100), (0, 0)),
///     CropWindow { x: 100, y: 0, width: 200, height: 200 }
/// );
/// ```
pub fn crop_window(source: (u32, u32), target: (u32, u32), offset: (i64, i64)) -> CropWindow {
    let (src_w, src_h) = source;
    let (dst_w, dst_h) = target;
    let (offset_x, offset_y) = offset;

    let ratio_w = dst_w as f64 / src_w as f64;
    let ratio_h = dst_h as f64 / src_h as f64;

    let (width, height, x, y) = if ratio_w < ratio_h {
        let crop_w = ((dst_w as f64 / ratio_h).floor() as u32).clamp(1, src_w);
        let cx = src_w as f64 / 2.0;
        let x = (cx - crop_w as f64 / 2.0).floor() as i64 + offset_x;
        (crop_w, src_h, x, offset_y)
    } else {
        let crop_h = ((dst_h as f64 / ratio_w).floor() as u32).clamp(1, src_h);
        let cy = src_h as f64 / 2.0;
        let y = (cy - crop_h as f64 / 2.0).floor() as i64 + offset_y;
        (src_w, crop_h, offset_x, y)
    };

    CropWindow {
        x: x.clamp(0, (src_w - width) as i64) as u32,
        y: y.clamp(0, (src_h - height) as i64) as u32,
        width,
        height,
    }
}

/// Normalize a rotation angle to the range `[0, 360)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % 360.0;
    if a < 0.0 { a + 360.0 } else { a }
}

/// Quarter turns represented by `angle`, if it is an exact multiple of 90°.
pub fn quarter_turns(angle: f64) -> Option<u32> {
    let a = normalize_angle(angle);
    let turns = (a / 90.0).round();
    if (a - turns * 90.0).abs() < 1e-9 {
        Some(turns as u32 % 4)
    } else {
        None
    }
}

/// Bounding box of a `width`x`height` image after rotating by `angle` degrees.
///
/// Exact for multiples of 90°; other angles round each side up so no rotated
/// corner is clipped.
pub fn rotated_bounds(width: u32, height: u32, angle: f64) -> (u32, u32) {
    if let Some(turns) = quarter_turns(angle) {
        return if turns % 2 == 0 {
            (width, height)
        } else {
            (height, width)
        };
    }

    let radians = normalize_angle(angle).to_radians();
    let (sin_a, cos_a) = radians.sin_cos();
    let w = width as f64;
    let h = height as f64;

    let out_w = (w * cos_a.abs() + h * sin_a.abs()).ceil();
    let out_h = (w * sin_a.abs() + h * cos_a.abs()).ceil();
    (out_w.max(1.0) as u32, out_h.max(1.0) as u32)
}

/// Dimensions after scaling by a percentage (`50` = half size).
///
/// Fractions are truncated; neither side drops below one pixel.
pub fn scaled_dimensions(original: (u32, u32), percent: u32) -> (u32, u32) {
    let (w, h) = original;
    let scale = percent as f64 / 100.0;
    (
        ((w as f64 * scale) as u32).max(1),
        ((h as f64 * scale) as u32).max(1),
    )
}
