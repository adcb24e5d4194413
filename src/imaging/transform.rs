//! Geometric transforms over decoded RGBA buffers.
//!
//! Every function here is pure: it takes a buffer and returns a new one. No
//! I/O, no encoding. The asset manager decodes, calls one of these, and
//! re-encodes.
//!
//! | Operation | Implementation |
//! |---|---|
//! | Cropped resize | [`crop_window`] + `imageops::resize` (Lanczos3) |
//! | Flip | `imageops::flip_vertical` / `flip_horizontal` (pixel exact) |
//! | Rotate 90°/180°/270° | `imageops::rotate*` (pixel exact) |
//! | Rotate other angles | inverse mapping with bilinear sampling |
//! | Index composite | rotate with keyed fill, `imageops::replace`, key → transparent |

use super::codec::ImagingError;
use super::calculations::{crop_window, normalize_angle, quarter_turns, rotated_bounds};
use super::params::{Axis, Transform};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Fill used for corners exposed by a rotation.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Resize to exactly `width`x`height`, cropping the overflowing axis around
/// the center (shifted by `offset`) so nothing is distorted.
///
/// Channels are resampled independently; alpha is carried through, not
/// composited against a background.
pub fn resize_cropped(
    img: &RgbaImage,
    width: u32,
    height: u32,
    offset: (i64, i64),
) -> Result<RgbaImage, ImagingError> {
    if width == 0 || height == 0 || img.width() == 0 || img.height() == 0 {
        return Err(ImagingError::InvalidDimensions { width, height });
    }

    let window = crop_window(img.dimensions(), (width, height), offset);
    let cropped = imageops::crop_imm(img, window.x, window.y, window.width, window.height);
    Ok(imageops::resize(
        &cropped.to_image(),
        width,
        height,
        FilterType::Lanczos3,
    ))
}

/// Reflect every pixel across `axis`.
///
/// Vertical maps (x, y) → (x, h−1−y); horizontal maps (x, y) → (w−1−x, y).
pub fn flip(img: &RgbaImage, axis: Axis) -> RgbaImage {
    match axis {
        Axis::Vertical => imageops::flip_vertical(img),
        Axis::Horizontal => imageops::flip_horizontal(img),
    }
}

/// Rotate counter-clockwise by `angle` degrees around the image center.
///
/// Quarter turns are lossless coordinate remaps. Any other angle grows the
/// canvas to the rotated bounding box, samples bilinearly, and paints exposed
/// corners with `fill`.
pub fn rotate(img: &RgbaImage, angle: f64, fill: Rgba<u8>) -> RgbaImage {
    match quarter_turns(angle) {
        Some(0) => return img.clone(),
        // imageops turns clockwise, so a counter-clockwise quarter is rotate270
        Some(1) => return imageops::rotate270(img),
        Some(2) => return imageops::rotate180(img),
        Some(3) => return imageops::rotate90(img),
        _ => {}
    }

    let (src_w, src_h) = img.dimensions();
    let (out_w, out_h) = rotated_bounds(src_w, src_h, angle);
    let mut out = RgbaImage::from_pixel(out_w, out_h, fill);

    let (sin_a, cos_a) = normalize_angle(angle).to_radians().sin_cos();
    let cx_src = src_w as f64 / 2.0;
    let cy_src = src_h as f64 / 2.0;
    let cx_dst = out_w as f64 / 2.0;
    let cy_dst = out_h as f64 / 2.0;

    for (dx, dy, pixel) in out.enumerate_pixels_mut() {
        let xr = dx as f64 + 0.5 - cx_dst;
        let yr = dy as f64 + 0.5 - cy_dst;

        // Inverse of a counter-clockwise turn in y-down coordinates
        let sx = xr * cos_a - yr * sin_a + cx_src - 0.5;
        let sy = xr * sin_a + yr * cos_a + cy_src - 0.5;

        if sx <= -1.0 || sy <= -1.0 || sx >= src_w as f64 || sy >= src_h as f64 {
            continue;
        }
        *pixel = sample_bilinear(img, sx, sy, fill);
    }

    out
}

/// Bilinear sample at a fractional position; neighbours outside the image
/// contribute `fill` so rotated edges blend into the background.
fn sample_bilinear(img: &RgbaImage, x: f64, y: f64, fill: Rgba<u8>) -> Rgba<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let at = |px: i64, py: i64| -> Rgba<u8> {
        if px < 0 || py < 0 || px >= img.width() as i64 || py >= img.height() as i64 {
            fill
        } else {
            *img.get_pixel(px as u32, py as u32)
        }
    };

    let p00 = at(x0, y0);
    let p10 = at(x0 + 1, y0);
    let p01 = at(x0, y0 + 1);
    let p11 = at(x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let top = p00.0[c] as f64 * (1.0 - fx) + p10.0[c] as f64 * fx;
        let bottom = p01.0[c] as f64 * (1.0 - fx) + p11.0[c] as f64 * fx;
        *slot = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

/// Apply a [`Transform`] to a buffer.
pub fn apply(img: &RgbaImage, transform: Transform) -> Result<RgbaImage, ImagingError> {
    match transform {
        Transform::Resize { width, height } => resize_cropped(img, width, height, (0, 0)),
        Transform::Flip(axis) => Ok(flip(img, axis)),
        Transform::Rotate(angle) => Ok(rotate(img, angle, TRANSPARENT)),
    }
}

/// Tilt `miniature` by `angle` and stamp it onto a copy of `base` at `offset`.
///
/// The colour of the base's top-left pixel is the transparency key: it fills
/// the corners exposed by the tilt, and every pixel of the result matching it
/// is made fully transparent. The stamp overwrites (no alpha blending) and is
/// clipped to the base.
pub fn tilt_onto(base: &RgbaImage, miniature: &RgbaImage, angle: f64, offset: (i64, i64)) -> RgbaImage {
    let mut canvas = base.clone();
    let key = canvas
        .get_pixel_checked(0, 0)
        .copied()
        .unwrap_or(TRANSPARENT);

    let tilted = rotate(miniature, angle, key);
    imageops::replace(&mut canvas, &tilted, offset.0, offset.1);

    for pixel in canvas.pixels_mut() {
        if *pixel == key {
            pixel.0[3] = 0;
        }
    }
    canvas
}
