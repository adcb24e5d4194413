//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the asset manager (which decides what to render) and the
//! [`transform`](super::transform) and [`codec`](super::codec) modules (which
//! do the pixel and byte work).
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1-100, default 90). Clamped on construction.
//! - [`Axis`]: reflection axis for a flip.
//! - [`Transform`]: one geometric transform applied to a stored image.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Axis to reflect pixels across.
///
/// `Vertical` turns the image upside down (rows swap), `Horizontal` mirrors it
/// left to right (columns swap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Vertical,
    Horizontal,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Vertical => f.write_str("vertical"),
            Axis::Horizontal => f.write_str("horizontal"),
        }
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vertical" | "v" => Ok(Axis::Vertical),
            "horizontal" | "h" => Ok(Axis::Horizontal),
            other => Err(format!("unknown flip axis '{other}'")),
        }
    }
}

/// A geometric transform that rewrites an image's pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Center-cropped resize to exactly `width`x`height`.
    Resize { width: u32, height: u32 },
    Flip(Axis),
    /// Counter-clockwise rotation in degrees.
    Rotate(f64),
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Resize { width, height } => write!(f, "resize {width}x{height}"),
            Transform::Flip(axis) => write!(f, "flip {axis}"),
            Transform::Rotate(angle) => write!(f, "rotate {angle}°"),
        }
    }
}
