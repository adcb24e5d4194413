//! Image processing: pure Rust on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` (header only) |
//! | **Cropped resize** | [`crop_window`] + Lanczos3 |
//! | **Flip / quarter turns** | `imageops` (pixel exact) |
//! | **Arbitrary rotate** | inverse mapping, bilinear |
//! | **Encode** | PNG or JPEG, mirroring the source mime |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Transform**: buffer-in, buffer-out pixel operations
//! - **Codec**: bytes ⇄ buffers, mime rules, header probing

mod calculations;
pub mod codec;
mod params;
pub mod transform;

pub use calculations::{CropWindow, crop_window, rotated_bounds, scaled_dimensions};
pub use codec::{Dimensions, ImagingError, OutputFormat};
pub use params::{Axis, Quality, Transform};
