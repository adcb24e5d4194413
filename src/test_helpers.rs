//! Shared test utilities for the shoebox test suite.
//!
//! Provides generated image bytes and a [`Fixture`] holding in-memory stores,
//! settings and locks, so asset, page and index tests can build a
//! [`Context`] in one line.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fx = Fixture::new();
//! fx.put_image("a.png", &png_bytes(400, 300));
//! let mut asset = fx.open("a.png");
//! asset.set_caption("harbour").unwrap();
//! ```

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use crate::asset::{EditLocks, ImageAsset};
use crate::config::Settings;
use crate::context::Context;
use crate::store::{BlobKey, BlobRef, MemoryBlobStore, MemoryRecordStore};

// Tests call store methods on the fixture's concrete stores
pub use crate::store::{BlobStore, RecordStore};
use crate::types::{Area, Gallery};

pub const CONTAINER: &str = "gallery";
pub const GALLERY_ID: &str = "7";

// =========================================================================
// Image bytes
// =========================================================================

/// Opaque gradient, so crops and flips produce distinguishable pixels.
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128, 255])
    })
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgba8(gradient(width, height)), ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let rgb = DynamicImage::ImageRgba8(gradient(width, height)).to_rgb8();
    encode(DynamicImage::ImageRgb8(rgb), ImageFormat::Jpeg)
}

pub fn gif_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(DynamicImage::ImageRgba8(gradient(width, height)), ImageFormat::Gif)
}

pub fn svg_bytes() -> Vec<u8> {
    br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10"/></svg>"#
        .to_vec()
}

// =========================================================================
// Fixture
// =========================================================================

/// In-memory stores plus default settings for gallery `7` in container
/// `gallery`. Fields are public so tests can tweak settings before use.
pub struct Fixture {
    pub blobs: MemoryBlobStore,
    pub records: MemoryRecordStore,
    pub settings: Settings,
    pub locks: EditLocks,
    pub gallery: Gallery,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            blobs: MemoryBlobStore::new(),
            records: MemoryRecordStore::new(),
            settings: Settings::default(),
            locks: EditLocks::new(),
            gallery: Gallery::new(GALLERY_ID),
        }
    }

    pub fn ctx(&self) -> Context<'_> {
        Context::new(
            &self.blobs,
            &self.records,
            &self.settings,
            &self.locks,
            CONTAINER,
        )
    }

    pub fn image_key(&self, name: &str) -> BlobKey {
        BlobKey::new(CONTAINER, Area::Images, &self.gallery.id, "/", name)
    }

    pub fn thumb_key(&self, name: &str) -> BlobKey {
        BlobKey::new(CONTAINER, Area::Thumbs, &self.gallery.id, "/", name)
    }

    /// Store raw bytes in the image area.
    pub fn put_image(&self, name: &str, bytes: &[u8]) -> BlobRef {
        self.blobs.put(&self.image_key(name), bytes).unwrap()
    }

    /// Open a stored image. Panics if it is missing.
    pub fn open(&self, name: &str) -> ImageAsset<'_> {
        ImageAsset::open(self.ctx(), &self.gallery, "/", name)
            .unwrap_or_else(|e| panic!("cannot open '{name}': {e}"))
    }

    /// Decode whatever is stored at `key`.
    pub fn decode(&self, key: &BlobKey) -> RgbaImage {
        let bytes = self.blobs.read(key).unwrap();
        image::load_from_memory(&bytes).unwrap().to_rgba8()
    }
}
