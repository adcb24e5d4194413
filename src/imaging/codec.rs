//! Byte-level image handling: mime detection, decoding, header probing and
//! mime-mirrored encoding.
//!
//! ## Format policy
//!
//! Transformed output mirrors the source format: PNG sources stay PNG (alpha
//! survives), every other raster source is written as JPEG. The output filename
//! follows the format via [`naming::rewrite_extension`](crate::naming::rewrite_extension).
//!
//! SVG is accepted for storage and display but never decoded; it has no pixel
//! dimensions and no geometric operations.

use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageReader, RgbaImage};
use std::io::{BufRead, Cursor, Seek};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },
    #[error("Failed to encode {format}: {reason}")]
    Encode { format: &'static str, reason: String },
    #[error("Encoder produced unusable {format} output")]
    EmptyOutput { format: &'static str },
    #[error("Invalid target dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Pixel dimensions read from an image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_GIF: &str = "image/gif";
pub const MIME_WEBP: &str = "image/webp";
pub const MIME_SVG: &str = "image/svg+xml";
pub const MIME_ZIP: &str = "application/zip";
pub const MIME_UNKNOWN: &str = "application/octet-stream";

const EXTENSION_MIMES: &[(&str, &str)] = &[
    ("jpg", MIME_JPEG),
    ("jpeg", MIME_JPEG),
    ("jpe", MIME_JPEG),
    ("png", MIME_PNG),
    ("gif", MIME_GIF),
    ("webp", MIME_WEBP),
    ("svg", MIME_SVG),
    ("zip", MIME_ZIP),
];

/// Mime type implied by a filename's last extension.
pub fn mime_for_name(name: &str) -> &'static str {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return MIME_UNKNOWN;
    };
    EXTENSION_MIMES
        .iter()
        .find(|(e, _)| e.eq_ignore_ascii_case(ext))
        .map(|(_, mime)| *mime)
        .unwrap_or(MIME_UNKNOWN)
}

/// Mimes a browser can display inline.
pub fn is_web_image(mime: &str) -> bool {
    matches!(mime, MIME_GIF | MIME_JPEG | MIME_PNG | MIME_WEBP | MIME_SVG)
}

pub fn is_vector(mime: &str) -> bool {
    mime == MIME_SVG
}

/// Read width and height from the header without a full decode.
///
/// Returns `None` for anything the compiled-in decoders can't identify,
/// including SVG.
pub fn probe(bytes: &[u8]) -> Option<Dimensions> {
    probe_reader(Cursor::new(bytes))
}

/// [`probe`] over a reader; only the header is consumed.
pub fn probe_reader(reader: impl BufRead + Seek) -> Option<Dimensions> {
    let (width, height) = ImageReader::new(reader)
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    Some(Dimensions { width, height })
}

/// Decode to an RGBA buffer. `name` is only used for error messages.
pub fn decode(bytes: &[u8], name: &str) -> Result<RgbaImage, ImagingError> {
    let decode_err = |reason: String| ImagingError::Decode {
        name: name.to_string(),
        reason,
    };
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;
    Ok(img.to_rgba8())
}

/// Output encoding chosen from a source mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// PNG stays PNG; everything else becomes JPEG.
    pub fn for_mime(mime: &str) -> Self {
        if mime == MIME_PNG {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Png => MIME_PNG,
            OutputFormat::Jpeg => MIME_JPEG,
        }
    }

    fn label(self) -> &'static str {
        match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
        }
    }
}

/// Encode a buffer and check the result decodes again.
///
/// JPEG has no alpha channel, so transparent pixels flatten to their colour
/// channels (black for the rotation fill).
pub fn encode(
    img: &RgbaImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, ImagingError> {
    let encode_err = |e: image::ImageError| ImagingError::Encode {
        format: format.label(),
        reason: e.to_string(),
    };

    let mut buf = Vec::new();
    match format {
        OutputFormat::Png => DynamicImage::ImageRgba8(img.clone())
            .write_with_encoder(PngEncoder::new(&mut buf))
            .map_err(encode_err)?,
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            DynamicImage::ImageRgb8(rgb)
                .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.value()))
                .map_err(encode_err)?
        }
    }

    if buf.is_empty() || probe(&buf).is_none() {
        return Err(ImagingError::EmptyOutput {
            format: format.label(),
        });
    }
    Ok(buf)
}
