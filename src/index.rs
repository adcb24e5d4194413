//! Gallery index icon.
//!
//! Each gallery has one `index.png` in its index area: the base icon with a
//! tilted miniature of a representative image stamped onto it. Galleries
//! without a usable raster image get the base icon unchanged.

use crate::asset::{AssetError, ImageAsset};
use crate::config::Settings;
use crate::context::Context;
use crate::imaging::ImagingError;
use crate::imaging::codec;
use crate::render;
use crate::store::{BlobKey, BlobRef, StoreError};
use crate::types::{Area, Gallery};
use image::RgbaImage;
use maud::Markup;
use thiserror::Error;
use tracing::{debug, info};

/// Built-in base icon, used when `index.icon` is not configured.
pub const DEFAULT_ICON: &[u8] = include_bytes!("../assets/index.png");

pub const INDEX_NAME: &str = "index.png";

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Cannot read index icon {path}: {source}")]
    Icon {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Decoded base icon: the configured file, or [`DEFAULT_ICON`].
pub fn base_icon(settings: &Settings) -> Result<RgbaImage, ImagingError> {
    match &settings.index.icon {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            codec::decode(&bytes, &path.display().to_string())
        }
        None => codec::decode(DEFAULT_ICON, INDEX_NAME),
    }
}

fn base_icon_bytes(settings: &Settings) -> Result<Vec<u8>, IndexError> {
    match &settings.index.icon {
        Some(path) => std::fs::read(path).map_err(|source| IndexError::Icon {
            path: path.display().to_string(),
            source,
        }),
        None => Ok(DEFAULT_ICON.to_vec()),
    }
}

pub fn index_key(ctx: Context<'_>, gallery: &Gallery) -> BlobKey {
    BlobKey::new(ctx.container, Area::Index, &gallery.id, "/", INDEX_NAME)
}

/// Return the gallery's index image, building it when needed.
///
/// An existing index is returned as is unless a `representative` is given,
/// in which case it is rebuilt from that image. Otherwise the first raster
/// image in listing order is used. A failed rebuild leaves the stored index
/// untouched.
pub fn get_or_build_index(
    ctx: Context<'_>,
    gallery: &Gallery,
    representative: Option<&ImageAsset<'_>>,
) -> Result<BlobRef, IndexError> {
    let key = index_key(ctx, gallery);

    if let Some(asset) = representative {
        return Ok(asset.create_index_asset()?);
    }

    if let Some(existing) = ctx.blobs.get(&key)? {
        debug!(gallery = %gallery.id, "index image up to date");
        return Ok(existing);
    }

    let candidate = ctx
        .blobs
        .list(ctx.container, Area::Images, &gallery.id)?
        .into_iter()
        .find(|b| b.is_image() && !b.is_vector() && b.dimensions.is_some());

    match candidate {
        Some(blob) => {
            let asset = ImageAsset::load(ctx, gallery, blob)?;
            Ok(asset.create_index_asset()?)
        }
        None => {
            let stored = ctx.blobs.put(&key, &base_icon_bytes(ctx.settings)?)?;
            info!(gallery = %gallery.id, "no raster images, using base icon as index");
            Ok(stored)
        }
    }
}

/// `<img>` fragment for the gallery's index image.
pub fn index_markup(ctx: Context<'_>, gallery: &Gallery) -> Result<Markup, IndexError> {
    let blob = get_or_build_index(ctx, gallery, None)?;
    Ok(render::index_image(&ctx.url_for(&blob), &gallery.id))
}
