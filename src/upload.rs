//! Adding new images to a gallery.
//!
//! Zip uploads are unpacked first and their files imported as if uploaded
//! one by one. Folders inside the archive are flattened: only base names are
//! kept, so entries go through the same duplicate check as plain uploads.

use crate::asset::{AssetError, ImageAsset, ResizeSpec};
use crate::context::Context;
use crate::imaging::codec::{self, MIME_ZIP, is_vector, is_web_image, mime_for_name};
use crate::store::BlobKey;
use crate::types::{Area, EditKind, Gallery};
use std::io::{Cursor, Read};
use tracing::{debug, info, warn};
use zip::ZipArchive;
use zip::result::ZipError;

/// A file handed in for import.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    fn is_archive(&self) -> bool {
        mime_for_name(&self.name) == MIME_ZIP
    }

    /// Named as a web image, and either SVG or raster data with a readable
    /// header.
    fn is_valid_image(&self) -> bool {
        let mime = mime_for_name(&self.name);
        is_web_image(mime) && (is_vector(mime) || codec::probe(&self.bytes).is_some())
    }
}

/// Files inside a zip upload, named by their base names.
fn unpack(archive: &Upload) -> Result<Vec<Upload>, ZipError> {
    let mut zip = ZipArchive::new(Cursor::new(archive.bytes.as_slice()))?;
    let mut files = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        else {
            warn!(archive = %archive.name, entry = %entry.name(), "skipping archive entry: unsafe path");
            continue;
        };
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        files.push(Upload::new(name, bytes));
    }
    Ok(files)
}

/// Replace each zip upload with the files it holds. Unreadable archives are
/// skipped.
fn expand_archives(uploads: Vec<Upload>) -> Vec<Upload> {
    let mut files = Vec::with_capacity(uploads.len());
    for upload in uploads {
        if !upload.is_archive() {
            files.push(upload);
            continue;
        }
        match unpack(&upload) {
            Ok(inner) => {
                debug!(archive = %upload.name, files = inner.len(), "unpacked archive");
                files.extend(inner);
            }
            Err(e) => warn!(archive = %upload.name, error = %e, "skipping upload: unreadable archive"),
        }
    }
    files
}

/// Store each valid, new upload at the top of the gallery and caption it with
/// its filename.
///
/// Zip uploads contribute the files they hold. Uploads are resized when
/// `resize` is given, or to the gallery's preset when its auto-resize mode
/// covers uploads. Returns the stored filenames after any resize renamed
/// them. Invalid and duplicate files are skipped.
pub fn add_images(
    ctx: Context<'_>,
    gallery: &Gallery,
    uploads: Vec<Upload>,
    resize: Option<ResizeSpec>,
) -> Result<Vec<String>, AssetError> {
    let resize = resize.or_else(|| {
        gallery
            .auto_resize
            .on_upload()
            .then_some(ResizeSpec::Preset(gallery.resize_preset))
    });

    let mut stored = Vec::new();
    for upload in expand_archives(uploads) {
        if !upload.is_valid_image() {
            warn!(file = %upload.name, "skipping upload: not a recognised image");
            continue;
        }
        let key = BlobKey::new(ctx.container, Area::Images, &gallery.id, "/", &upload.name);
        if ctx.blobs.get(&key)?.is_some() {
            warn!(file = %upload.name, "skipping upload: file already exists");
            continue;
        }

        let blob = ctx.blobs.put(&key, &upload.bytes)?;
        let mut asset = ImageAsset::load(ctx, gallery, blob)?;
        asset.set_caption(&upload.name)?;

        let resizable = asset.editing_options().contains(&EditKind::Resize);
        if let Some(spec) = resize.filter(|_| resizable) {
            asset.resize(spec)?;
        }

        info!(gallery = %gallery.id, file = %asset.filename(), "added image");
        stored.push(asset.filename().to_string());
    }
    Ok(stored)
}
