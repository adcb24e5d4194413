//! One image's lifecycle: thumbnails, transforms, captions, tags, deletion.
//!
//! An [`ImageAsset`] wraps a stored image plus the gallery it belongs to. It
//! is the only place that writes image blobs after upload, and the only place
//! that can change an image's filename, so the metadata rename always happens
//! inside the same locked operation as the file rename.
//!
//! ## Transform sequence
//!
//! ```text
//! lock(old, new) → decode → transform → encode → verify
//!   → put new blob (staged) → rename metadata → commit stage
//!   → delete old blob → delete old thumbnail → regenerate thumbnail
//! ```
//!
//! Nothing is written until the encoded output has been verified. If a step
//! after the put fails, the staged blob is removed again and the original
//! image and its metadata are untouched.

mod locks;
mod operation;

pub use locks::{EditGuard, EditLocks};
pub use operation::{Operation, Outcome, ResizeSpec, TagEdit, edit_types};

use crate::context::Context;
use crate::imaging::codec::{self, OutputFormat};
use crate::imaging::{Dimensions, ImagingError, Transform, transform};
use crate::naming::{rewrite_extension, thumbnail_name, truncate_label};
use crate::render::{self, EditMenu, ExtInfo, ImageCard};
use crate::store::{
    BlobKey, BlobRef, BlobStore, MetaFilter, MetaRecord, MetaType, NewMetaRecord, StoreError,
};
use crate::types::{Area, EditKind, Gallery};
use maud::Markup;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Cannot rename {from} to {to}: another image already uses that name")]
    NameConflict { from: String, to: String },
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Imaging error: {0}")]
    Imaging(#[from] ImagingError),
}

/// How an [`ImageAsset`] is constructed.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Take width and height from the blob header. Without them no geometric
    /// operation is possible and the image acts as its own thumbnail.
    pub read_dimensions: bool,
    /// Thumbnail already looked up by the caller.
    pub thumbnail: Option<BlobRef>,
    /// Metadata rows already fetched by the caller.
    pub metadata: Option<Vec<MetaRecord>>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            read_dimensions: true,
            thumbnail: None,
            metadata: None,
        }
    }
}

/// Removes a freshly written blob unless committed.
struct StagedBlob<'a> {
    blobs: &'a dyn BlobStore,
    key: Option<BlobKey>,
}

impl<'a> StagedBlob<'a> {
    fn new(blobs: &'a dyn BlobStore, key: BlobKey) -> Self {
        Self {
            blobs,
            key: Some(key),
        }
    }

    fn commit(mut self) {
        self.key = None;
    }
}

impl Drop for StagedBlob<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            if let Err(e) = self.blobs.delete(&key) {
                warn!(blob = %key, error = %e, "could not remove staged blob");
            } else {
                debug!(blob = %key, "removed staged blob");
            }
        }
    }
}

/// A stored image bound to its gallery.
pub struct ImageAsset<'a> {
    ctx: Context<'a>,
    gallery: &'a Gallery,
    blob: BlobRef,
    dimensions: Option<Dimensions>,
    /// Blob in the thumbnail area, if one exists.
    thumbnail: Option<BlobRef>,
    metadata: Option<Vec<MetaRecord>>,
}

impl<'a> ImageAsset<'a> {
    /// Look up `path` + `filename` in the gallery's image area.
    pub fn open(
        ctx: Context<'a>,
        gallery: &'a Gallery,
        path: &str,
        filename: &str,
    ) -> Result<Self, AssetError> {
        let key = BlobKey::new(ctx.container, Area::Images, &gallery.id, path, filename);
        let blob = ctx
            .blobs
            .get(&key)?
            .ok_or_else(|| AssetError::NotFound(key.to_string()))?;
        Self::load(ctx, gallery, blob)
    }

    pub fn load(ctx: Context<'a>, gallery: &'a Gallery, blob: BlobRef) -> Result<Self, AssetError> {
        Self::load_with(ctx, gallery, blob, LoadOptions::default())
    }

    /// Construct from data the paginator has already gathered.
    pub fn with_prefetched(
        ctx: Context<'a>,
        gallery: &'a Gallery,
        blob: BlobRef,
        thumbnail: Option<BlobRef>,
        metadata: Vec<MetaRecord>,
    ) -> Result<Self, AssetError> {
        Self::load_with(
            ctx,
            gallery,
            blob,
            LoadOptions {
                thumbnail,
                metadata: Some(metadata),
                ..LoadOptions::default()
            },
        )
    }

    /// Build the asset, reusing or generating its thumbnail.
    pub fn load_with(
        ctx: Context<'a>,
        gallery: &'a Gallery,
        blob: BlobRef,
        options: LoadOptions,
    ) -> Result<Self, AssetError> {
        let dimensions = if options.read_dimensions {
            blob.dimensions
        } else {
            None
        };
        let mut asset = Self {
            ctx,
            gallery,
            blob,
            dimensions,
            thumbnail: options.thumbnail,
            metadata: options.metadata,
        };

        if asset.thumbnail.is_none() && asset.has_pixels() {
            asset.thumbnail = ctx.blobs.get(&asset.thumbnail_key())?;
            if asset.thumbnail.is_none() {
                debug!(image = %asset.blob.key, "generating missing thumbnail");
                asset.create_thumbnail((0, 0))?;
            }
        }
        Ok(asset)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn filename(&self) -> &str {
        self.blob.name()
    }

    pub fn blob(&self) -> &BlobRef {
        &self.blob
    }

    pub fn gallery(&self) -> &Gallery {
        self.gallery
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    pub fn is_vector(&self) -> bool {
        self.blob.is_vector()
    }

    /// Raster with known dimensions: the only kind geometric edits apply to.
    fn has_pixels(&self) -> bool {
        !self.is_vector() && self.dimensions.is_some()
    }

    /// Thumbnail blob, or the image itself when it has no pixel size.
    pub fn thumbnail(&self) -> &BlobRef {
        self.thumbnail.as_ref().unwrap_or(&self.blob)
    }

    fn thumbnail_key(&self) -> BlobKey {
        self.blob
            .key
            .in_area(Area::Thumbs)
            .with_name(thumbnail_name(self.filename()))
    }

    pub fn image_url(&self) -> String {
        self.ctx.url_for(&self.blob)
    }

    pub fn thumbnail_url(&self) -> String {
        if self.is_vector() {
            return self.image_url();
        }
        self.ctx.url_for(self.thumbnail())
    }

    /// Edits this image supports.
    pub fn editing_options(&self) -> Vec<EditKind> {
        if self.is_vector() {
            vec![EditKind::Caption, EditKind::Delete, EditKind::Tag]
        } else {
            EditKind::ALL.to_vec()
        }
    }

    fn lock(&self, extra: Option<&str>) -> EditGuard<'a> {
        let mut names = vec![self.filename()];
        names.extend(extra);
        self.ctx.locks.acquire(&self.gallery.id, &names)
    }

    fn require_pixels(&self, what: &str) -> Result<(), AssetError> {
        if self.is_vector() {
            return Err(AssetError::InvalidState(format!(
                "cannot {what} vector image {}",
                self.filename()
            )));
        }
        if self.dimensions.is_none() {
            return Err(AssetError::InvalidState(format!(
                "cannot {what} {}: dimensions unknown",
                self.filename()
            )));
        }
        Ok(())
    }

    fn decode(&self) -> Result<image::RgbaImage, AssetError> {
        let bytes = self.ctx.blobs.read(&self.blob.key)?;
        Ok(codec::decode(&bytes, self.filename())?)
    }

    // =========================================================================
    // Derived images
    // =========================================================================

    /// Regenerate the thumbnail, shifting the crop window by `offset`.
    ///
    /// Images without pixel dimensions are their own thumbnail and are
    /// returned unchanged.
    pub fn create_thumbnail(&mut self, offset: (i64, i64)) -> Result<BlobRef, AssetError> {
        if !self.has_pixels() {
            return Ok(self.blob.clone());
        }

        let (width, height) = self.ctx.settings.thumbnail_size();
        let img = self.decode()?;
        let thumb = transform::resize_cropped(&img, width, height, offset)?;
        let bytes = codec::encode(&thumb, OutputFormat::Png, self.ctx.settings.jpeg_quality())?;

        let key = self.thumbnail_key();
        self.ctx.blobs.delete(&key)?;
        let stored = self.ctx.blobs.put(&key, &bytes)?;
        debug!(thumbnail = %key, "created thumbnail");
        self.thumbnail = Some(stored.clone());
        Ok(stored)
    }

    fn delete_thumbnail(&mut self) -> Result<(), AssetError> {
        self.ctx.blobs.delete(&self.thumbnail_key())?;
        self.thumbnail = None;
        Ok(())
    }

    /// Composite a tilted miniature of this image onto the gallery icon and
    /// store it as the gallery's `index.png`.
    pub fn create_index_asset(&self) -> Result<BlobRef, AssetError> {
        self.require_pixels("build an index from")?;
        let settings = &self.ctx.settings.index;

        let base = crate::index::base_icon(self.ctx.settings)?;
        let miniature = transform::resize_cropped(
            &self.decode()?,
            settings.icon_size,
            settings.icon_size,
            (0, 0),
        )?;
        let composite = transform::tilt_onto(
            &base,
            &miniature,
            settings.tilt,
            (settings.offset[0], settings.offset[1]),
        );
        let bytes = codec::encode(
            &composite,
            OutputFormat::Png,
            self.ctx.settings.jpeg_quality(),
        )?;

        let key = crate::index::index_key(self.ctx, self.gallery);
        let stored = self.ctx.blobs.put(&key, &bytes)?;
        info!(gallery = %self.gallery.id, source = %self.filename(), "built index image");
        Ok(stored)
    }

    // =========================================================================
    // Transforms
    // =========================================================================

    /// Rewrite the image's pixels and return its (possibly new) filename.
    ///
    /// PNG stays PNG; everything else is re-encoded as JPEG and renamed to
    /// match. Metadata rows follow the rename.
    pub fn apply_transform(&mut self, t: Transform) -> Result<String, AssetError> {
        let format = OutputFormat::for_mime(&self.blob.mime);
        let old_name = self.filename().to_string();
        let new_name = rewrite_extension(&old_name, format.extension());
        let renamed = new_name != old_name;

        let _guard = self.lock(renamed.then_some(new_name.as_str()));
        self.require_pixels(&t.to_string())?;

        let new_key = self.blob.key.with_name(&new_name);
        if renamed && self.ctx.blobs.get(&new_key)?.is_some() {
            return Err(AssetError::NameConflict {
                from: old_name,
                to: new_name,
            });
        }

        let output = transform::apply(&self.decode()?, t)?;
        let bytes = codec::encode(&output, format, self.ctx.settings.jpeg_quality())?;

        if !renamed {
            self.blob = self.ctx.blobs.put(&new_key, &bytes)?;
        } else {
            let staged = StagedBlob::new(self.ctx.blobs, new_key.clone());
            let stored = self.ctx.blobs.put(&new_key, &bytes)?;
            let moved = self
                .ctx
                .records
                .rename_image(&self.gallery.id, &old_name, &new_name)?;
            staged.commit();
            info!(from = %old_name, to = %new_name, rows = moved, "renamed image metadata");

            // The old thumbnail key derives from the old name
            self.delete_thumbnail()?;
            self.ctx.blobs.delete(&self.blob.key)?;
            self.blob = stored;
            if let Some(rows) = self.metadata.as_mut() {
                for row in rows.iter_mut().filter(|r| r.image == old_name) {
                    row.image = new_name.clone();
                }
            }
        }

        self.dimensions = self.blob.dimensions;
        self.delete_thumbnail()?;
        self.create_thumbnail((0, 0))?;
        info!(image = %self.blob.key, transform = %t, "transformed image");
        Ok(new_name)
    }

    pub fn flip(&mut self, axis: crate::imaging::Axis) -> Result<String, AssetError> {
        self.apply_transform(Transform::Flip(axis))
    }

    pub fn rotate(&mut self, angle: f64) -> Result<String, AssetError> {
        self.apply_transform(Transform::Rotate(angle))
    }

    pub fn resize(&mut self, spec: ResizeSpec) -> Result<String, AssetError> {
        let (width, height) = spec.target(self.ctx.settings, self.dimensions)?;
        self.apply_transform(Transform::Resize { width, height })
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Remove the thumbnail, the metadata rows (when `cascade_meta`), then the
    /// image itself.
    pub fn delete(mut self, cascade_meta: bool) -> Result<(), AssetError> {
        self.remove(cascade_meta)
    }

    fn remove(&mut self, cascade_meta: bool) -> Result<(), AssetError> {
        let _guard = self.lock(None);
        self.delete_thumbnail()?;
        if cascade_meta {
            let rows = self.ctx.records.delete(
                &MetaFilter::gallery(&self.gallery.id).image(self.filename()),
            )?;
            debug!(image = %self.filename(), rows, "deleted image metadata");
            self.metadata = Some(Vec::new());
        }
        self.ctx.blobs.delete(&self.blob.key)?;
        info!(image = %self.blob.key, "deleted image");
        Ok(())
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    fn meta_filter(&self) -> MetaFilter {
        MetaFilter::gallery(&self.gallery.id).image(self.filename())
    }

    fn new_record(&self, metatype: MetaType, description: &str) -> NewMetaRecord {
        NewMetaRecord {
            gallery: self.gallery.id.clone(),
            image: self.filename().to_string(),
            metatype,
            description: description.to_string(),
        }
    }

    /// Create or replace the caption.
    pub fn set_caption(&mut self, text: &str) -> Result<(), AssetError> {
        let _guard = self.lock(None);
        let existing = self
            .ctx
            .records
            .select(&self.meta_filter().metatype(MetaType::Caption))?;

        match existing.into_iter().next() {
            Some(mut record) => {
                record.description = text.to_string();
                self.ctx.records.update(&record)?;
            }
            None => {
                self.ctx
                    .records
                    .insert(self.new_record(MetaType::Caption, text))?;
            }
        }
        self.metadata = None;
        Ok(())
    }

    pub fn add_tag(&mut self, text: &str) -> Result<u64, AssetError> {
        let _guard = self.lock(None);
        let id = self.ctx.records.insert(self.new_record(MetaType::Tag, text))?;
        self.metadata = None;
        Ok(id)
    }

    /// Remove tag `id` if it belongs to this image. Returns rows removed.
    pub fn delete_tag(&mut self, id: u64) -> Result<usize, AssetError> {
        let _guard = self.lock(None);
        let removed = self
            .ctx
            .records
            .delete(&self.meta_filter().metatype(MetaType::Tag).id(id))?;
        self.metadata = None;
        Ok(removed)
    }

    /// Caption text, empty when there is none.
    pub fn caption(&self) -> Result<String, AssetError> {
        if let Some(rows) = &self.metadata {
            return Ok(rows
                .iter()
                .find(|r| r.metatype == MetaType::Caption)
                .map(|r| r.description.clone())
                .unwrap_or_default());
        }
        Ok(self
            .ctx
            .records
            .select(&self.meta_filter().metatype(MetaType::Caption))?
            .into_iter()
            .next()
            .map(|r| r.description)
            .unwrap_or_default())
    }

    pub fn tags(&self) -> Result<Vec<MetaRecord>, AssetError> {
        if let Some(rows) = &self.metadata {
            return Ok(rows
                .iter()
                .filter(|r| r.metatype == MetaType::Tag)
                .cloned()
                .collect());
        }
        Ok(self
            .ctx
            .records
            .select(&self.meta_filter().metatype(MetaType::Tag))?)
    }

    // =========================================================================
    // Dispatch and display
    // =========================================================================

    /// Run one edit. Kinds this image doesn't support, or that are disabled
    /// in settings, are refused.
    pub fn apply(&mut self, op: Operation) -> Result<Outcome, AssetError> {
        let kind = op.kind();
        if !edit_types(self.ctx.settings, false, Some(&*self)).contains(&kind) {
            return Err(AssetError::InvalidState(format!(
                "{kind} is not available for {}",
                self.filename()
            )));
        }

        match op {
            Operation::Caption(text) => {
                self.set_caption(&text)?;
                Ok(Outcome::CaptionSet)
            }
            Operation::Delete => {
                self.remove(true)?;
                Ok(Outcome::Deleted)
            }
            Operation::Flip(axis) => Ok(Outcome::Transformed {
                filename: self.flip(axis)?,
            }),
            Operation::Resize(spec) => Ok(Outcome::Transformed {
                filename: self.resize(spec)?,
            }),
            Operation::Rotate(angle) => Ok(Outcome::Transformed {
                filename: self.rotate(angle)?,
            }),
            Operation::Tag(TagEdit::Add(text)) => Ok(Outcome::TagAdded {
                id: self.add_tag(&text)?,
            }),
            Operation::Tag(TagEdit::Remove(id)) => Ok(Outcome::TagsRemoved {
                count: self.delete_tag(id)?,
            }),
            Operation::Thumbnail { offset } => {
                let _guard = self.lock(None);
                Ok(Outcome::Thumbnail(self.create_thumbnail(offset)?))
            }
        }
    }

    /// The per-image display fragment.
    pub fn display(&self, editing: bool) -> Result<Markup, AssetError> {
        let settings = self.ctx.settings;
        let caption = self.caption()?;
        let caption = if self.gallery.caption_full {
            caption
        } else {
            truncate_label(&caption, settings.captions.max_label)
        };

        let ext_info = self.gallery.ext_info.then(|| ExtInfo {
            timestamp: self
                .blob
                .modified
                .format(&settings.display.date_format)
                .to_string(),
            size_kb: render::size_kb(self.blob.size),
            dimensions: self.dimensions,
        });

        let options = if editing {
            edit_types(settings, false, Some(self))
        } else {
            Vec::new()
        };
        let edit_menu = editing.then(|| EditMenu {
            gallery: &self.gallery.id,
            image: self.filename(),
            options: &options,
        });

        let image_url = self.image_url();
        let thumbnail_url = self.thumbnail_url();
        Ok(render::image_card(&ImageCard {
            image_url: &image_url,
            thumbnail_url: &thumbnail_url,
            caption: &caption,
            position: self.gallery.caption_position,
            thumb_size: settings.thumbnail_size(),
            ext_info,
            edit_menu,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Axis;
    use crate::test_helpers::*;
    use crate::types::CaptionPosition;

    // =========================================================================
    // Construction and thumbnails
    // =========================================================================

    #[test]
    fn load_generates_missing_thumbnail() {
        let fx = Fixture::new();
        fx.put_image("a.png", &png_bytes(400, 300));
        let asset = fx.open("a.png");

        let thumb = asset.thumbnail();
        assert_eq!(thumb.key.area, Area::Thumbs);
        assert_eq!(thumb.key.name, "a.png.png");
        let dims = thumb.dimensions.unwrap();
        assert_eq!((dims.width, dims.height), (162, 132));
    }

    #[test]
    fn load_reuses_existing_thumbnail() {
        let fx = Fixture::new();
        fx.put_image("a.png", &png_bytes(400, 300));
        let first = fx.open("a.png").thumbnail().clone();
        let second = fx.open("a.png").thumbnail().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn thumbnail_is_deterministic() {
        let fx = Fixture::new();
        fx.put_image("a.jpg", &jpeg_bytes(320, 200));
        let mut asset = fx.open("a.jpg");

        let one = asset.create_thumbnail((0, 0)).unwrap();
        let one = fx.decode(&one.key);
        let two = asset.create_thumbnail((0, 0)).unwrap();
        let two = fx.decode(&two.key);
        assert_eq!(one, two);
    }

    #[test]
    fn skipped_dimensions_make_image_its_own_thumbnail() {
        let fx = Fixture::new();
        let blob = fx.put_image("a.png", &png_bytes(40, 30));
        let asset = ImageAsset::load_with(
            fx.ctx(),
            &fx.gallery,
            blob.clone(),
            LoadOptions {
                read_dimensions: false,
                ..LoadOptions::default()
            },
        )
        .unwrap();
        assert_eq!(asset.thumbnail(), &blob);
        assert!(fx.blobs.get(&asset.thumbnail_key()).unwrap().is_none());
    }

    #[test]
    fn open_missing_is_not_found() {
        let fx = Fixture::new();
        let result = ImageAsset::open(fx.ctx(), &fx.gallery, "/", "ghost.png");
        assert!(matches!(result, Err(AssetError::NotFound(_))));
    }

    // =========================================================================
    // Vector images
    // =========================================================================

    #[test]
    fn vector_options_and_thumbnail() {
        let fx = Fixture::new();
        let blob = fx.put_image("logo.svg", &svg_bytes());
        let mut asset = fx.open("logo.svg");

        assert_eq!(
            asset.editing_options(),
            vec![EditKind::Caption, EditKind::Delete, EditKind::Tag]
        );
        assert_eq!(asset.create_thumbnail((0, 0)).unwrap(), blob);
        assert_eq!(asset.thumbnail_url(), asset.image_url());
        assert!(fx.blobs.list(CONTAINER, Area::Thumbs, &fx.gallery.id).unwrap().is_empty());
    }

    #[test]
    fn vector_refuses_geometric_operations() {
        let fx = Fixture::new();
        fx.put_image("logo.svg", &svg_bytes());
        let mut asset = fx.open("logo.svg");

        assert!(matches!(
            asset.apply(Operation::Rotate(90.0)),
            Err(AssetError::InvalidState(_))
        ));
        assert!(matches!(
            asset.apply_transform(Transform::Flip(Axis::Vertical)),
            Err(AssetError::InvalidState(_))
        ));
        assert!(matches!(
            asset.create_index_asset(),
            Err(AssetError::InvalidState(_))
        ));
    }

    // =========================================================================
    // Transforms
    // =========================================================================

    #[test]
    fn resize_reads_back_target_dimensions() {
        let fx = Fixture::new();
        fx.put_image("a.png", &png_bytes(300, 200));
        let mut asset = fx.open("a.png");

        let name = asset
            .resize(ResizeSpec::Exact {
                width: 120,
                height: 90,
            })
            .unwrap();
        assert_eq!(name, "a.png");

        let stored = fx.blobs.get(&fx.image_key("a.png")).unwrap().unwrap();
        let dims = stored.dimensions.unwrap();
        assert_eq!((dims.width, dims.height), (120, 90));
        assert_eq!(asset.dimensions(), Some(dims));
    }

    #[test]
    fn png_transform_keeps_name_and_alpha() {
        let fx = Fixture::new();
        fx.put_image("a.png", &png_bytes(30, 20));
        let mut asset = fx.open("a.png");

        assert_eq!(asset.rotate(45.0).unwrap(), "a.png");
        let img = fx.decode(&fx.image_key("a.png"));
        // Corner exposed by the rotation stays transparent in PNG
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn rename_moves_every_metadata_row() {
        let fx = Fixture::new();
        fx.put_image("a.gif", &gif_bytes(40, 30));
        let mut asset = fx.open("a.gif");
        asset.set_caption("harbour").unwrap();
        asset.add_tag("sea").unwrap();
        asset.add_tag("boats").unwrap();

        let name = asset.rotate(90.0).unwrap();
        assert_eq!(name, "a.jpg");
        assert_eq!(asset.filename(), "a.jpg");

        let gallery = &fx.gallery.id;
        let old_rows = fx
            .records
            .select(&MetaFilter::gallery(gallery).image("a.gif"))
            .unwrap();
        let new_rows = fx
            .records
            .select(&MetaFilter::gallery(gallery).image("a.jpg"))
            .unwrap();
        assert!(old_rows.is_empty());
        assert_eq!(new_rows.len(), 3);

        // Old blob and thumbnail gone, new ones present
        assert!(fx.blobs.get(&fx.image_key("a.gif")).unwrap().is_none());
        assert!(fx.blobs.get(&fx.thumb_key("a.gif.png")).unwrap().is_none());
        let stored = fx.blobs.get(&fx.image_key("a.jpg")).unwrap().unwrap();
        assert_eq!(stored.mime, "image/jpeg");
        let dims = stored.dimensions.unwrap();
        assert_eq!((dims.width, dims.height), (30, 40));
        assert!(fx.blobs.get(&fx.thumb_key("a.jpg.png")).unwrap().is_some());
    }

    #[test]
    fn rename_onto_existing_image_is_refused() {
        let fx = Fixture::new();
        fx.put_image("a.gif", &gif_bytes(40, 30));
        fx.put_image("a.jpg", &jpeg_bytes(10, 10));
        let mut asset = fx.open("a.gif");
        asset.add_tag("keep").unwrap();

        let err = asset.flip(Axis::Horizontal).unwrap_err();
        assert!(matches!(err, AssetError::NameConflict { .. }));

        // Nothing moved
        assert!(fx.blobs.get(&fx.image_key("a.gif")).unwrap().is_some());
        assert_eq!(
            fx.decode(&fx.image_key("a.jpg")).dimensions(),
            (10, 10)
        );
        assert_eq!(
            fx.records
                .select(&MetaFilter::gallery(&fx.gallery.id).image("a.gif"))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn failed_metadata_rename_removes_staged_blob() {
        let fx = Fixture::new();
        fx.put_image("a.gif", &gif_bytes(20, 20));
        // An orphan caption already points at the target name
        fx.records
            .insert(NewMetaRecord {
                gallery: fx.gallery.id.clone(),
                image: "a.jpg".into(),
                metatype: MetaType::Caption,
                description: "orphan".into(),
            })
            .unwrap();
        let mut asset = fx.open("a.gif");
        asset.set_caption("mine").unwrap();

        let err = asset.rotate(180.0).unwrap_err();
        assert!(matches!(err, AssetError::Storage(StoreError::Conflict(_))));
        assert!(fx.blobs.get(&fx.image_key("a.jpg")).unwrap().is_none());
        assert!(fx.blobs.get(&fx.image_key("a.gif")).unwrap().is_some());
        assert_eq!(asset.filename(), "a.gif");
    }

    #[test]
    fn transform_updates_prefetched_metadata() {
        let fx = Fixture::new();
        let blob = fx.put_image("a.gif", &gif_bytes(20, 20));
        fx.records
            .insert(NewMetaRecord {
                gallery: fx.gallery.id.clone(),
                image: "a.gif".into(),
                metatype: MetaType::Caption,
                description: "kept".into(),
            })
            .unwrap();
        let rows = fx
            .records
            .select(&MetaFilter::gallery(&fx.gallery.id))
            .unwrap();
        let mut asset =
            ImageAsset::with_prefetched(fx.ctx(), &fx.gallery, blob, None, rows).unwrap();

        asset.flip(Axis::Vertical).unwrap();
        assert_eq!(asset.caption().unwrap(), "kept");
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    #[test]
    fn delete_cascades_to_metadata_and_thumbnail() {
        let fx = Fixture::new();
        fx.put_image("a.png", &png_bytes(50, 50));
        fx.put_image("b.png", &png_bytes(50, 50));
        let mut asset = fx.open("a.png");
        asset.set_caption("gone").unwrap();
        asset.add_tag("gone too").unwrap();
        fx.open("b.png").add_tag("stays").unwrap();

        asset.delete(true).unwrap();

        assert!(fx.blobs.get(&fx.image_key("a.png")).unwrap().is_none());
        assert!(fx.blobs.get(&fx.thumb_key("a.png.png")).unwrap().is_none());
        let rows = fx
            .records
            .select(&MetaFilter::gallery(&fx.gallery.id))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].image, "b.png");
    }

    #[test]
    fn delete_without_cascade_keeps_metadata() {
        let fx = Fixture::new();
        fx.put_image("a.png", &png_bytes(50, 50));
        let mut asset = fx.open("a.png");
        asset.add_tag("orphan").unwrap();
        asset.delete(false).unwrap();
        assert_eq!(fx.records.len(), 1);
    }

    // =========================================================================
    // Captions and tags
    // =========================================================================

    #[test]
    fn caption_is_upserted() {
        let fx = Fixture::new();
        fx.put_image("a.png", &png_bytes(20, 20));
        let mut asset = fx.open("a.png");
        assert_eq!(asset.caption().unwrap(), "");

        asset.set_caption("first").unwrap();
        asset.set_caption("second").unwrap();
        assert_eq!(asset.caption().unwrap(), "second");
        assert_eq!(
            fx.records
                .select(&MetaFilter::default().metatype(MetaType::Caption))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn delete_tag_is_scoped_to_image() {
        let fx = Fixture::new();
        fx.put_image("a.png", &png_bytes(20, 20));
        fx.put_image("b.png", &png_bytes(20, 20));
        let other = fx.open("b.png").add_tag("not yours").unwrap();

        let mut asset = fx.open("a.png");
        let mine = asset.add_tag("mine").unwrap();
        assert_eq!(asset.delete_tag(other).unwrap(), 0);
        assert_eq!(asset.delete_tag(mine).unwrap(), 1);
        assert!(asset.tags().unwrap().is_empty());
        assert_eq!(fx.open("b.png").tags().unwrap().len(), 1);
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    #[test]
    fn apply_refuses_disabled_kinds() {
        let mut fx = Fixture::new();
        fx.settings.editing.disabled = vec![EditKind::Rotate];
        fx.put_image("a.png", &png_bytes(20, 20));
        let mut asset = fx.open("a.png");
        assert!(matches!(
            asset.apply(Operation::Rotate(90.0)),
            Err(AssetError::InvalidState(_))
        ));
        assert_eq!(
            asset.apply(Operation::Caption("ok".into())).unwrap(),
            Outcome::CaptionSet
        );
    }

    #[test]
    fn apply_dispatches() {
        let fx = Fixture::new();
        fx.put_image("a.webp", &png_bytes(20, 10));
        let mut asset = fx.open("a.webp");

        let outcome = asset
            .apply(Operation::Resize(ResizeSpec::Scale(50)))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Transformed {
                filename: "a.jpg".into()
            }
        );
        assert!(matches!(
            asset.apply(Operation::Tag(TagEdit::Add("x".into()))).unwrap(),
            Outcome::TagAdded { .. }
        ));
        assert!(matches!(
            asset
                .apply(Operation::Thumbnail { offset: (2, 0) })
                .unwrap(),
            Outcome::Thumbnail(_)
        ));
        assert_eq!(asset.apply(Operation::Delete).unwrap(), Outcome::Deleted);
        assert!(fx.blobs.get(&fx.image_key("a.jpg")).unwrap().is_none());
    }

    // =========================================================================
    // Display
    // =========================================================================

    #[test]
    fn display_truncates_caption_and_links_urls() {
        let fx = Fixture::new();
        fx.put_image("a.png", &png_bytes(20, 20));
        let mut asset = fx.open("a.png");
        asset.set_caption("a rather long caption").unwrap();

        let html = asset.display(false).unwrap().into_string();
        assert!(html.contains("a rather long..."));
        assert!(html.contains(&asset.image_url()));
        assert!(html.contains("/files/gallery/thumbs/7/a.png.png?mtime="));
        assert!(!html.contains("<form"));
    }

    #[test]
    fn display_hidden_caption_is_empty() {
        let mut fx = Fixture::new();
        fx.gallery.caption_position = CaptionPosition::Hidden;
        fx.put_image("a.png", &png_bytes(20, 20));
        let mut asset = fx.open("a.png");
        asset.set_caption("secret").unwrap();
        let html = asset.display(false).unwrap().into_string();
        assert!(!html.contains("secret"));
    }

    #[test]
    fn display_editing_lists_allowed_options() {
        let fx = Fixture::new();
        fx.put_image("logo.svg", &svg_bytes());
        let html = fx.open("logo.svg").display(true).unwrap().into_string();
        assert!(html.contains(r#"value="caption""#));
        assert!(html.contains(r#"value="tag""#));
        assert!(!html.contains(r#"value="rotate""#));
    }

    #[test]
    fn display_ext_info() {
        let mut fx = Fixture::new();
        fx.gallery.ext_info = true;
        fx.put_image("a.png", &png_bytes(64, 48));
        let html = fx.open("a.png").display(false).unwrap().into_string();
        assert!(html.contains("64x48px"));
        assert!(html.contains("KB"));
    }
}
