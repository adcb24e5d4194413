//! End-to-end gallery workflow against the on-disk stores.
//!
//! Uploads, edits, pages and deletes images through the public API with a
//! directory blob store and a JSON record store, then reopens the record
//! store to check that what was written survives.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use shoebox::asset::{EditLocks, ImageAsset, Operation, Outcome, TagEdit};
use shoebox::config::Settings;
use shoebox::context::Context;
use shoebox::imaging::Axis;
use shoebox::index;
use shoebox::page::GalleryPage;
use shoebox::store::{
    BlobKey, BlobStore, FsBlobStore, JsonRecordStore, MetaFilter, MetaType, RecordStore,
};
use shoebox::types::{Area, Gallery, SortPolicy};
use shoebox::upload::{Upload, add_images};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

const CONTAINER: &str = "gallery";

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
    });
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
        _ => DynamicImage::ImageRgba8(img),
    };
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

struct Env {
    _tmp: TempDir,
    blobs: FsBlobStore,
    records: JsonRecordStore,
    settings: Settings,
    locks: EditLocks,
    gallery: Gallery,
}

impl Env {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let blobs = FsBlobStore::new(tmp.path().join("blobs"));
        let records = JsonRecordStore::open(tmp.path().join("meta.json")).unwrap();
        Self {
            _tmp: tmp,
            blobs,
            records,
            settings: Settings::default(),
            locks: EditLocks::new(),
            gallery: Gallery::new("42"),
        }
    }

    fn root(&self) -> &Path {
        self._tmp.path()
    }

    fn ctx(&self) -> Context<'_> {
        Context::new(
            &self.blobs,
            &self.records,
            &self.settings,
            &self.locks,
            CONTAINER,
        )
    }

    fn key(&self, area: Area, name: &str) -> BlobKey {
        BlobKey::new(CONTAINER, area, &self.gallery.id, "/", name)
    }

    fn rows_for(&self, image: &str) -> usize {
        self.records
            .select(&MetaFilter::gallery(&self.gallery.id).image(image))
            .unwrap()
            .len()
    }
}

// =========================================================================
// Rename propagation
// =========================================================================

#[test]
fn transform_rename_carries_metadata_to_disk() {
    let env = Env::new();
    add_images(
        env.ctx(),
        &env.gallery,
        vec![Upload::new("a.gif", encoded(60, 40, ImageFormat::Gif))],
        None,
    )
    .unwrap();

    let mut asset = ImageAsset::open(env.ctx(), &env.gallery, "/", "a.gif").unwrap();
    asset.add_tag("sea").unwrap();
    asset.add_tag("boats").unwrap();
    // Upload captioned it with its filename
    assert_eq!(env.rows_for("a.gif"), 3);

    let outcome = asset.apply(Operation::Rotate(90.0)).unwrap();
    assert_eq!(
        outcome,
        Outcome::Transformed {
            filename: "a.jpg".into()
        }
    );

    assert_eq!(env.rows_for("a.gif"), 0);
    assert_eq!(env.rows_for("a.jpg"), 3);

    let images = env.root().join("blobs/gallery/images/42");
    assert!(!images.join("a.gif").exists());
    assert!(images.join("a.jpg").exists());
    let thumbs = env.root().join("blobs/gallery/thumbs/42");
    assert!(!thumbs.join("a.gif.png").exists());
    assert!(thumbs.join("a.jpg.png").exists());

    let rotated = env.blobs.get(&env.key(Area::Images, "a.jpg")).unwrap().unwrap();
    let dims = rotated.dimensions.unwrap();
    assert_eq!((dims.width, dims.height), (40, 60));

    // Rows survive a reopen under the new name
    let reopened = JsonRecordStore::open(env.root().join("meta.json")).unwrap();
    let rows = reopened
        .select(&MetaFilter::gallery("42").image("a.jpg"))
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows.iter()
            .filter(|r| r.metatype == MetaType::Caption)
            .map(|r| r.description.as_str())
            .collect::<Vec<_>>(),
        ["a.gif"]
    );
    assert_eq!(reopened.gallery_tags("42").unwrap(), ["boats", "sea"]);
}

#[test]
fn png_edits_keep_their_name() {
    let env = Env::new();
    add_images(
        env.ctx(),
        &env.gallery,
        vec![Upload::new("b.png", encoded(30, 30, ImageFormat::Png))],
        None,
    )
    .unwrap();

    let mut asset = ImageAsset::open(env.ctx(), &env.gallery, "/", "b.png").unwrap();
    assert_eq!(asset.flip(Axis::Horizontal).unwrap(), "b.png");
    assert_eq!(env.rows_for("b.png"), 1);
}

// =========================================================================
// Delete cascade
// =========================================================================

#[test]
fn delete_removes_blob_thumbnail_and_rows() {
    let env = Env::new();
    add_images(
        env.ctx(),
        &env.gallery,
        vec![
            Upload::new("keep.jpg", encoded(20, 20, ImageFormat::Jpeg)),
            Upload::new("drop.jpg", encoded(20, 20, ImageFormat::Jpeg)),
        ],
        None,
    )
    .unwrap();

    let mut asset = ImageAsset::open(env.ctx(), &env.gallery, "/", "drop.jpg").unwrap();
    asset.apply(Operation::Tag(TagEdit::Add("x".into()))).unwrap();
    assert_eq!(asset.apply(Operation::Delete).unwrap(), Outcome::Deleted);

    assert!(env.blobs.get(&env.key(Area::Images, "drop.jpg")).unwrap().is_none());
    assert!(env.blobs.get(&env.key(Area::Thumbs, "drop.jpg.png")).unwrap().is_none());
    assert_eq!(env.rows_for("drop.jpg"), 0);
    assert_eq!(env.rows_for("keep.jpg"), 1);
}

// =========================================================================
// Pages and index
// =========================================================================

#[test]
fn pages_split_and_render_with_urls() {
    let mut env = Env::new();
    env.gallery.per_page = 10;
    env.gallery.sort = SortPolicy::ByFilenameNatural;

    let uploads = (1..=25)
        .map(|i| Upload::new(format!("img{i}.png"), encoded(8, 8, ImageFormat::Png)))
        .collect();
    add_images(env.ctx(), &env.gallery, uploads, None).unwrap();

    let expect = |page: usize, range: std::ops::RangeInclusive<usize>| {
        let loaded = GalleryPage::load(env.ctx(), &env.gallery, page).unwrap();
        assert_eq!(loaded.image_count(), 25);
        let names: Vec<String> = loaded
            .entries()
            .iter()
            .map(|e| e.filename().to_string())
            .collect();
        let expected: Vec<String> = range.map(|i| format!("img{i}.png")).collect();
        assert_eq!(names, expected, "page {page}");
    };
    expect(0, 1..=10);
    expect(1, 11..=20);
    expect(2, 21..=25);
    expect(3, 1..=0);

    let html = GalleryPage::load(env.ctx(), &env.gallery, 2)
        .unwrap()
        .render(true)
        .unwrap()
        .into_string();
    assert_eq!(html.matches("lightbox-gallery-image-container").count(), 5);
    assert!(html.contains("/files/gallery/images/42/img21.png?mtime="));
    assert!(html.contains("/files/gallery/thumbs/42/img21.png.png?mtime="));
    assert!(html.contains(r#"<option value="rotate">"#));
}

#[test]
fn index_icon_is_built_once() {
    let env = Env::new();
    add_images(
        env.ctx(),
        &env.gallery,
        vec![Upload::new("cover.png", encoded(120, 90, ImageFormat::Png))],
        None,
    )
    .unwrap();

    let first = index::get_or_build_index(env.ctx(), &env.gallery, None).unwrap();
    assert!(env.root().join("blobs/gallery/index/42/index.png").exists());
    let second = index::get_or_build_index(env.ctx(), &env.gallery, None).unwrap();
    assert_eq!(first, second);
}
