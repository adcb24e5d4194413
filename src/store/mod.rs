//! Storage seams: blob storage for image bytes and a record store for
//! captions and tags.
//!
//! Both are traits so the engine never assumes a particular persistence
//! backend. Reference implementations:
//!
//! | Store | Backing | Used by |
//! |---|---|---|
//! | [`MemoryBlobStore`] | `Mutex<BTreeMap>` | tests |
//! | [`MemoryRecordStore`] | `Mutex<RecordTable>` | tests |
//! | [`FsBlobStore`] | directory tree | CLI |
//! | [`JsonRecordStore`] | JSON file, rewritten on every change | CLI |
//!
//! ## Blob addressing
//!
//! A blob lives at `(container, area, item, path, name)`. `item` is the
//! gallery id, `path` is a `/`-delimited folder inside it (`/` for the top
//! level), and `name` is the filename. Enumeration order is path, then name.

mod fs;
mod json;
mod memory;
mod records;

pub use fs::FsBlobStore;
pub use json::JsonRecordStore;
pub use memory::{MemoryBlobStore, MemoryRecordStore};
pub use records::{MetaFilter, MetaRecord, MetaType, NewMetaRecord, RecordTable};

use crate::imaging::Dimensions;
use crate::imaging::codec::{self, is_vector, mime_for_name};
use crate::types::Area;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Address of one blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobKey {
    pub container: String,
    pub area: Area,
    pub item: String,
    /// Folder inside the item; always starts and ends with `/`.
    pub path: String,
    pub name: String,
}

impl BlobKey {
    /// Build a key, normalizing `path` to the `/dir/` form.
    pub fn new(
        container: impl Into<String>,
        area: Area,
        item: impl Into<String>,
        path: &str,
        name: impl Into<String>,
    ) -> Self {
        Self {
            container: container.into(),
            area,
            item: item.into(),
            path: normalize_path(path),
            name: name.into(),
        }
    }

    /// Same location, different filename.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Same path and name, different area.
    pub fn in_area(&self, area: Area) -> Self {
        Self {
            area,
            ..self.clone()
        }
    }

    /// `<container>/<area>/<item><path><name>`, the tail of every URL.
    pub fn url_path(&self) -> String {
        format!(
            "{}/{}/{}{}{}",
            self.container, self.area, self.item, self.path, self.name
        )
    }

    /// Reject names and paths that could escape their item.
    pub fn check(&self) -> Result<(), StoreError> {
        let bad_segment = |s: &str| s == ".." || s == ".";
        let invalid = self.name.is_empty()
            || self.name.contains('/')
            || self.name.contains('\\')
            || bad_segment(&self.name)
            || self.item.is_empty()
            || self.item.contains('/')
            || bad_segment(&self.item)
            || self.path.split('/').any(bad_segment);
        if invalid {
            return Err(StoreError::Backend(format!("invalid blob key {self}")));
        }
        Ok(())
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url_path())
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

/// A stored blob as seen by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobRef {
    pub key: BlobKey,
    pub mime: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Pixel size read from the header; `None` for vector or unreadable data.
    pub dimensions: Option<Dimensions>,
}

impl BlobRef {
    /// Describe `bytes` stored under `key`. Mime comes from the filename,
    /// dimensions from the header.
    pub fn describe(key: BlobKey, bytes: &[u8], modified: DateTime<Utc>) -> Self {
        let dimensions = (!is_vector(mime_for_name(&key.name)))
            .then(|| codec::probe(bytes))
            .flatten();
        Self::new(key, bytes.len() as u64, modified, dimensions)
    }

    /// Describe a blob whose size and dimensions were read elsewhere.
    pub fn new(
        key: BlobKey,
        size: u64,
        modified: DateTime<Utc>,
        dimensions: Option<Dimensions>,
    ) -> Self {
        let mime = mime_for_name(&key.name);
        Self {
            key,
            mime: mime.to_string(),
            size,
            modified,
            dimensions: if is_vector(mime) { None } else { dimensions },
        }
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn is_vector(&self) -> bool {
        is_vector(&self.mime)
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// Path-addressed blob storage.
pub trait BlobStore: Sync {
    /// Create or replace the blob at `key`.
    fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<BlobRef, StoreError>;

    fn get(&self, key: &BlobKey) -> Result<Option<BlobRef>, StoreError>;

    /// All blobs of one item in an area, ordered by path then name.
    fn list(&self, container: &str, area: Area, item: &str) -> Result<Vec<BlobRef>, StoreError>;

    /// Full contents. Missing blobs are [`StoreError::NotFound`].
    fn read(&self, key: &BlobKey) -> Result<Vec<u8>, StoreError>;

    /// Remove a blob. Returns whether anything was there.
    fn delete(&self, key: &BlobKey) -> Result<bool, StoreError>;
}

/// Row storage for captions and tags.
pub trait RecordStore: Sync {
    /// Insert a row and return its generated id.
    fn insert(&self, record: NewMetaRecord) -> Result<u64, StoreError>;

    /// Replace the row with `record.id`.
    fn update(&self, record: &MetaRecord) -> Result<(), StoreError>;

    /// Delete every matching row; returns how many went.
    fn delete(&self, filter: &MetaFilter) -> Result<usize, StoreError>;

    /// Matching rows in id order.
    fn select(&self, filter: &MetaFilter) -> Result<Vec<MetaRecord>, StoreError>;

    /// Point every row of `gallery` that references `old` at `new`, as one
    /// statement. Returns the number of rows changed.
    fn rename_image(&self, gallery: &str, old: &str, new: &str) -> Result<usize, StoreError>;

    /// Distinct tag texts used anywhere in `gallery`, in byte order.
    fn gallery_tags(&self, gallery: &str) -> Result<Vec<String>, StoreError> {
        let mut tags: Vec<String> = self
            .select(&MetaFilter::gallery(gallery).metatype(MetaType::Tag))?
            .into_iter()
            .map(|r| r.description)
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }
}
