//! Caption and tag rows, plus the in-memory table both reference record
//! stores share.

use super::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaType {
    Caption,
    Tag,
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaType::Caption => f.write_str("caption"),
            MetaType::Tag => f.write_str("tag"),
        }
    }
}

/// One metadata row. `image` is always the current filename of the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub id: u64,
    pub gallery: String,
    pub image: String,
    pub metatype: MetaType,
    pub description: String,
}

/// A row before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMetaRecord {
    pub gallery: String,
    pub image: String,
    pub metatype: MetaType,
    pub description: String,
}

/// Row selector. Unset fields match everything.
///
/// ```
/// # use shoebox::store::{MetaFilter, MetaType};
/// let captions = MetaFilter::gallery("7").image("a.jpg").metatype(MetaType::Caption);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaFilter {
    pub id: Option<u64>,
    pub gallery: Option<String>,
    pub images: Option<Vec<String>>,
    pub metatype: Option<MetaType>,
}

impl MetaFilter {
    pub fn gallery(gallery: impl Into<String>) -> Self {
        Self {
            gallery: Some(gallery.into()),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.images = Some(vec![image.into()]);
        self
    }

    /// Restrict to any of `images` (an SQL `IN` list).
    pub fn images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.images = Some(images.into_iter().map(Into::into).collect());
        self
    }

    pub fn metatype(mut self, metatype: MetaType) -> Self {
        self.metatype = Some(metatype);
        self
    }

    pub fn matches(&self, record: &MetaRecord) -> bool {
        self.id.is_none_or(|id| id == record.id)
            && self
                .gallery
                .as_deref()
                .is_none_or(|g| g == record.gallery)
            && self
                .images
                .as_ref()
                .is_none_or(|images| images.iter().any(|i| *i == record.image))
            && self.metatype.is_none_or(|t| t == record.metatype)
    }
}

/// Rows keyed by id with a monotonically increasing id counter.
///
/// Enforces at most one caption per (gallery, image).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordTable {
    next_id: u64,
    rows: BTreeMap<u64, MetaRecord>,
}

impl Default for RecordTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl RecordTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn has_caption(&self, gallery: &str, image: &str, except: Option<u64>) -> bool {
        self.rows.values().any(|r| {
            r.metatype == MetaType::Caption
                && r.gallery == gallery
                && r.image == image
                && Some(r.id) != except
        })
    }

    pub fn insert(&mut self, record: NewMetaRecord) -> Result<u64, StoreError> {
        if record.metatype == MetaType::Caption
            && self.has_caption(&record.gallery, &record.image, None)
        {
            return Err(StoreError::Conflict(format!(
                "caption already exists for {} in gallery {}",
                record.image, record.gallery
            )));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(
            id,
            MetaRecord {
                id,
                gallery: record.gallery,
                image: record.image,
                metatype: record.metatype,
                description: record.description,
            },
        );
        Ok(id)
    }

    pub fn update(&mut self, record: &MetaRecord) -> Result<(), StoreError> {
        if !self.rows.contains_key(&record.id) {
            return Err(StoreError::NotFound(format!("record {}", record.id)));
        }
        if record.metatype == MetaType::Caption
            && self.has_caption(&record.gallery, &record.image, Some(record.id))
        {
            return Err(StoreError::Conflict(format!(
                "caption already exists for {} in gallery {}",
                record.image, record.gallery
            )));
        }
        self.rows.insert(record.id, record.clone());
        Ok(())
    }

    pub fn delete(&mut self, filter: &MetaFilter) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, r| !filter.matches(r));
        before - self.rows.len()
    }

    pub fn select(&self, filter: &MetaFilter) -> Vec<MetaRecord> {
        self.rows
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    /// Rename in place. Fails without touching any row if `new` already has
    /// a caption and `old` brings one along.
    pub fn rename_image(&mut self, gallery: &str, old: &str, new: &str) -> Result<usize, StoreError> {
        if old == new {
            return Ok(0);
        }
        if self.has_caption(gallery, old, None) && self.has_caption(gallery, new, None) {
            return Err(StoreError::Conflict(format!(
                "both {old} and {new} carry a caption in gallery {gallery}"
            )));
        }

        let mut changed = 0;
        for row in self.rows.values_mut() {
            if row.gallery == gallery && row.image == old {
                row.image = new.to_string();
                changed += 1;
            }
        }
        Ok(changed)
    }
}
