//! In-process stores. Everything lives behind a `Mutex` so the stores are
//! `Sync` and can sit behind `&dyn` trait objects.

use super::{
    Area, BlobKey, BlobRef, BlobStore, MetaFilter, MetaRecord, NewMetaRecord, RecordStore,
    RecordTable, StoreError,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct StoredBlob {
    bytes: Vec<u8>,
    meta: BlobRef,
}

/// Blob store backed by an ordered map. `BlobKey` orders by container, area,
/// item, path, name, so range scans come out in listing order.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<BlobKey, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> MutexGuard<'_, BTreeMap<BlobKey, StoredBlob>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store with an explicit modification time.
    pub fn put_at(
        &self,
        key: &BlobKey,
        bytes: &[u8],
        modified: DateTime<Utc>,
    ) -> Result<BlobRef, StoreError> {
        key.check()?;
        let meta = BlobRef::describe(key.clone(), bytes, modified);
        self.blobs().insert(
            key.clone(),
            StoredBlob {
                bytes: bytes.to_vec(),
                meta: meta.clone(),
            },
        );
        Ok(meta)
    }

    pub fn len(&self) -> usize {
        self.blobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<BlobRef, StoreError> {
        self.put_at(key, bytes, Utc::now())
    }

    fn get(&self, key: &BlobKey) -> Result<Option<BlobRef>, StoreError> {
        Ok(self.blobs().get(key).map(|b| b.meta.clone()))
    }

    fn list(&self, container: &str, area: Area, item: &str) -> Result<Vec<BlobRef>, StoreError> {
        Ok(self
            .blobs()
            .values()
            .filter(|b| {
                b.meta.key.container == container && b.meta.key.area == area && b.meta.key.item == item
            })
            .map(|b| b.meta.clone())
            .collect())
    }

    fn read(&self, key: &BlobKey) -> Result<Vec<u8>, StoreError> {
        self.blobs()
            .get(key)
            .map(|b| b.bytes.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &BlobKey) -> Result<bool, StoreError> {
        Ok(self.blobs().remove(key).is_some())
    }
}

/// Record store over a [`RecordTable`].
#[derive(Default)]
pub struct MemoryRecordStore {
    table: Mutex<RecordTable>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, RecordTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert(&self, record: NewMetaRecord) -> Result<u64, StoreError> {
        self.table().insert(record)
    }

    fn update(&self, record: &MetaRecord) -> Result<(), StoreError> {
        self.table().update(record)
    }

    fn delete(&self, filter: &MetaFilter) -> Result<usize, StoreError> {
        Ok(self.table().delete(filter))
    }

    fn select(&self, filter: &MetaFilter) -> Result<Vec<MetaRecord>, StoreError> {
        Ok(self.table().select(filter))
    }

    fn rename_image(&self, gallery: &str, old: &str, new: &str) -> Result<usize, StoreError> {
        self.table().rename_image(gallery, old, new)
    }
}
