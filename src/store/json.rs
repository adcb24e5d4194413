//! Record store persisted as a single JSON document.
//!
//! The whole table is held in memory and rewritten after every change. A
//! change is applied to a copy first and only becomes visible once the file
//! write succeeded, so memory and disk never disagree.
//!
//! ```json
//! {
//!   "version": 1,
//!   "table": { "next_id": 3, "rows": { "1": { "id": 1, "gallery": "7", ... } } }
//! }
//! ```

use super::{MetaFilter, MetaRecord, NewMetaRecord, RecordStore, RecordTable, StoreError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Version of the on-disk format. Files with another version are refused.
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Document {
    version: u32,
    table: RecordTable,
}

pub struct JsonRecordStore {
    path: PathBuf,
    table: Mutex<RecordTable>,
}

impl JsonRecordStore {
    /// Open `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let doc: Document = serde_json::from_str(&content)?;
                if doc.version != FORMAT_VERSION {
                    return Err(StoreError::Conflict(format!(
                        "{} has format version {}, expected {FORMAT_VERSION}",
                        path.display(),
                        doc.version
                    )));
                }
                doc.table
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecordTable::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    fn table(&self) -> MutexGuard<'_, RecordTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&self, table: &RecordTable) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let doc = Document {
            version: FORMAT_VERSION,
            table: table.clone(),
        };
        let json = serde_json::to_string_pretty(&doc)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), rows = table.len(), "saved records");
        Ok(())
    }

    /// Apply `change` to a copy, persist, then swap it in.
    fn write<T>(
        &self,
        change: impl FnOnce(&mut RecordTable) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.table();
        let mut next = guard.clone();
        let out = change(&mut next)?;
        self.save(&next)?;
        *guard = next;
        Ok(out)
    }
}

impl RecordStore for JsonRecordStore {
    fn insert(&self, record: NewMetaRecord) -> Result<u64, StoreError> {
        self.write(|t| t.insert(record))
    }

    fn update(&self, record: &MetaRecord) -> Result<(), StoreError> {
        self.write(|t| t.update(record))
    }

    fn delete(&self, filter: &MetaFilter) -> Result<usize, StoreError> {
        self.write(|t| Ok(t.delete(filter)))
    }

    fn select(&self, filter: &MetaFilter) -> Result<Vec<MetaRecord>, StoreError> {
        Ok(self.table().select(filter))
    }

    fn rename_image(&self, gallery: &str, old: &str, new: &str) -> Result<usize, StoreError> {
        self.write(|t| t.rename_image(gallery, old, new))
    }
}
