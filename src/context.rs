//! Everything a request needs, passed explicitly.

use crate::asset::EditLocks;
use crate::config::Settings;
use crate::store::{BlobStore, RecordStore};

/// Store handles, settings and locks for one container.
///
/// Cheap to copy; every field is a borrow.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub blobs: &'a dyn BlobStore,
    pub records: &'a dyn RecordStore,
    pub settings: &'a Settings,
    pub locks: &'a EditLocks,
    /// Top-level namespace for blob keys and URLs.
    pub container: &'a str,
}

impl<'a> Context<'a> {
    pub fn new(
        blobs: &'a dyn BlobStore,
        records: &'a dyn RecordStore,
        settings: &'a Settings,
        locks: &'a EditLocks,
        container: &'a str,
    ) -> Self {
        Self {
            blobs,
            records,
            settings,
            locks,
            container,
        }
    }

    /// Absolute URL for a blob, cache-busted with its modification time.
    pub fn url_for(&self, blob: &crate::store::BlobRef) -> String {
        format!(
            "{}/{}?mtime={}",
            self.settings.base_url.trim_end_matches('/'),
            blob.key.url_path(),
            blob.modified.timestamp()
        )
    }
}
