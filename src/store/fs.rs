//! Directory-backed blob store.
//!
//! Layout: `<root>/<container>/<area>/<item><path><name>`. Writes go to a
//! hidden temp file in the target directory and are renamed into place, so a
//! reader never sees a half-written blob.

use super::{Area, BlobKey, BlobRef, BlobStore, StoreError};
use crate::imaging::codec::{self, is_vector, mime_for_name};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const TEMP_PREFIX: &str = ".shoebox-";

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn item_dir(&self, container: &str, area: Area, item: &str) -> PathBuf {
        self.root.join(container).join(area.as_str()).join(item)
    }

    fn path_for(&self, key: &BlobKey) -> PathBuf {
        let mut path = self.item_dir(&key.container, key.area, &key.item);
        for segment in key.path.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.join(&key.name)
    }

    /// Size and mtime from the file's metadata, dimensions from its header.
    fn describe(&self, key: BlobKey, path: &Path) -> Result<BlobRef, StoreError> {
        let meta = fs::metadata(path)?;
        let modified = DateTime::<Utc>::from(meta.modified()?);
        let dimensions = if is_vector(mime_for_name(&key.name)) {
            None
        } else {
            codec::probe_reader(BufReader::new(fs::File::open(path)?))
        };
        Ok(BlobRef::new(key, meta.len(), modified, dimensions))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<BlobRef, StoreError> {
        key.check()?;
        let target = self.path_for(key);
        let dir = target
            .parent()
            .ok_or_else(|| StoreError::Backend(format!("no parent directory for {key}")))?;
        fs::create_dir_all(dir)?;

        let temp = dir.join(format!("{TEMP_PREFIX}{}", key.name));
        let written = fs::File::create(&temp).and_then(|mut f| {
            f.write_all(bytes)?;
            f.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&temp, &target)) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        debug!(blob = %key, size = bytes.len(), "wrote blob");
        self.describe(key.clone(), &target)
    }

    fn get(&self, key: &BlobKey) -> Result<Option<BlobRef>, StoreError> {
        key.check()?;
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        self.describe(key.clone(), &path).map(Some)
    }

    fn list(&self, container: &str, area: Area, item: &str) -> Result<Vec<BlobRef>, StoreError> {
        let base = self.item_dir(container, area, item);
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let mut refs = Vec::new();
        for entry in WalkDir::new(&base).min_depth(1) {
            let entry = entry.map_err(|e| StoreError::Io(io::Error::other(e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }

            let rel_dir = entry
                .path()
                .parent()
                .and_then(|p| p.strip_prefix(&base).ok())
                .map(|p| {
                    p.components()
                        .map(|c| c.as_os_str().to_string_lossy().to_string())
                        .collect::<Vec<_>>()
                        .join("/")
                })
                .unwrap_or_default();

            let key = BlobKey::new(container, area, item, &rel_dir, name);
            refs.push(self.describe(key, entry.path())?);
        }

        refs.sort_by(|a, b| {
            a.key
                .path
                .cmp(&b.key.path)
                .then_with(|| a.key.name.cmp(&b.key.name))
        });
        Ok(refs)
    }

    fn read(&self, key: &BlobKey) -> Result<Vec<u8>, StoreError> {
        key.check()?;
        fs::read(self.path_for(key)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
            _ => StoreError::Io(e),
        })
    }

    fn delete(&self, key: &BlobKey) -> Result<bool, StoreError> {
        key.check()?;
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {
                debug!(blob = %key, "deleted blob");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
