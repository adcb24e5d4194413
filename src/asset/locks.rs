//! Per-image mutual exclusion.
//!
//! Every mutating asset operation holds the lock for the filenames it touches
//! (the current name, plus the new name when a transform renames the file).
//! All names are taken at once, so two edits can never wait on each other in
//! opposite order.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

type LockKey = (String, String);

#[derive(Default)]
pub struct EditLocks {
    held: Mutex<HashSet<LockKey>>,
    released: Condvar,
}

impl EditLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every `(gallery, name)` pair is free, then hold them all
    /// until the guard drops.
    pub fn acquire(&self, gallery: &str, names: &[&str]) -> EditGuard<'_> {
        let keys: Vec<LockKey> = names
            .iter()
            .map(|n| (gallery.to_string(), n.to_string()))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while keys.iter().any(|k| held.contains(k)) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.extend(keys.iter().cloned());

        EditGuard { locks: self, keys }
    }

    pub fn is_locked(&self, gallery: &str, name: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(gallery.to_string(), name.to_string()))
    }
}

/// Releases its names on drop.
pub struct EditGuard<'a> {
    locks: &'a EditLocks,
    keys: Vec<LockKey>,
}

impl Drop for EditGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            held.remove(key);
        }
        self.locks.released.notify_all();
    }
}
