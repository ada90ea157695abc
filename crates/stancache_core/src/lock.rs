//! Single-flight locking around the expensive compute-and-write window.
//!
//! Correctness never depends on these locks: atomic rename already
//! guarantees that racing writers produce a valid entry and that readers
//! never see a partial one. The locks are the hardening layer that stops
//! concurrent callers from *redundantly* compiling or sampling the same
//! key — an in-process mutex per key for threads, and an advisory file
//! lock per key for independent processes sharing the cache root.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::Mutex;

use crate::error::CacheError;

/// In-process registry of per-key mutexes.
///
/// Callers hitting the same key serialize on one mutex; callers on
/// different keys proceed independently. Entries are never evicted — the
/// registry grows with the number of distinct keys seen by this process,
/// which tracks the number of distinct models/runs and stays small.
#[derive(Default)]
pub struct KeyLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex for a key, creating it on first use.
    pub fn get(&self, key: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock();
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// An advisory cross-process lock for one cache key.
///
/// Backed by `flock`-style locking on a `<key>.lock` file next to the
/// entry. Held for the duration of compute-and-write; released when
/// dropped (the OS also releases it if the process dies). Other processes
/// block in `acquire` and then typically find the entry already present.
pub struct FlightLock {
    _file: std::fs::File,
}

impl FlightLock {
    /// Blocks until the exclusive lock for `key` is held.
    pub fn acquire(dir: &Path, key: &str) -> Result<Self, CacheError> {
        std::fs::create_dir_all(dir).map_err(|e| CacheError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let lock_path = dir.join(format!("{key}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| CacheError::Io {
                path: lock_path.clone(),
                source: e,
            })?;
        file.lock_exclusive().map_err(|e| CacheError::Io {
            path: lock_path,
            source: e,
        })?;
        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_shares_a_mutex() {
        let locks = KeyLocks::new();
        let a = locks.get("abc");
        let b = locks.get("abc");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_keys_do_not_share() {
        let locks = KeyLocks::new();
        let a = locks.get("abc");
        let b = locks.get("def");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn key_mutex_serializes() {
        let locks = KeyLocks::new();
        let m = locks.get("k");
        let guard = m.lock();
        assert!(locks.get("k").try_lock().is_none());
        drop(guard);
        assert!(locks.get("k").try_lock().is_some());
    }

    #[test]
    fn flight_lock_reacquirable_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let first = FlightLock::acquire(dir.path(), "abc").unwrap();
        drop(first);
        let _second = FlightLock::acquire(dir.path(), "abc").unwrap();
    }

    #[test]
    fn flight_lock_creates_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let _lock = FlightLock::acquire(dir.path(), "abc").unwrap();
        assert!(dir.path().join("abc.lock").exists());
    }
}
