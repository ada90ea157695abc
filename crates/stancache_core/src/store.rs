//! Filesystem-backed key→blob storage.
//!
//! Entries live at `<root>/<namespace>/<key>.<ext>` where `key` is a
//! content-hash token. Blobs are stored raw, with no framing, because the
//! external compiler and sampler consume them directly by path. Writes go
//! through a temporary file in the same directory followed by a rename, so
//! a crash mid-write never leaves a corrupt entry under the final name: a
//! concurrent reader either misses or sees a complete blob.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// A durable, namespaced key→blob store over a root directory.
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Creates a store rooted at the given directory.
    ///
    /// The directory tree is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensures the namespace subdirectory exists.
    pub fn ensure_dirs(&self, namespace: &str) -> Result<(), CacheError> {
        let dir = self.root.join(namespace);
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            path: dir,
            source: e,
        })
    }

    /// Returns the path an entry occupies (whether or not it exists).
    ///
    /// Used to hand locations to the external compiler/sampler, which
    /// consume files rather than byte slices.
    pub fn path(&self, namespace: &str, key: &str, ext: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{key}.{ext}"))
    }

    /// Returns `true` if an entry exists under the final name.
    pub fn exists(&self, namespace: &str, key: &str, ext: &str) -> bool {
        self.path(namespace, key, ext).is_file()
    }

    /// Reads an entry's bytes.
    ///
    /// Fails with [`CacheError::NotFound`] if absent, [`CacheError::Io`]
    /// for any other filesystem failure.
    pub fn read(&self, namespace: &str, key: &str, ext: &str) -> Result<Vec<u8>, CacheError> {
        let path = self.path(namespace, key, ext);
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CacheError::NotFound { path: path.clone() },
            _ => CacheError::Io {
                path: path.clone(),
                source: e,
            },
        })
    }

    /// Atomically writes an entry and returns its final path.
    ///
    /// The bytes land in a temporary file in the target directory first
    /// and are renamed into place, so readers never observe a partial
    /// entry. Re-writing an existing key replaces it wholesale; since keys
    /// are content hashes the replacement is byte-identical in practice.
    pub fn write_atomic(
        &self,
        namespace: &str,
        key: &str,
        ext: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, CacheError> {
        self.ensure_dirs(namespace)?;
        let path = self.path(namespace, key, ext);
        let dir = self.root.join(namespace);

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| CacheError::Io {
            path: dir.clone(),
            source: e,
        })?;
        tmp.write_all(bytes).map_err(|e| CacheError::Io {
            path: tmp.path().to_path_buf(),
            source: e,
        })?;
        tmp.persist(&path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(path)
    }

    /// Atomically installs an already-produced file as an entry.
    ///
    /// Used for compiler output: the artifact is produced at a scratch
    /// path inside the namespace directory, then renamed under its key.
    pub fn install(
        &self,
        produced: &Path,
        namespace: &str,
        key: &str,
        ext: &str,
    ) -> Result<PathBuf, CacheError> {
        self.ensure_dirs(namespace)?;
        let path = self.path(namespace, key, ext);
        std::fs::rename(produced, &path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Removes every entry in a namespace. Returns the number removed.
    ///
    /// A missing namespace directory counts as already empty.
    pub fn remove_namespace(&self, namespace: &str) -> Result<usize, CacheError> {
        let dir = self.root.join(namespace);
        if !dir.exists() {
            return Ok(0);
        }
        let entries = std::fs::read_dir(&dir).map_err(|e| CacheError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::Io {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_file() {
                std::fs::remove_file(&path).map_err(|e| CacheError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
