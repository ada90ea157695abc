//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while resolving a model run through the cache.
///
/// Internal store reads are fail-safe: a missing or corrupt entry is
/// absorbed as a cache miss and triggers recomputation. Everything else
/// surfaces to the caller unmodified, preserving collaborator diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A store entry expected to exist was absent.
    ///
    /// Callers inside the cache treat this as a miss; it only escapes when
    /// a caller asks for an entry by key directly.
    #[error("cache entry not found: {path}")]
    NotFound {
        /// The path that was probed.
        path: PathBuf,
    },

    /// A dataset value cannot be represented in the canonical data format.
    #[error("dataset key '{key}' cannot be serialized: {reason}")]
    Serialization {
        /// The dataset key holding the offending value.
        key: String,
        /// Description of why the value is unrepresentable.
        reason: String,
    },

    /// The external compiler rejected the model.
    ///
    /// Never cached: a retry with the same key re-attempts compilation,
    /// since the failure may be environmental (e.g. missing toolchain).
    #[error("model compilation failed: {diagnostic}")]
    Compilation {
        /// The compiler's diagnostic output.
        diagnostic: String,
    },

    /// The external sampler failed to produce a result.
    ///
    /// Never persisted; partial runs leave no cache entry behind.
    #[error("sampling failed: {diagnostic}")]
    Execution {
        /// The sampler's diagnostic output.
        diagnostic: String,
    },

    /// A persisted run result could not be decoded.
    ///
    /// Absorbed internally as a miss; recorded here so store consumers can
    /// distinguish decode failures from I/O failures.
    #[error("stored result at {path} is not decodable: {reason}")]
    Decode {
        /// The result file path.
        path: PathBuf,
        /// Description of the decode failure.
        reason: String,
    },
}

impl CacheError {
    /// Returns `true` if this error should be treated as a cache miss
    /// rather than propagated to the caller.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound { .. } | CacheError::Decode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from("/tmp/cache/models/abc.bin"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("abc.bin"));
    }

    #[test]
    fn not_found_is_miss() {
        let err = CacheError::NotFound {
            path: PathBuf::from("missing.json"),
        };
        assert!(err.is_miss());
    }

    #[test]
    fn decode_is_miss() {
        let err = CacheError::Decode {
            path: PathBuf::from("bad.run.json"),
            reason: "unexpected EOF".to_string(),
        };
        assert!(err.is_miss());
        assert!(err.to_string().contains("unexpected EOF"));
    }

    #[test]
    fn collaborator_errors_are_not_misses() {
        let compile = CacheError::Compilation {
            diagnostic: "semicolon expected".to_string(),
        };
        let run = CacheError::Execution {
            diagnostic: "divergent transitions".to_string(),
        };
        assert!(!compile.is_miss());
        assert!(!run.is_miss());
        assert!(compile.to_string().contains("semicolon expected"));
        assert!(run.to_string().contains("divergent transitions"));
    }

    #[test]
    fn serialization_names_offending_key() {
        let err = CacheError::Serialization {
            key: "sigma".to_string(),
            reason: "non-finite number".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'sigma'"));
        assert!(msg.contains("non-finite"));
    }
}
