//! Compile-if-absent orchestration.
//!
//! Maps normalized model source to a compiled sampler binary in the
//! `models/` namespace. A given program key is compiled at most once per
//! cache lifetime: later calls (and concurrent callers, via the per-key
//! locks) reuse the stored artifact. Failed compilations leave nothing
//! behind, so a retry with the same key re-attempts the compile.

use std::path::PathBuf;

use stancache_common::ContentHash;

use crate::error::CacheError;
use crate::lock::{FlightLock, KeyLocks};
use crate::normalize::normalize;
use crate::store::BlobStore;

/// Namespace for normalized sources and compiled model binaries.
pub const MODELS_NAMESPACE: &str = "models";

/// Extension for stored normalized source files.
pub const SOURCE_EXT: &str = "stan";

/// Extension for compiled model binaries.
pub const ARTIFACT_EXT: &str = "bin";

/// The external model compiler.
///
/// Implementations must be deterministic for a given normalized source
/// and must write the produced executable to `artifact` on success. A
/// rejected model surfaces as [`CacheError::Compilation`] carrying the
/// compiler's diagnostic.
pub trait ModelCompiler {
    /// Compiles the model at `source` into an executable at `artifact`.
    fn compile(
        &self,
        source: &std::path::Path,
        artifact: &std::path::Path,
    ) -> Result<(), CacheError>;
}

/// A ready-to-run compiled model.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    /// Program key: the content hash of the normalized source.
    pub key: ContentHash,

    /// Stored normalized source path (`models/<key>.stan`).
    pub source_path: PathBuf,

    /// Stored executable path (`models/<key>.bin`).
    pub artifact_path: PathBuf,
}

/// Returns a compiled model for the given source, compiling if absent.
///
/// Normalize → hash → probe. On a hit the stored artifact is returned
/// without invoking the compiler. On a miss the normalized source is
/// stored under its key, the per-key thread mutex and cross-process
/// flight lock are taken, the entry is re-probed (another flight may have
/// finished while waiting), and only then is the compiler invoked. The
/// produced binary is installed atomically under the final name.
pub fn ensure_compiled(
    store: &BlobStore,
    locks: &KeyLocks,
    compiler: &dyn ModelCompiler,
    code: &str,
) -> Result<CompiledModel, CacheError> {
    let normalized = normalize(code);
    let key = ContentHash::from_bytes(normalized.as_bytes());
    let token = key.to_string();

    let model = CompiledModel {
        key,
        source_path: store.path(MODELS_NAMESPACE, &token, SOURCE_EXT),
        artifact_path: store.path(MODELS_NAMESPACE, &token, ARTIFACT_EXT),
    };

    if store.exists(MODELS_NAMESPACE, &token, ARTIFACT_EXT) {
        return Ok(model);
    }

    let mutex = locks.get(&token);
    let _thread_guard = mutex.lock();
    let _flight = FlightLock::acquire(&store.root().join(MODELS_NAMESPACE), &token)?;

    // Re-probe: a concurrent flight may have compiled while we waited.
    if store.exists(MODELS_NAMESPACE, &token, ARTIFACT_EXT) {
        return Ok(model);
    }

    if !store.exists(MODELS_NAMESPACE, &token, SOURCE_EXT) {
        store.write_atomic(MODELS_NAMESPACE, &token, SOURCE_EXT, normalized.as_bytes())?;
    }

    // The compiler writes to a scratch path in the same directory; only a
    // successful compile is renamed under the final name, so a failed or
    // interrupted compile never becomes a cache entry.
    let scratch = store.path(MODELS_NAMESPACE, &token, "building");
    match compiler.compile(&model.source_path, &scratch) {
        Ok(()) => {
            store.install(&scratch, MODELS_NAMESPACE, &token, ARTIFACT_EXT)?;
            Ok(model)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&scratch);
            Err(e)
        }
    }
}
