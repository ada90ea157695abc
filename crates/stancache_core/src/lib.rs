//! Content-addressed caching for compiled Stan models and MCMC runs.
//!
//! Sits in front of an expensive two-phase computation — compiling model
//! source into a sampler binary, then running it against a dataset — and
//! guarantees each unique (program, data, keyed parameters) combination
//! is computed at most once per cache lifetime. Coordination is purely
//! through content hashing and the shared filesystem: entries are named
//! by their hash, writes are atomic temp-then-rename, and per-key locks
//! keep concurrent callers from duplicating work.
//!
//! The compiler and sampler themselves are collaborators behind the
//! [`ModelCompiler`] and [`Sampler`] traits; `stancache_cmdstan` provides
//! CmdStan-backed implementations.

#![warn(missing_docs)]

pub mod canonical;
pub mod compile;
pub mod config;
pub mod error;
pub mod lock;
pub mod normalize;
pub mod params;
pub mod run;
pub mod store;

pub use canonical::Dataset;
pub use compile::{CompiledModel, ModelCompiler};
pub use config::CacheConfig;
pub use error::CacheError;
pub use params::{KeyPolicy, SampleParams};
pub use run::{RunResult, Sampler};
pub use stancache_common::ContentHash;

use std::path::Path;

use lock::KeyLocks;
use store::BlobStore;

/// The cache facade: get-or-compute over both phases.
///
/// Owns the blob store, the in-process lock registry, and the two
/// collaborators. The cache root comes from the injected [`CacheConfig`],
/// never from hidden global state, so tests isolate themselves with
/// temporary roots.
pub struct StanCache<C, S> {
    config: CacheConfig,
    store: BlobStore,
    locks: KeyLocks,
    compiler: C,
    sampler: S,
}

impl<C: ModelCompiler, S: Sampler> StanCache<C, S> {
    /// Creates a cache over the configured root with the given
    /// collaborators.
    pub fn new(config: CacheConfig, compiler: C, sampler: S) -> Self {
        let store = BlobStore::new(&config.root);
        Self {
            config,
            store,
            locks: KeyLocks::new(),
            compiler,
            sampler,
        }
    }

    /// Returns the cache root directory.
    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Returns a compiled model for the source, compiling at most once
    /// per program key.
    pub fn ensure_compiled(&self, code: &str) -> Result<CompiledModel, CacheError> {
        compile::ensure_compiled(&self.store, &self.locks, &self.compiler, code)
    }

    /// Returns the run result for (model, dataset, params), sampling at
    /// most once per execution key.
    pub fn ensure_sampled(
        &self,
        model: &CompiledModel,
        dataset: &Dataset,
        params: &SampleParams,
    ) -> Result<RunResult, CacheError> {
        run::ensure_sampled(
            &self.store,
            &self.locks,
            &self.config.policy,
            &self.sampler,
            model,
            dataset,
            params,
        )
    }

    /// The full round trip: compile if absent, then sample if absent.
    pub fn run(
        &self,
        code: &str,
        dataset: &Dataset,
        params: &SampleParams,
    ) -> Result<RunResult, CacheError> {
        let model = self.ensure_compiled(code)?;
        self.ensure_sampled(&model, dataset, params)
    }

    /// Removes all cached models, datasets, and run results.
    ///
    /// Returns the number of files removed. In-flight computations in
    /// other processes may repopulate entries immediately.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let models = self.store.remove_namespace(compile::MODELS_NAMESPACE)?;
        let runs = self.store.remove_namespace(run::RUNS_NAMESPACE)?;
        Ok(models + runs)
    }
}
