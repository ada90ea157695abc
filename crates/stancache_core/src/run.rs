//! Execute-if-absent orchestration.
//!
//! Memoizes sampler runs in the `runs/` namespace. The execution key
//! combines the program key, the canonical dataset key, and the keyed
//! subset of sampling parameters, so a stored result is only ever reused
//! for byte-identical prior inputs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stancache_common::ContentHash;

use crate::canonical::Dataset;
use crate::compile::CompiledModel;
use crate::error::CacheError;
use crate::lock::{FlightLock, KeyLocks};
use crate::params::{KeyPolicy, SampleParams};
use crate::store::BlobStore;

/// Namespace for canonical datasets and persisted run results.
pub const RUNS_NAMESPACE: &str = "runs";

/// Extension for stored canonical dataset files.
pub const DATA_EXT: &str = "json";

/// Extension for persisted run results.
pub const RESULT_EXT: &str = "run.json";

/// The external sampler.
///
/// Implementations must be deterministic given identical inputs — for a
/// seeded sampler that means the seed is part of [`SampleParams`] and the
/// default [`KeyPolicy`] keeps it in the key. Failures surface as
/// [`CacheError::Execution`] with the sampler's diagnostic.
pub trait Sampler {
    /// Runs the compiled model at `artifact` against the dataset file at
    /// `data` and returns the captured draws.
    fn sample(
        &self,
        artifact: &Path,
        data: &Path,
        params: &SampleParams,
    ) -> Result<RunResult, CacheError>;
}

/// The structured output of one sampler run.
///
/// Mirrors the `(stan_variables, method_variables)` pair of the upstream
/// fit object: model parameters on one side, sampler bookkeeping (`lp__`,
/// `divergent__`, ...) on the other. Draws are stored per variable in
/// column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Draws for model parameters and generated quantities.
    pub stan_variables: BTreeMap<String, Vec<f64>>,

    /// Draws for sampler method variables (names ending in `__`).
    pub method_variables: BTreeMap<String, Vec<f64>>,
}

/// Computes the execution key for (program, data, keyed params).
pub fn execution_key(program: &ContentHash, data: &ContentHash, fragment: &str) -> ContentHash {
    ContentHash::from_parts(&[
        program.to_string().as_bytes(),
        data.to_string().as_bytes(),
        fragment.as_bytes(),
    ])
}

/// Returns the run result for the given inputs, sampling if absent.
///
/// Canonicalize → hash → `DataKey`; the canonical dataset is stored under
/// its key (it is also the data file the sampler reads). A stored result
/// for the execution key is returned without invoking the sampler; a
/// corrupt stored result counts as a miss and is recomputed. On a miss
/// the per-key locks are taken, the entry re-probed, the sampler invoked,
/// and the result persisted atomically. Failed runs persist nothing.
pub fn ensure_sampled(
    store: &BlobStore,
    locks: &KeyLocks,
    policy: &KeyPolicy,
    sampler: &dyn Sampler,
    model: &CompiledModel,
    dataset: &Dataset,
    params: &SampleParams,
) -> Result<RunResult, CacheError> {
    let canonical = dataset.canonical_bytes()?;
    let data_key = ContentHash::from_bytes(&canonical);
    let data_token = data_key.to_string();

    if !store.exists(RUNS_NAMESPACE, &data_token, DATA_EXT) {
        store.write_atomic(RUNS_NAMESPACE, &data_token, DATA_EXT, &canonical)?;
    }
    let data_path = store.path(RUNS_NAMESPACE, &data_token, DATA_EXT);

    let fragment = params.key_fragment(policy);
    let exec_token = execution_key(&model.key, &data_key, &fragment).to_string();

    if let Some(result) = load_result(store, &exec_token)? {
        return Ok(result);
    }

    let mutex = locks.get(&exec_token);
    let _thread_guard = mutex.lock();
    let _flight = FlightLock::acquire(&store.root().join(RUNS_NAMESPACE), &exec_token)?;

    // Re-probe: a concurrent flight may have finished while we waited.
    if let Some(result) = load_result(store, &exec_token)? {
        return Ok(result);
    }

    let result = sampler.sample(&model.artifact_path, &data_path, params)?;

    let bytes = serde_json::to_vec(&result).map_err(|e| CacheError::Serialization {
        key: String::new(),
        reason: e.to_string(),
    })?;
    store.write_atomic(RUNS_NAMESPACE, &exec_token, RESULT_EXT, &bytes)?;

    Ok(result)
}

/// Loads a persisted result, absorbing misses.
///
/// Absent entries and undecodable entries both yield `Ok(None)` so the
/// caller recomputes; genuine I/O failures propagate.
fn load_result(store: &BlobStore, exec_token: &str) -> Result<Option<RunResult>, CacheError> {
    let attempt = store
        .read(RUNS_NAMESPACE, exec_token, RESULT_EXT)
        .and_then(|bytes| {
            serde_json::from_slice::<RunResult>(&bytes).map_err(|e| CacheError::Decode {
                path: store.path(RUNS_NAMESPACE, exec_token, RESULT_EXT),
                reason: e.to_string(),
            })
        });
    match attempt {
        Ok(result) => Ok(Some(result)),
        Err(e) if e.is_miss() => Ok(None),
        Err(e) => Err(e),
    }
}
