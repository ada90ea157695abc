//! Sampling by invoking a compiled CmdStan model binary.

use std::path::Path;
use std::process::Command;

use stancache_core::{CacheError, RunResult, SampleParams, Sampler};

use crate::csv::{merge_draws, parse_stan_csv, Draws};

/// Runs compiled CmdStan model binaries.
///
/// One process invocation per chain, each writing its CSV to a temporary
/// directory that is discarded after parsing — only the structured
/// [`RunResult`] is handed back to the cache for persistence. Given the
/// same seed, data file, and settings, CmdStan chains are deterministic,
/// which is what makes the cached result safe to reuse.
#[derive(Debug, Default)]
pub struct CmdStanSampler;

impl CmdStanSampler {
    /// Creates a sampler.
    pub fn new() -> Self {
        Self
    }
}

impl Sampler for CmdStanSampler {
    fn sample(
        &self,
        artifact: &Path,
        data: &Path,
        params: &SampleParams,
    ) -> Result<RunResult, CacheError> {
        let scratch = tempfile::tempdir().map_err(|e| CacheError::Execution {
            diagnostic: format!("cannot create sampler scratch directory: {e}"),
        })?;

        let chains = params.chains.unwrap_or(1);
        let mut stan_variables = Draws::new();
        let mut method_variables = Draws::new();

        for chain in 1..=chains {
            let csv_path = scratch.path().join(format!("chain_{chain}.csv"));
            let args = sampler_args(params, chain, data, &csv_path);

            let output = Command::new(artifact)
                .args(&args)
                .output()
                .map_err(|e| CacheError::Execution {
                    diagnostic: format!("failed to invoke {}: {e}", artifact.display()),
                })?;

            if params.show_console {
                print!("{}", String::from_utf8_lossy(&output.stdout));
            }
            if !output.status.success() {
                return Err(CacheError::Execution {
                    diagnostic: format!(
                        "chain {chain} failed: {}",
                        String::from_utf8_lossy(&output.stderr).trim()
                    ),
                });
            }

            let text = std::fs::read_to_string(&csv_path).map_err(|_| CacheError::Execution {
                diagnostic: format!("chain {chain} exited cleanly but wrote no output CSV"),
            })?;
            let (stan, method) = parse_stan_csv(&text)?;
            merge_draws(&mut stan_variables, stan);
            merge_draws(&mut method_variables, method);
        }

        Ok(RunResult {
            stan_variables,
            method_variables,
        })
    }
}

/// Builds the CmdStan argument list for one chain.
///
/// Layout follows the CmdStan CLI grammar: the `sample` method block with
/// its adaptation/engine settings, then `id`, `random seed`, `data file`,
/// and `output file`/`refresh`.
fn sampler_args(params: &SampleParams, chain: u32, data: &Path, csv: &Path) -> Vec<String> {
    let mut args = vec!["sample".to_string()];
    if let Some(v) = params.num_samples {
        args.push(format!("num_samples={v}"));
    }
    if let Some(v) = params.num_warmup {
        args.push(format!("num_warmup={v}"));
    }
    if let Some(v) = params.thin {
        args.push(format!("thin={v}"));
    }
    if let Some(v) = params.adapt_delta {
        args.push("adapt".to_string());
        args.push(format!("delta={v}"));
    }
    if let Some(v) = params.max_treedepth {
        args.push("algorithm=hmc".to_string());
        args.push("engine=nuts".to_string());
        args.push(format!("max_depth={v}"));
    }
    args.push(format!("id={chain}"));
    if let Some(v) = params.seed {
        args.push("random".to_string());
        args.push(format!("seed={v}"));
    }
    args.push("data".to_string());
    args.push(format!("file={}", data.display()));
    args.push("output".to_string());
    args.push(format!("file={}", csv.display()));
    if let Some(v) = params.refresh {
        args.push(format!("refresh={v}"));
    }
    args
}
