//! Model compilation through CmdStan's make-based build.

use std::path::{Path, PathBuf};
use std::process::Command;

use stancache_core::{CacheError, ModelCompiler};

/// Compiles Stan models by invoking `make` in a CmdStan installation.
///
/// CmdStan builds `path/to/model` from `path/to/model.stan`, so the
/// binary appears next to the stored source and is then renamed to the
/// artifact path the cache asked for. Deterministic for a given source:
/// CmdStan's build depends only on the source text and the toolchain.
pub struct CmdStanCompiler {
    cmdstan_home: PathBuf,
}

impl CmdStanCompiler {
    /// Creates a compiler using the CmdStan installation at `home`.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            cmdstan_home: home.into(),
        }
    }
}

impl ModelCompiler for CmdStanCompiler {
    fn compile(&self, source: &Path, artifact: &Path) -> Result<(), CacheError> {
        // `make <target>` where the target is the source path minus the
        // .stan extension.
        let target = source.with_extension("");
        let output = Command::new("make")
            .arg(&target)
            .current_dir(&self.cmdstan_home)
            .output()
            .map_err(|e| CacheError::Compilation {
                diagnostic: format!(
                    "failed to invoke make in {}: {e}",
                    self.cmdstan_home.display()
                ),
            })?;

        if !output.status.success() {
            return Err(CacheError::Compilation {
                diagnostic: collect_diagnostic(&output.stdout, &output.stderr),
            });
        }

        std::fs::rename(&target, artifact).map_err(|e| CacheError::Io {
            path: artifact.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

/// Joins captured stdout and stderr into one diagnostic string.
///
/// stanc reports parse errors on stdout and make reports build failures
/// on stderr, so both streams matter.
fn collect_diagnostic(stdout: &[u8], stderr: &[u8]) -> String {
    let out = String::from_utf8_lossy(stdout);
    let err = String::from_utf8_lossy(stderr);
    let mut diagnostic = String::new();
    if !out.trim().is_empty() {
        diagnostic.push_str(out.trim());
    }
    if !err.trim().is_empty() {
        if !diagnostic.is_empty() {
            diagnostic.push('\n');
        }
        diagnostic.push_str(err.trim());
    }
    if diagnostic.is_empty() {
        diagnostic.push_str("compiler exited with a failure status and no output");
    }
    diagnostic
}
