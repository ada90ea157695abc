//! Cache configuration.
//!
//! The cache root is an explicit value injected at construction, never a
//! hidden process-wide singleton, so tests can isolate themselves with a
//! temporary root. Discovery order for the default: the `STANCACHE_DIR`
//! environment variable, then the OS cache directory.

use std::path::PathBuf;

use crate::error::CacheError;
use crate::params::KeyPolicy;

/// Environment variable overriding the default cache root.
pub const ENV_CACHE_DIR: &str = "STANCACHE_DIR";

/// Configuration for a [`StanCache`](crate::StanCache) instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory holding all cache namespaces.
    pub root: PathBuf,

    /// Which sampling parameters participate in execution keys.
    pub policy: KeyPolicy,
}

impl CacheConfig {
    /// Creates a configuration rooted at an explicit directory with the
    /// default key policy.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: KeyPolicy::default(),
        }
    }

    /// Replaces the key policy.
    pub fn with_policy(mut self, policy: KeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolves the conventional per-user cache root.
    ///
    /// `STANCACHE_DIR` wins if set; otherwise the OS cache directory
    /// (e.g. `~/.cache/stancache` on Linux) is used. Fails only when the
    /// platform exposes no home/cache directory at all.
    pub fn from_env() -> Result<Self, CacheError> {
        if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
            return Ok(Self::new(dir));
        }
        let dirs = directories::ProjectDirs::from("", "", "stancache").ok_or_else(|| {
            CacheError::Io {
                path: PathBuf::new(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "cannot determine OS cache directory",
                ),
            }
        })?;
        Ok(Self::new(dirs.cache_dir()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::KeyPolicy;

    #[test]
    fn explicit_root_is_kept() {
        let cfg = CacheConfig::new("/tmp/some-cache");
        assert_eq!(cfg.root, PathBuf::from("/tmp/some-cache"));
    }

    #[test]
    fn default_policy_applies() {
        let cfg = CacheConfig::new("/tmp/some-cache");
        assert!(cfg.policy.includes("seed"));
        assert!(!cfg.policy.includes("refresh"));
    }

    #[test]
    fn with_policy_replaces() {
        let cfg = CacheConfig::new("/tmp/c").with_policy(KeyPolicy::default().exclude("seed"));
        assert!(!cfg.policy.includes("seed"));
    }

    #[test]
    fn env_override_wins() {
        // Set-and-restore to avoid polluting other tests.
        let prev = std::env::var(ENV_CACHE_DIR).ok();
        std::env::set_var(ENV_CACHE_DIR, "/tmp/stancache-env-test");
        let cfg = CacheConfig::from_env().unwrap();
        match prev {
            Some(v) => std::env::set_var(ENV_CACHE_DIR, v),
            None => std::env::remove_var(ENV_CACHE_DIR),
        }
        assert_eq!(cfg.root, PathBuf::from("/tmp/stancache-env-test"));
    }
}
