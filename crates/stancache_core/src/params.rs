//! Sampling parameters and the cache-key inclusion policy.
//!
//! Parameters that affect the numeric result (seed, chain count, sample
//! counts, adaptation settings) must be part of the execution key;
//! parameters that only affect presentation (progress cadence, console
//! echo) must not be, or the hit rate suffers for no correctness gain.
//! That partition is an explicit, documented [`KeyPolicy`] value rather
//! than an implicit convention.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Parameters forwarded to the external sampler.
///
/// All fields are optional; unset fields fall back to the sampler's own
/// defaults and contribute nothing to the execution key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleParams {
    /// Random seed. Keyed: different seeds are different results.
    pub seed: Option<u64>,

    /// Number of MCMC chains. Keyed.
    pub chains: Option<u32>,

    /// Post-warmup draws per chain. Keyed.
    pub num_samples: Option<u32>,

    /// Warmup iterations per chain. Keyed.
    pub num_warmup: Option<u32>,

    /// Thinning interval. Keyed.
    pub thin: Option<u32>,

    /// Target acceptance statistic for step-size adaptation. Keyed.
    pub adapt_delta: Option<f64>,

    /// Maximum NUTS tree depth. Keyed.
    pub max_treedepth: Option<u32>,

    /// Progress-report cadence in iterations. Presentation only, excluded
    /// from the key by default.
    pub refresh: Option<u32>,

    /// Echo sampler console output. Presentation only, excluded.
    pub show_console: bool,
}

impl SampleParams {
    /// Yields `(name, value)` pairs for every set parameter, in a fixed
    /// name-sorted order suitable for canonical encoding.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(v) = self.adapt_delta {
            out.push(("adapt_delta", format!("{v}")));
        }
        if let Some(v) = self.chains {
            out.push(("chains", v.to_string()));
        }
        if let Some(v) = self.max_treedepth {
            out.push(("max_treedepth", v.to_string()));
        }
        if let Some(v) = self.num_samples {
            out.push(("num_samples", v.to_string()));
        }
        if let Some(v) = self.num_warmup {
            out.push(("num_warmup", v.to_string()));
        }
        if let Some(v) = self.refresh {
            out.push(("refresh", v.to_string()));
        }
        if let Some(v) = self.seed {
            out.push(("seed", v.to_string()));
        }
        if self.show_console {
            out.push(("show_console", "true".to_string()));
        }
        if let Some(v) = self.thin {
            out.push(("thin", v.to_string()));
        }
        out
    }

    /// Renders the keyed subset of parameters as a canonical fragment,
    /// e.g. `chains=4,seed=42`. Stable across runs and machines.
    pub fn key_fragment(&self, policy: &KeyPolicy) -> String {
        self.entries()
            .into_iter()
            .filter(|(name, _)| policy.includes(name))
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// The set of parameter names included in the execution key.
///
/// The default includes every result-affecting parameter and excludes the
/// presentation-only ones. Integrators with custom collaborators can
/// adjust the set to match what their sampler actually keys on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPolicy {
    included: BTreeSet<String>,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        let included = [
            "adapt_delta",
            "chains",
            "max_treedepth",
            "num_samples",
            "num_warmup",
            "seed",
            "thin",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();
        Self { included }
    }
}

impl KeyPolicy {
    /// Returns `true` if the named parameter participates in the key.
    pub fn includes(&self, name: &str) -> bool {
        self.included.contains(name)
    }

    /// Adds a parameter name to the key.
    pub fn include(mut self, name: impl Into<String>) -> Self {
        self.included.insert(name.into());
        self
    }

    /// Removes a parameter name from the key.
    pub fn exclude(mut self, name: &str) -> Self {
        self.included.remove(name);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fragment_is_empty() {
        let params = SampleParams::default();
        assert_eq!(params.key_fragment(&KeyPolicy::default()), "");
    }

    #[test]
    fn keyed_params_appear_sorted() {
        let params = SampleParams {
            seed: Some(42),
            chains: Some(4),
            ..Default::default()
        };
        assert_eq!(
            params.key_fragment(&KeyPolicy::default()),
            "chains=4,seed=42"
        );
    }

    #[test]
    fn excluded_params_do_not_appear() {
        let quiet = SampleParams {
            seed: Some(42),
            ..Default::default()
        };
        let chatty = SampleParams {
            seed: Some(42),
            refresh: Some(10),
            show_console: true,
            ..Default::default()
        };
        let policy = KeyPolicy::default();
        assert_eq!(quiet.key_fragment(&policy), chatty.key_fragment(&policy));
    }

    #[test]
    fn seed_change_changes_fragment() {
        let a = SampleParams {
            seed: Some(1),
            ..Default::default()
        };
        let b = SampleParams {
            seed: Some(2),
            ..Default::default()
        };
        let policy = KeyPolicy::default();
        assert_ne!(a.key_fragment(&policy), b.key_fragment(&policy));
    }

    #[test]
    fn policy_override_includes_refresh() {
        let params = SampleParams {
            refresh: Some(10),
            ..Default::default()
        };
        let policy = KeyPolicy::default().include("refresh");
        assert_eq!(params.key_fragment(&policy), "refresh=10");
    }

    #[test]
    fn policy_override_excludes_seed() {
        let params = SampleParams {
            seed: Some(7),
            ..Default::default()
        };
        let policy = KeyPolicy::default().exclude("seed");
        assert_eq!(params.key_fragment(&policy), "");
    }

    #[test]
    fn adapt_delta_formats_stably() {
        let params = SampleParams {
            adapt_delta: Some(0.95),
            ..Default::default()
        };
        assert_eq!(
            params.key_fragment(&KeyPolicy::default()),
            "adapt_delta=0.95"
        );
    }

    #[test]
    fn serde_roundtrip() {
        let params = SampleParams {
            seed: Some(42),
            chains: Some(2),
            adapt_delta: Some(0.9),
            ..Default::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: SampleParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }
}
