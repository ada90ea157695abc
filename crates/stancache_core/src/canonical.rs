//! Datasets and their canonical byte encoding.
//!
//! A [`Dataset`] is the caller-supplied mapping from Stan data-block
//! variable names to values. Canonical encoding sorts keys, uses compact
//! JSON, and relies on serde_json's shortest-roundtrip float formatting,
//! so two datasets with the same content always produce identical bytes
//! regardless of insertion order. The canonical bytes are also exactly the
//! data file handed to the sampler, which consumes Stan JSON.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::CacheError;

/// A mapping from data-block variable name to value.
///
/// Backed by a `BTreeMap` so key order is always lexicographic, never
/// insertion order. Values are JSON values restricted to what Stan JSON
/// can carry: finite numbers and (arbitrarily nested) arrays of finite
/// numbers. Validation happens at encoding time so the offending key can
/// be reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    #[serde(flatten)]
    values: BTreeMap<String, Value>,
}

impl Dataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value under the given variable name.
    ///
    /// Accepts anything convertible to a JSON value; validation is
    /// deferred to [`Dataset::canonical_bytes`].
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Returns the number of variables in the dataset.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the dataset holds no variables.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over variables in canonical (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Produces the canonical byte encoding of this dataset.
    ///
    /// Compact JSON with lexicographically sorted keys and stable number
    /// formatting. Fails with [`CacheError::Serialization`] naming the
    /// offending key if any value is not representable in Stan JSON.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CacheError> {
        for (key, value) in &self.values {
            validate_value(key, value)?;
        }
        serde_json::to_vec(&self.values).map_err(|e| CacheError::Serialization {
            key: String::new(),
            reason: e.to_string(),
        })
    }
}

impl FromIterator<(String, Value)> for Dataset {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Checks that a value is a finite number or a nested array of them.
///
/// Note that `Value::from(f64::NAN)` yields `Null`, so non-finite floats
/// surface here as nulls and are rejected with the same diagnostic.
fn validate_value(key: &str, value: &Value) -> Result<(), CacheError> {
    match value {
        Value::Number(n) => {
            if n.as_f64().is_some_and(f64::is_finite) || n.as_i64().is_some() || n.as_u64().is_some()
            {
                Ok(())
            } else {
                Err(reject(key, "non-finite number"))
            }
        }
        Value::Array(items) => {
            for item in items {
                validate_value(key, item)?;
            }
            Ok(())
        }
        Value::Null => Err(reject(key, "null or non-finite number")),
        Value::Bool(_) => Err(reject(key, "booleans are not representable")),
        Value::String(_) => Err(reject(key, "strings are not representable")),
        Value::Object(_) => Err(reject(key, "nested objects are not representable")),
    }
}

fn reject(key: &str, reason: &str) -> CacheError {
    CacheError::Serialization {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_irrelevant() {
        let mut a = Dataset::new();
        a.insert("N", 2);
        a.insert("y", vec![1.5, 2.5]);

        let mut b = Dataset::new();
        b.insert("y", vec![1.5, 2.5]);
        b.insert("N", 2);

        assert_eq!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
    }

    #[test]
    fn encoding_is_sorted_compact_json() {
        let mut d = Dataset::new();
        d.insert("z", 1);
        d.insert("a", 2);
        let bytes = d.canonical_bytes().unwrap();
        assert_eq!(bytes, br#"{"a":2,"z":1}"#);
    }

    #[test]
    fn empty_dataset_encodes() {
        let d = Dataset::new();
        assert_eq!(d.canonical_bytes().unwrap(), b"{}");
    }

    #[test]
    fn value_change_changes_bytes() {
        let mut a = Dataset::new();
        a.insert("N", 2);
        let mut b = Dataset::new();
        b.insert("N", 3);
        assert_ne!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
    }

    #[test]
    fn nested_arrays_allowed() {
        let mut d = Dataset::new();
        d.insert("x", vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert!(d.canonical_bytes().is_ok());
    }

    #[test]
    fn nan_rejected_with_key() {
        let mut d = Dataset::new();
        d.insert("sigma", f64::NAN);
        let err = d.canonical_bytes().unwrap_err();
        match err {
            CacheError::Serialization { key, .. } => assert_eq!(key, "sigma"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn infinity_rejected() {
        let mut d = Dataset::new();
        d.insert("bound", f64::INFINITY);
        assert!(d.canonical_bytes().is_err());
    }

    #[test]
    fn string_rejected_with_key() {
        let mut d = Dataset::new();
        d.insert("N", 2);
        d.insert("label", "control");
        let err = d.canonical_bytes().unwrap_err();
        match err {
            CacheError::Serialization { key, .. } => assert_eq!(key, "label"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nan_inside_array_rejected() {
        let mut d = Dataset::new();
        d.insert("y", vec![1.0, f64::NAN, 3.0]);
        assert!(d.canonical_bytes().is_err());
    }

    #[test]
    fn iteration_is_sorted() {
        let mut d = Dataset::new();
        d.insert("b", 1);
        d.insert("a", 2);
        let keys: Vec<_> = d.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["a", "b"]);
    }
}
