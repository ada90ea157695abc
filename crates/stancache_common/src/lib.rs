//! Shared foundational types for the stancache workspace.
//!
//! Currently this is just content hashing: the 256-bit digests that name
//! every model, dataset, and run entry in the cache.

#![warn(missing_docs)]

pub mod hash;

pub use hash::ContentHash;
