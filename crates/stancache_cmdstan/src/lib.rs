//! CmdStan-backed collaborators for `stancache_core`.
//!
//! Shells out to a local CmdStan installation: `make` for model
//! compilation, the compiled model binary for sampling, and a parser for
//! the Stan CSV output format. Integrators point [`CmdStanCompiler`] at
//! their CmdStan directory and plug both types into
//! [`StanCache`](stancache_core::StanCache).

#![warn(missing_docs)]

mod compiler;
mod csv;
mod sampler;

pub use compiler::CmdStanCompiler;
pub use sampler::CmdStanSampler;
