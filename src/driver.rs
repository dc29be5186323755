//! Compiler driver module
//!
//! Ties the phases together: command-line handling ([`cli`]), the pipeline
//! itself ([`compiler`]) and the per-phase outputs it keeps ([`artifact`]).

pub mod artifact;
pub mod cli;
pub mod compiler;

pub use artifact::{CompileArtifact, CompilePhase, PipelineOutputs};
pub use cli::{Cli, CompileConfig};
pub use compiler::{CompilerDriver, DriverError, PipelineError};
