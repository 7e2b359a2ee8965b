//! Output generation: source rewriting and backend code generators.

pub mod manifest;
pub mod rewrite;

pub use manifest::ManifestBackend;
pub use rewrite::{EmittedWrapper, FileRewrite, RewrittenUnit, SplicePlan};

use crate::ir::{ConstantRegistry, KernelRegistry, SetRegistry};
use crate::macros::MacroTable;
use anyhow::Result;
use std::path::Path;

/// Final registries handed to every backend after all units are rewritten.
#[derive(Debug, Clone, Copy)]
pub struct BackendInputs<'a> {
    /// Label of the run, taken from the first input path
    pub master_file: &'a str,
    /// Run start, in seconds since the Unix epoch
    pub timestamp: u64,
    pub constants: &'a ConstantRegistry,
    pub kernels: &'a KernelRegistry,
    pub sets: &'a SetRegistry,
    pub macros: &'a MacroTable,
    /// Directory generated files are written to
    pub output_dir: &'a Path,
}

/// A code generator for one execution target.
pub trait Backend {
    /// Short target name used in log messages.
    fn name(&self) -> &str;

    /// Generate the target's files.
    fn generate(&self, inputs: &BackendInputs<'_>) -> Result<()>;
}
