//! JSON manifest backend.
//!
//! Writes `<master>_kernels.json` describing everything the target code
//! generators consume: constants, sets, kernels and the macro table.

use super::{Backend, BackendInputs};
use crate::ir::{ConstDescriptor, KernelDescriptor, SetDescriptor};
use crate::macros::MacroTable;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct Manifest<'a> {
    master_file: &'a str,
    timestamp: u64,
    generator: &'static str,
    constants: Vec<&'a ConstDescriptor>,
    sets: Vec<&'a SetDescriptor>,
    kernels: Vec<&'a KernelDescriptor>,
    macros: &'a MacroTable,
}

/// Backend that serializes the final registries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestBackend;

impl ManifestBackend {
    /// Path the manifest is written to for `master_file`.
    pub fn manifest_path(output_dir: &Path, master_file: &str) -> PathBuf {
        let stem = Path::new(master_file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("op2");
        output_dir.join(format!("{}_kernels.json", stem))
    }

    /// Manifest text for `inputs`.
    pub fn render(inputs: &BackendInputs<'_>) -> Result<String> {
        let manifest = Manifest {
            master_file: inputs.master_file,
            timestamp: inputs.timestamp,
            generator: concat!("op2-translator ", env!("CARGO_PKG_VERSION")),
            constants: inputs.constants.iter().collect(),
            sets: inputs.sets.iter().collect(),
            kernels: inputs.kernels.iter().collect(),
            macros: inputs.macros,
        };
        serde_json::to_string_pretty(&manifest).context("serializing kernel manifest")
    }
}

impl Backend for ManifestBackend {
    fn name(&self) -> &str {
        "manifest"
    }

    fn generate(&self, inputs: &BackendInputs<'_>) -> Result<()> {
        let path = Self::manifest_path(inputs.output_dir, inputs.master_file);
        let text = Self::render(inputs)?;
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}
