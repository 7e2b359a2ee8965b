//! Cross-file registries.
//!
//! Registries are plain owned values held by the run context. They grow
//! monotonically as files are processed in input order.

use crate::frontend::extract::unquote;
use crate::ir::kernel::KernelDescriptor;
use crate::macros::Resolved;
use crate::utils::errors::{Diagnostic, DiagnosticKind, TranslateResult, TranslatorError};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Handle for a file registered with [`KernelRegistry::begin_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FileId(usize);

#[derive(Debug, Clone, Serialize)]
struct FileUsage {
    path: PathBuf,
    kernels: Vec<usize>,
}

/// Distinct kernels in registration order, plus per-file usage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KernelRegistry {
    kernels: Vec<KernelDescriptor>,
    files: Vec<FileUsage>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new input file.
    pub fn begin_file(&mut self, path: impl Into<PathBuf>) -> FileId {
        self.files.push(FileUsage { path: path.into(), kernels: Vec::new() });
        FileId(self.files.len() - 1)
    }

    /// Insert a kernel used by `file`, returning its index and whether it is new.
    ///
    /// A kernel whose name is already registered with a different signature
    /// is an incompatible redeclaration.
    pub fn insert(&mut self, file: FileId, descriptor: KernelDescriptor) -> TranslateResult<(usize, bool)> {
        let path = self
            .file_path(file)
            .ok_or_else(|| TranslatorError::Internal(format!("unknown file id {}", file.0)))?;

        let (index, is_new) = match self.position(descriptor.name()) {
            Some(i) if self.kernels[i].signature == descriptor.signature => (i, false),
            Some(_) => {
                return Err(TranslatorError::RedeclarationConflict {
                    kernel: descriptor.name().to_string(),
                    file: path.to_path_buf(),
                })
            }
            None => {
                self.kernels.push(descriptor);
                (self.kernels.len() - 1, true)
            }
        };

        let used = &mut self.files[file.0].kernels;
        if !used.contains(&index) {
            used.push(index);
        }
        Ok((index, is_new))
    }

    /// Index of the kernel named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.kernels.iter().position(|k| k.name() == name)
    }

    pub fn get(&self, index: usize) -> Option<&KernelDescriptor> {
        self.kernels.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&KernelDescriptor> {
        self.position(name).map(|i| &self.kernels[i])
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KernelDescriptor> {
        self.kernels.iter()
    }

    /// Kernels referenced by `file`, in first-use order.
    pub fn kernels_in_file(&self, file: FileId) -> impl Iterator<Item = &KernelDescriptor> {
        self.files
            .get(file.0)
            .into_iter()
            .flat_map(|usage| usage.kernels.iter())
            .map(|&i| &self.kernels[i])
    }

    /// Path a file was registered under.
    pub fn file_path(&self, file: FileId) -> Option<&Path> {
        self.files.get(file.0).map(|usage| usage.path.as_path())
    }

    /// Record where a kernel's implementation was found.
    pub fn set_decl_path(&mut self, index: usize, path: impl Into<PathBuf>) {
        if let Some(kernel) = self.kernels.get_mut(index) {
            kernel.decl_path = Some(path.into());
        }
    }
}

/// A global constant declared with `op_decl_const`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstDescriptor {
    pub name: String,
    /// Quoted type spelling as first declared
    pub ty: String,
    pub dim: Resolved,
    /// Also declared `extern` in user code
    pub user_declared: bool,
}

impl ConstDescriptor {
    /// Type without quotes.
    pub fn type_name(&self) -> &str {
        unquote(&self.ty)
    }
}

/// Constants keyed by name; the first registration wins.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ConstantRegistry {
    consts: Vec<ConstDescriptor>,
}

impl ConstantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a constant, returning its index and any mismatch findings.
    ///
    /// On a repeated name the first registration is kept; a differing type
    /// or dimension yields a warning for each field.
    pub fn insert(
        &mut self,
        name: &str,
        ty: &str,
        dim: Resolved,
        user_declared: bool,
    ) -> (usize, Vec<Diagnostic>) {
        let ty = ty.trim();
        if let Some(index) = self.consts.iter().position(|c| c.name == name) {
            let first = &self.consts[index];
            let mut findings = Vec::new();
            if first.ty != ty {
                findings.push(
                    Diagnostic::warning(
                        DiagnosticKind::ConstantConflict,
                        format!("type mismatch in repeated op_decl_const '{}'", name),
                    )
                    .with_note(format!("keeping {}, ignoring {}", first.ty, ty)),
                );
            }
            if first.dim != dim {
                findings.push(
                    Diagnostic::warning(
                        DiagnosticKind::ConstantConflict,
                        format!("size mismatch in repeated op_decl_const '{}'", name),
                    )
                    .with_note(format!("keeping {}, ignoring {}", first.dim, dim)),
                );
            }
            return (index, findings);
        }

        self.consts.push(ConstDescriptor {
            name: name.to_string(),
            ty: ty.to_string(),
            dim,
            user_declared,
        });
        (self.consts.len() - 1, Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&ConstDescriptor> {
        self.consts.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.consts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConstDescriptor> {
        self.consts.iter()
    }
}

/// A mesh set declared with `op_decl_set` or `op_decl_set_hdf5`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetDescriptor {
    pub name: String,
}

/// Declared sets, deduplicated by name in declaration order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct SetRegistry {
    sets: Vec<SetDescriptor>,
}

impl SetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a set, returning its index and whether it is new.
    pub fn insert(&mut self, name: &str) -> (usize, bool) {
        match self.sets.iter().position(|s| s.name == name) {
            Some(i) => (i, false),
            None => {
                self.sets.push(SetDescriptor { name: name.to_string() });
                (self.sets.len() - 1, true)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SetDescriptor> {
        self.sets.iter()
    }
}
