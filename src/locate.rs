//! Kernel declaration locator.
//!
//! Each distinct kernel must have exactly one user-supplied implementation.
//! Search order, first match wins:
//!
//! 1. `<kernel>.h` in the working directory
//! 2. `<kernel>.h` in each search directory, in command line order
//! 3. the full text of every input unit
//! 4. the full text of every regular file directly under each search directory
//!
//! A text matches when it holds exactly one `inline void <kernel>(`
//! implementation, or exactly one line-initial `void <kernel>(...);`
//! prototype.

use crate::ir::KernelRegistry;
use crate::utils::errors::{TranslateResult, TranslatorError};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Compiled declaration patterns for one kernel.
#[derive(Debug, Clone)]
pub struct KernelPattern {
    inline: Regex,
    prototype: Regex,
}

impl KernelPattern {
    pub fn new(name: &str) -> Result<Self, regex::Error> {
        let name = regex::escape(name);
        Ok(Self {
            inline: Regex::new(&format!(r"inline[ \n]+void[ \n]+{}\s*\(", name))?,
            prototype: Regex::new(&format!(r"(?m)^void[ \n]+{}\([ \n]*[ \nA-Za-z0-9*_.,#]+\);", name))?,
        })
    }

    /// True when `text` declares the kernel unambiguously.
    pub fn matches(&self, text: &str) -> bool {
        self.inline.find_iter(text).count() == 1 || self.prototype.find_iter(text).count() == 1
    }
}

/// Searches for kernel implementations, caching file contents.
#[derive(Debug)]
pub struct DeclarationLocator<'a> {
    inputs: &'a [PathBuf],
    search_dirs: &'a [PathBuf],
    working_dir: PathBuf,
    texts: HashMap<PathBuf, Option<String>>,
}

impl<'a> DeclarationLocator<'a> {
    pub fn new(inputs: &'a [PathBuf], search_dirs: &'a [PathBuf]) -> Self {
        Self {
            inputs,
            search_dirs,
            working_dir: PathBuf::from("."),
            texts: HashMap::new(),
        }
    }

    /// Directory checked first for `<kernel>.h`.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Path of the file implementing `kernel`.
    pub fn locate(&mut self, kernel: &str) -> Option<PathBuf> {
        let pattern = match KernelPattern::new(kernel) {
            Ok(pattern) => pattern,
            Err(e) => {
                log::error!("cannot search for kernel {}: {}", kernel, e);
                return None;
            }
        };
        let header = format!("{}.h", kernel);

        let named = std::iter::once(self.working_dir.join(&header))
            .chain(self.search_dirs.iter().map(|d| d.join(&header)));
        for path in named.collect::<Vec<_>>() {
            if path.is_file() && self.matches(&path, &pattern) {
                return Some(path);
            }
        }

        for path in self.inputs {
            if self.matches(path, &pattern) {
                return Some(path.clone());
            }
        }

        for dir in self.search_dirs {
            for path in regular_files(dir) {
                if self.matches(&path, &pattern) {
                    return Some(path);
                }
            }
        }
        None
    }

    /// Locate every registered kernel, recording each path in the registry.
    ///
    /// Every kernel is searched before failing; the error names all
    /// kernels left unresolved.
    pub fn resolve_all(&mut self, registry: &mut KernelRegistry) -> TranslateResult<()> {
        let mut missing = Vec::new();
        for index in 0..registry.len() {
            let Some(name) = registry.get(index).map(|k| k.name().to_string()) else {
                continue;
            };
            match self.locate(&name) {
                Some(path) => {
                    log::debug!("kernel {} declared in {}", name, path.display());
                    registry.set_decl_path(index, path);
                }
                None => {
                    log::error!("Declaration not found for kernel {}", name);
                    missing.push(name);
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TranslatorError::DeclarationNotFound { kernels: missing })
        }
    }

    fn matches(&mut self, path: &Path, pattern: &KernelPattern) -> bool {
        let text = self.texts.entry(path.to_path_buf()).or_insert_with(|| {
            fs::read(path)
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .map_err(|e| log::debug!("skipping {}: {}", path.display(), e))
                .ok()
        });
        text.as_deref().map_or(false, |t| pattern.matches(t))
    }
}

/// Regular files directly under `dir`, sorted by name.
fn regular_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_kernel_pattern() {
        let save_soln = KernelPattern::new("save_soln").unwrap();
        assert!(save_soln.matches("inline void save_soln(const double *q, double *qold) {}"));
        assert!(!save_soln.matches("inline void save_soln_v2(double *q) {}"));

        let adt_calc = KernelPattern::new("adt_calc").unwrap();
        assert!(adt_calc.matches("int x;\nvoid adt_calc(const double *x, double *adt);\n"));
        assert!(!adt_calc.matches("  void adt_calc(double *adt);\n"));

        let k = KernelPattern::new("k").unwrap();
        assert!(!k.matches("inline void k(int *a) {}\ninline void k(double *a) {}\n"));
    }

    #[test]
    fn test_search_order() {
        let work = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let input = work.path().join("main.cpp");
        fs::write(&input, "inline void in_input(int *a) {}\n").unwrap();
        fs::write(work.path().join("in_workdir.h"), "inline void in_workdir(int *a) {}\n").unwrap();
        fs::write(dir.path().join("in_dir.h"), "inline void in_dir(int *a) {}\n").unwrap();
        fs::write(dir.path().join("kernels.h"), "void in_any_file(double *x);\n").unwrap();

        let inputs = vec![input.clone()];
        let dirs = vec![dir.path().to_path_buf()];
        let mut locator = DeclarationLocator::new(&inputs, &dirs).with_working_dir(work.path());

        assert_eq!(locator.locate("in_workdir"), Some(work.path().join("in_workdir.h")));
        assert_eq!(locator.locate("in_dir"), Some(dir.path().join("in_dir.h")));
        assert_eq!(locator.locate("in_input"), Some(input));
        assert_eq!(locator.locate("in_any_file"), Some(dir.path().join("kernels.h")));
        assert_eq!(locator.locate("nowhere"), None);
    }
}
