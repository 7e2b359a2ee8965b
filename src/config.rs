//! Run configuration.

use crate::output::DEFAULT_TAG;
use std::path::{Path, PathBuf};

/// Environment variable enabling automatic SOA layout.
pub const AUTO_SOA_VAR: &str = "OP_AUTO_SOA";

/// Banner written at the top of every rewritten unit.
pub const DEFAULT_BANNER: &str = "//\n// auto-generated by op2-translator\n//\n\n";

/// Configuration for one translation run
#[derive(Clone, Debug)]
pub struct TranslatorConfig {
    /// Input units, processed in this order
    pub inputs: Vec<PathBuf>,

    /// Directories searched for kernel declarations
    pub search_dirs: Vec<PathBuf>,

    /// Label handed to backends (first command line path)
    pub master_file: Option<PathBuf>,

    /// Force SOA layout on multi-component datasets
    pub auto_soa: bool,

    /// Tag appended to rewritten file and directory names
    pub output_tag: String,

    /// Banner prefixed to every rewritten unit
    pub banner: String,

    /// Directory checked first for `<kernel>.h`
    pub working_dir: PathBuf,

    /// Directory backends write generated files to
    pub output_dir: PathBuf,

    /// Run the JSON manifest backend
    pub manifest: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            search_dirs: Vec::new(),
            master_file: None,
            auto_soa: false,
            output_tag: DEFAULT_TAG.to_string(),
            banner: DEFAULT_BANNER.to_string(),
            working_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            manifest: true,
        }
    }
}

impl TranslatorConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify command line paths: existing regular files are inputs,
    /// existing directories are declaration search paths.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut config = Self::default();
        for path in paths {
            let path = path.as_ref();
            if config.master_file.is_none() {
                config.master_file = Some(path.to_path_buf());
            }
            if path.is_file() {
                config.inputs.push(path.to_path_buf());
            } else if path.is_dir() {
                config.search_dirs.push(path.to_path_buf());
            } else {
                log::warn!("ignoring {}: not a file or directory", path.display());
            }
        }
        config
    }

    /// Apply `OP_AUTO_SOA` from the process environment.
    pub fn with_env(self) -> Self {
        let value = std::env::var(AUTO_SOA_VAR).ok();
        self.auto_soa(auto_soa_enabled(value.as_deref()))
    }

    /// Add an input unit
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if self.master_file.is_none() {
            self.master_file = Some(path.clone());
        }
        self.inputs.push(path);
        self
    }

    /// Add a declaration search directory
    pub fn search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    /// Enable/disable automatic SOA layout
    pub fn auto_soa(mut self, enabled: bool) -> Self {
        self.auto_soa = enabled;
        self
    }

    /// Set the output tag
    pub fn output_tag(mut self, tag: &str) -> Self {
        self.output_tag = tag.to_string();
        self
    }

    /// Set the rewritten-unit banner
    pub fn banner(mut self, banner: &str) -> Self {
        self.banner = banner.to_string();
        self
    }

    /// Set the directory checked first for kernel headers
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Set the backend output directory
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Enable/disable the manifest backend
    pub fn manifest(mut self, enabled: bool) -> Self {
        self.manifest = enabled;
        self
    }

    /// Master-file label handed to backends.
    pub fn master_label(&self) -> String {
        self.master_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

/// `OP_AUTO_SOA` semantics: absent or `"0"` is off, anything else is on.
pub fn auto_soa_enabled(value: Option<&str>) -> bool {
    !matches!(value, None | Some("0"))
}
