//! # op2-translator - front end of a source-to-source translator for OP2
//!
//! Scans host source files for OP2 parallel-loop annotations, builds a
//! validated, cross-file-deduplicated kernel IR, rewrites every file into a
//! canonical form calling generated wrappers, and locates each kernel's
//! user-supplied implementation.
//!
//! ## Architecture
//!
//! ```text
//! Input → Macros → Frontend (scan/extract) → IR (classify/group/dedup) → Rewrite → Locate → Backends
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use op2_translator::prelude::*;
//!
//! let config = TranslatorConfig::from_paths(["airfoil.cpp", "kernels/"]).with_env();
//! let translator = op2_translator::run(config)?;
//! for kernel in translator.kernels().iter() {
//!     println!("{} ({} args, {} indirect)", kernel.name(), kernel.nargs(), kernel.ninds());
//! }
//! ```

#![warn(clippy::all)]

pub mod codegen;
pub mod config;
pub mod driver;
pub mod frontend;
pub mod ir;
pub mod locate;
pub mod macros;
pub mod output;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::codegen::{Backend, BackendInputs, ManifestBackend};
    pub use crate::config::TranslatorConfig;
    pub use crate::driver::{run, Translator};
    pub use crate::frontend::{Construct, LoopCall, RawArg};
    pub use crate::ir::{
        Access, ArgDescriptor, ArgKind, ConstantRegistry, KernelBuilder, KernelDescriptor, KernelRegistry,
        SetRegistry,
    };
    pub use crate::macros::{MacroResolver, MacroTable, Resolved};
    pub use crate::utils::errors::*;
}

pub use config::TranslatorConfig;
pub use driver::{run, Translator};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
