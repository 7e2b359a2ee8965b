//! Utility modules for the translator.
//!
//! This module contains common utilities used throughout the codebase:
//! - Error and diagnostic types
//! - Source location tracking
//! - Text emission helpers

pub mod errors;
pub mod location;
pub mod pretty;

// Re-exports
pub use errors::*;
pub use location::{SourceLocation, SourceMap, Span};
pub use pretty::CodeFormatter;
