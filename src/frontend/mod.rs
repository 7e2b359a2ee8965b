//! Frontend: construct scanning and extraction for annotated host source.
//!
//! The frontend never parses the host language. It recognizes the OP2 API
//! vocabulary lexically and extracts the fields of each construct:
//!
//! ```text
//! op_par_loop(res_calc, "res_calc", edges,
//!             op_arg_dat(p_x, 0, pedge, 2, "double", OP_READ),
//!             op_arg_gbl(&rms, 1, "double", OP_INC));
//! ```
//!
//! All offsets refer to one immutable snapshot of the unit.

pub mod scanner;
pub mod comments;
pub mod brackets;
pub mod ast;
pub mod extract;
pub mod loops;
pub mod decls;

// Re-exports
pub use ast::*;
pub use scanner::{Construct, Occurrence};
pub use decls::CallCensus;
pub use loops::{extract_loops, extract_wrapper_calls, WRAPPER_PREFIX};

use crate::utils::errors::ExtractError;

/// Everything the frontend extracts from one unit.
#[derive(Debug, Clone)]
pub struct ScannedUnit {
    /// Lifecycle identifier counts
    pub census: CallCensus,
    /// API header include, if present
    pub header: Option<HeaderInclude>,
    /// `op_decl_const` calls in source order
    pub consts: Vec<Result<ConstDecl, ExtractError>>,
    /// `op_decl_set*` calls in source order
    pub sets: Vec<Result<SetDecl, ExtractError>>,
    /// `op_par_loop` calls in source order
    pub loops: Vec<Result<LoopCall, ExtractError>>,
    /// `op_init`/`op_mpi_init` calls in source order
    pub inits: Vec<Result<InitCall, ExtractError>>,
}

/// Scan one unit for every recognized construct.
pub fn scan_unit(text: &str) -> ScannedUnit {
    ScannedUnit {
        census: CallCensus::of(text),
        header: decls::find_api_header(text),
        consts: decls::extract_consts(text),
        sets: decls::extract_sets(text),
        loops: loops::extract_loops(text),
        inits: decls::extract_init_calls(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_unit() {
        let source = r#"
#include "op_seq.h"
int main(int argc, char **argv) {
  op_init(argc, argv, 2);
  op_decl_const(1, "double", &gam);
  op_par_loop(save_soln, "save_soln", cells,
              op_arg_dat(p_q, -1, OP_ID, 4, "double", OP_READ),
              op_arg_dat(p_qold, -1, OP_ID, 4, "double", OP_WRITE));
  op_exit();
}
"#;
        let unit = scan_unit(source);
        assert_eq!(unit.header.as_ref().map(|h| h.header.as_str()), Some("op_seq.h"));
        assert_eq!(unit.consts.len(), 1);
        assert_eq!(unit.loops.len(), 1);
        assert_eq!(unit.inits.len(), 1);
        assert_eq!(unit.census.exits, 1);
        assert!(unit.sets.is_empty());
    }
}
