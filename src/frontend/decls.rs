//! Declarations and library calls outside of loops.
//!
//! Constant and set declarations, the API header include, init calls (for
//! SOA redirection), `extern` globals, and the census of init/exit/partition
//! and HDF5 identifiers used for end-of-run advice.

use crate::frontend::ast::{ConstDecl, HeaderInclude, InitCall, SetDecl};
use crate::frontend::comments::strip_comments;
use crate::frontend::extract::{unquote, CallSite};
use crate::frontend::scanner::{occurrences, Construct, Identifiers};
use crate::utils::errors::ExtractError;
use crate::utils::location::Span;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::ops::AddAssign;

/// Recognized API header spellings, in order of preference.
pub const API_HEADERS: [&str; 2] = ["op_seq.h", "op_lib_cpp.h"];

static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*(#[ \t]*include[ \t]*["<]([A-Za-z0-9_./-]+)[">])"#).expect("valid include regex")
});

static EXTERN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bextern\s+\w+\s+(\w+)").expect("valid extern regex")
});

/// Extract every `op_decl_const(dim, "type", &name);` call.
pub fn extract_consts(text: &str) -> Vec<Result<ConstDecl, ExtractError>> {
    occurrences(text, &[Construct::DeclConst])
        .map(|occ| {
            let call = CallSite::locate(text, occ)?;
            let mut fields = call.fields_exact(3)?.into_iter();
            let end = call.statement_end(text)?;
            Ok(ConstDecl {
                span: Span::from_range(call.start..end),
                dim: fields.next().unwrap_or_default(),
                typ: fields.next().unwrap_or_default(),
                expr: fields.next().unwrap_or_default(),
            })
        })
        .collect()
}

/// Extract every `op_decl_set` and `op_decl_set_hdf5` call.
///
/// The set name is the second field; the HDF5 variant spells it as a
/// string literal, which is unquoted.
pub fn extract_sets(text: &str) -> Vec<Result<SetDecl, ExtractError>> {
    occurrences(text, &[Construct::DeclSet, Construct::DeclSetHdf5])
        .map(|occ| {
            let call = CallSite::locate(text, occ)?;
            let fields = call.fields_exact(2)?;
            let hdf5 = occ.construct == Construct::DeclSetHdf5;
            let name = if hdf5 { unquote(&fields[1]) } else { fields[1].as_str() };
            Ok(SetDecl {
                span: call.span(),
                name: name.to_string(),
                hdf5,
            })
        })
        .collect()
}

/// Extract every `op_init(...)` and `op_mpi_init(...)` call.
pub fn extract_init_calls(text: &str) -> Vec<Result<InitCall, ExtractError>> {
    occurrences(text, &[Construct::Init, Construct::MpiInit])
        .map(|occ| {
            let call = CallSite::locate(text, occ)?;
            Ok(InitCall {
                span: call.span(),
                construct: occ.construct,
                args: call.inner.to_string(),
            })
        })
        .collect()
}

/// True when an include path names `header`, bare or under a directory.
fn names_header(path: &str, header: &str) -> bool {
    path.strip_suffix(header)
        .map_or(false, |prefix| prefix.is_empty() || prefix.ends_with('/'))
}

/// Locate the API header include, preferring `op_seq.h`.
pub fn find_api_header(text: &str) -> Option<HeaderInclude> {
    API_HEADERS.iter().find_map(|&wanted| {
        INCLUDE_RE.captures_iter(text).find_map(|caps| {
            let directive = caps.get(1)?;
            names_header(caps.get(2)?.as_str(), wanted).then(|| HeaderInclude {
                span: Span::from_range(directive.range()),
                header: wanted.to_string(),
            })
        })
    })
}

/// Names declared `extern <type> <name>` anywhere in `text`.
pub fn extern_globals(text: &str) -> Vec<String> {
    let scratch = strip_comments(text);
    EXTERN_RE
        .captures_iter(&scratch)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Counts of library lifecycle identifiers in a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallCensus {
    /// `op_init`, `op_mpi_init` and their SOA variants
    pub inits: usize,
    /// Identifiers containing `op_exit`
    pub exits: usize,
    /// Identifiers containing `op_partition`
    pub partitions: usize,
    /// Identifiers containing `hdf5`
    pub hdf5: usize,
}

impl CallCensus {
    /// Count lifecycle identifiers in `text`, ignoring comments.
    pub fn of(text: &str) -> Self {
        let mut census = CallCensus::default();
        for (_, ident) in Identifiers::new(text) {
            if ident.starts_with("op_init") || ident.starts_with("op_mpi_init") {
                census.inits += 1;
            }
            if ident.contains("op_exit") {
                census.exits += 1;
            }
            if ident.contains("op_partition") {
                census.partitions += 1;
            }
            if ident.contains("hdf5") {
                census.hdf5 += 1;
            }
        }
        census
    }
}

impl AddAssign for CallCensus {
    fn add_assign(&mut self, other: Self) {
        self.inits += other.inits;
        self.exits += other.exits;
        self.partitions += other.partitions;
        self.hdf5 += other.hdf5;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consts() {
        let text = "  op_decl_const(1, \"double\", &gam);\n  op_decl_const(NDIM, \"float\", &qinf );";
        let consts: Vec<ConstDecl> = extract_consts(text).into_iter().map(Result::unwrap).collect();
        assert_eq!(consts.len(), 2);
        assert_eq!(consts[0].name(), "gam");
        assert_eq!(consts[0].typ, "\"double\"");
        assert_eq!(&text[consts[0].span.range()], "op_decl_const(1, \"double\", &gam);");
        assert_eq!(consts[1].dim, "NDIM");
        assert_eq!(consts[1].name(), "qinf");
    }

    #[test]
    fn test_const_arity() {
        let text = "op_decl_const(1, &gam);";
        assert!(extract_consts(text)[0].is_err());
    }

    #[test]
    fn test_sets() {
        let text = "op_set nodes = op_decl_set(nnode, \"nodes\");\n\
                    op_set cells = op_decl_set_hdf5(file, \"cells\");";
        let sets: Vec<SetDecl> = extract_sets(text).into_iter().map(Result::unwrap).collect();
        assert_eq!(sets[0].name, "\"nodes\"");
        assert!(!sets[0].hdf5);
        assert_eq!(sets[1].name, "cells");
        assert!(sets[1].hdf5);
    }

    #[test]
    fn test_header_preference() {
        let text = "#include \"op_lib_cpp.h\"\n#include  \"op_seq.h\"\n";
        let header = find_api_header(text).unwrap();
        assert_eq!(header.header, "op_seq.h");
        assert_eq!(&text[header.span.range()], "#include  \"op_seq.h\"");

        let text = "// x\n#include \"op_lib_cpp.h\"\n";
        assert_eq!(find_api_header(text).unwrap().header, "op_lib_cpp.h");
        assert!(find_api_header("#include <stdio.h>\n").is_none());
    }

    #[test]
    fn test_header_with_directory() {
        let text = "#include \"../../include/op_seq.h\"\n";
        let header = find_api_header(text).unwrap();
        assert_eq!(header.header, "op_seq.h");
        assert_eq!(&text[header.span.range()], "#include \"../../include/op_seq.h\"");

        assert!(find_api_header("#include \"my_op_seq.h\"\n").is_none());
        assert!(find_api_header("#include \"op_seq.h.bak\"\n").is_none());
    }

    #[test]
    fn test_extern_globals() {
        let text = "extern double gam;\n// extern int ignored;\nextern int  niter;";
        assert_eq!(extern_globals(text), vec!["gam".to_string(), "niter".to_string()]);
    }

    #[test]
    fn test_census() {
        let text = "op_init(argc, argv, 2); /* op_exit() */ op_partition(\"PTSCOTCH\", \"KWAY\", edges, pecell, p_x);\n\
                    op_decl_set_hdf5(file, \"cells\"); op_exit();";
        let census = CallCensus::of(text);
        assert_eq!(census, CallCensus { inits: 1, exits: 1, partitions: 1, hdf5: 1 });
    }

    #[test]
    fn test_init_calls() {
        let text = "op_mpi_init(argc, argv, 2, MPI_COMM_WORLD, MPI_COMM_WORLD);";
        let init = extract_init_calls(text).remove(0).unwrap();
        assert_eq!(init.construct, Construct::MpiInit);
        assert_eq!(init.args, "argc, argv, 2, MPI_COMM_WORLD, MPI_COMM_WORLD");
        assert_eq!(init.span.end, text.len() - 1);
    }
}
