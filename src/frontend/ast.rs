//! Raw constructs extracted from host source.
//!
//! These hold the trimmed field text exactly as written (comments removed).
//! Classification and macro resolution happen later, in the IR builder; the
//! rewriter re-serializes these fields verbatim.

use crate::frontend::scanner::Construct;
use crate::utils::location::Span;
use serde::Serialize;
use std::fmt;

/// Fields of an `op_arg_dat` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatFields {
    /// Dataset expression
    pub dat: String,
    /// Index expression
    pub idx: String,
    /// Mapping table name, or `OP_ID`
    pub map: String,
    /// Dimension expression
    pub dim: String,
    /// Quoted type spelling, possibly with `:soa`
    pub typ: String,
    /// Access literal
    pub acc: String,
}

/// Fields of an `op_arg_gbl` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GblFields {
    /// Data expression
    pub data: String,
    /// Dimension expression
    pub dim: String,
    /// Quoted type spelling
    pub typ: String,
    /// Access literal
    pub acc: String,
}

/// One argument of a loop call, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RawArg {
    /// `op_arg_dat(...)`
    Dat(DatFields),
    /// `op_opt_arg_dat(guard, ...)`
    OptDat {
        /// Run-time guard expression
        guard: String,
        /// Remaining dataset fields
        fields: DatFields,
    },
    /// `op_arg_gbl(...)`
    Gbl(GblFields),
}

impl RawArg {
    /// Construct keyword this argument was written with.
    pub fn construct(&self) -> Construct {
        match self {
            RawArg::Dat(_) => Construct::ArgDat,
            RawArg::OptDat { .. } => Construct::OptArgDat,
            RawArg::Gbl(_) => Construct::ArgGbl,
        }
    }

    /// Build an argument from exactly `construct.arity()` trimmed fields.
    pub(crate) fn from_fields(construct: Construct, f: Vec<String>) -> Option<RawArg> {
        let mut it = f.into_iter();
        let mut next = || it.next();
        match construct {
            Construct::ArgDat => Some(RawArg::Dat(DatFields {
                dat: next()?,
                idx: next()?,
                map: next()?,
                dim: next()?,
                typ: next()?,
                acc: next()?,
            })),
            Construct::OptArgDat => {
                let guard = next()?;
                Some(RawArg::OptDat {
                    guard,
                    fields: DatFields {
                        dat: next()?,
                        idx: next()?,
                        map: next()?,
                        dim: next()?,
                        typ: next()?,
                        acc: next()?,
                    },
                })
            }
            Construct::ArgGbl => Some(RawArg::Gbl(GblFields {
                data: next()?,
                dim: next()?,
                typ: next()?,
                acc: next()?,
            })),
            _ => None,
        }
    }
}

/// Canonical textual form, as emitted into rewritten files.
impl fmt::Display for RawArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawArg::Dat(d) => write!(
                f,
                "op_arg_dat({},{},{},{},{},{})",
                d.dat, d.idx, d.map, d.dim, d.typ, d.acc
            ),
            RawArg::OptDat { guard, fields: d } => write!(
                f,
                "op_opt_arg_dat({},{},{},{},{},{},{})",
                guard, d.dat, d.idx, d.map, d.dim, d.typ, d.acc
            ),
            RawArg::Gbl(g) => write!(f, "op_arg_gbl({},{},{},{})", g.data, g.dim, g.typ, g.acc),
        }
    }
}

/// A parsed `op_par_loop` call (or a rewritten wrapper call).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopCall {
    /// From the keyword through the terminating `;`
    pub span: Span,
    /// Kernel function name
    pub kernel: String,
    /// Diagnostic name expression (usually a string literal)
    pub label: String,
    /// Mesh set expression
    pub set: String,
    /// Arguments in source order
    pub args: Vec<RawArg>,
}

impl LoopCall {
    /// Number of arguments.
    pub fn nargs(&self) -> usize {
        self.args.len()
    }
}

/// A parsed `op_decl_const` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstDecl {
    /// From the keyword through the terminating `;`
    pub span: Span,
    /// Dimension expression
    pub dim: String,
    /// Quoted type spelling
    pub typ: String,
    /// Data expression as written, usually `&name`
    pub expr: String,
}

impl ConstDecl {
    /// Constant name: the data expression without a leading `&`.
    pub fn name(&self) -> &str {
        self.expr.strip_prefix('&').unwrap_or(&self.expr).trim()
    }
}

/// A parsed `op_decl_set` or `op_decl_set_hdf5` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDecl {
    /// Call span (keyword through closing parenthesis)
    pub span: Span,
    /// Set name
    pub name: String,
    /// Declared through the HDF5 variant
    pub hdf5: bool,
}

/// A library init call that can be redirected to its SOA variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitCall {
    /// Keyword through closing parenthesis
    pub span: Span,
    /// `op_init` or `op_mpi_init`
    pub construct: Construct,
    /// Raw text between the parentheses
    pub args: String,
}

/// The API header include directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInclude {
    /// From `#` through the closing delimiter
    pub span: Span,
    /// Header file name as spelled
    pub header: String,
}
