//! Kernel descriptors and the IR builder.
//!
//! The builder turns one extracted loop call into a [`KernelDescriptor`]:
//! it resolves dimensions and indices, classifies every argument, validates
//! access modes and computes the indirection summary. Structural identity
//! lives in [`KernelSignature`], which derives equality so deduplication
//! never depends on how a call was spelled.

use crate::frontend::ast::{DatFields, LoopCall, RawArg};
use crate::frontend::extract::unquote;
use crate::ir::arg::{split_type, Access, ArgDescriptor, ArgKind, ArgVariant, SoaSource, DIRECT_MARKER};
use crate::ir::indirection::Indirection;
use crate::macros::{MacroResolver, Resolved};
use crate::utils::errors::{SemanticError, SemanticErrorKind};
use crate::utils::pretty::format_list_with;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Addressing kind without the mapping table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Addressing {
    Direct,
    Indirect,
    Global,
}

impl From<&ArgKind> for Addressing {
    fn from(kind: &ArgKind) -> Self {
        match kind {
            ArgKind::Direct => Addressing::Direct,
            ArgKind::Indirect(_) => Addressing::Indirect,
            ArgKind::Global => Addressing::Global,
        }
    }
}

/// Per-argument part of a kernel's structural identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArgSignature {
    pub addressing: Addressing,
    pub dim: Resolved,
    pub ty: String,
    pub access: Option<Access>,
    pub index: Option<Resolved>,
    pub soa: bool,
    pub optional: bool,
    /// Indirect group number (`inds`)
    pub group: usize,
    /// Canonical mapping index (`mapinds`)
    pub map_index: usize,
}

/// Per-group part of a kernel's structural identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GroupSignature {
    /// Representative argument position (`invinds`)
    pub representative: usize,
    pub ty: String,
    pub dim: Resolved,
    pub access: Option<Access>,
    /// Canonical representative sharing the mapping table (`invmapinds`)
    pub map_index: usize,
}

/// Structural identity of a kernel.
///
/// Dataset expressions and mapping table names are not part of the
/// identity; only the shape they induce (groups and mapping indices) is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KernelSignature {
    pub name: String,
    pub args: Vec<ArgSignature>,
    pub groups: Vec<GroupSignature>,
}

impl KernelSignature {
    fn of(name: &str, args: &[ArgDescriptor], ind: &Indirection) -> Self {
        let arg_sigs = args
            .iter()
            .enumerate()
            .map(|(i, a)| ArgSignature {
                addressing: Addressing::from(&a.kind),
                dim: a.dim.clone(),
                ty: a.ty.clone(),
                access: a.access,
                index: a.index.clone(),
                soa: a.is_soa(),
                optional: a.is_optional(),
                group: ind.inds[i],
                map_index: ind.mapinds[i],
            })
            .collect();
        let groups = ind
            .invinds
            .iter()
            .zip(&ind.invmapinds)
            .map(|(&rep, &map_index)| GroupSignature {
                representative: rep,
                ty: args[rep].ty.clone(),
                dim: args[rep].dim.clone(),
                access: args[rep].access,
                map_index,
            })
            .collect();
        Self { name: name.to_string(), args: arg_sigs, groups }
    }

    pub fn nargs(&self) -> usize {
        self.args.len()
    }

    pub fn ninds(&self) -> usize {
        self.groups.len()
    }
}

/// Validated IR for one distinct kernel.
#[derive(Debug, Clone, Serialize)]
pub struct KernelDescriptor {
    /// Structural identity
    pub signature: KernelSignature,
    /// Arguments of the first call registered under this signature
    pub args: Vec<ArgDescriptor>,
    /// Indirection summary
    pub indirection: Indirection,
    /// File holding the kernel implementation, once located
    pub decl_path: Option<PathBuf>,
}

impl KernelDescriptor {
    /// Build a descriptor from classified arguments.
    pub fn new(name: &str, args: Vec<ArgDescriptor>) -> Self {
        let indirection = Indirection::compute(&args);
        let signature = KernelSignature::of(name, &args, &indirection);
        Self { signature, args, indirection, decl_path: None }
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn nargs(&self) -> usize {
        self.args.len()
    }

    pub fn ninds(&self) -> usize {
        self.indirection.ninds()
    }

    /// Path of the located implementation.
    pub fn decl_path(&self) -> Option<&Path> {
        self.decl_path.as_deref()
    }

    fn positions<F: Fn(&ArgDescriptor) -> bool>(&self, pred: F) -> Vec<usize> {
        self.args.iter().enumerate().filter(|(_, a)| pred(a)).map(|(i, _)| i).collect()
    }

    /// Global arguments that are only read.
    pub fn local_constants(&self) -> Vec<usize> {
        self.positions(|a| a.is_global() && a.access == Some(Access::Read))
    }

    /// Global arguments that are reduced into.
    pub fn reductions(&self) -> Vec<usize> {
        self.positions(|a| a.is_global() && a.access.map_or(false, Access::is_reduction))
    }

    pub fn direct_args(&self) -> Vec<usize> {
        self.positions(ArgDescriptor::is_direct)
    }

    pub fn indirect_args(&self) -> Vec<usize> {
        self.positions(ArgDescriptor::is_indirect)
    }

    pub fn optional_args(&self) -> Vec<usize> {
        self.positions(ArgDescriptor::is_optional)
    }

    /// Multi-line classification summary for debug logging.
    pub fn summary(&self) -> String {
        fn list(positions: Vec<usize>) -> String {
            format_list_with(&positions, " ", usize::to_string)
        }
        let mut out = String::new();
        let _ = writeln!(out, "  local constants: {}", list(self.local_constants()));
        let _ = writeln!(out, "  global reductions: {}", list(self.reductions()));
        let _ = writeln!(out, "  direct arguments: {}", list(self.direct_args()));
        let _ = write!(out, "  indirect arguments: {}", list(self.indirect_args()));
        if self.ninds() > 0 {
            let _ = write!(out, "\n  number of indirect datasets: {}", self.ninds());
        }
        let optional = self.optional_args();
        if !optional.is_empty() {
            let _ = write!(out, "\n  optional arguments: {}", list(optional));
        }
        out
    }
}

/// Result of building one loop call.
#[derive(Debug, Clone)]
pub struct BuiltKernel {
    pub descriptor: KernelDescriptor,
    /// Non-fatal findings; the descriptor is still registered
    pub diagnostics: Vec<SemanticError>,
    /// Any argument uses SOA layout
    pub any_soa: bool,
}

/// Builds kernel descriptors from loop calls.
pub struct KernelBuilder<'r> {
    resolver: &'r dyn MacroResolver,
    auto_soa: bool,
}

impl<'r> KernelBuilder<'r> {
    /// Create a builder resolving dimensions through `resolver`.
    pub fn new(resolver: &'r dyn MacroResolver) -> Self {
        Self { resolver, auto_soa: false }
    }

    /// Force SOA layout on arguments whose dimension is not 0 or 1.
    pub fn auto_soa(mut self, enabled: bool) -> Self {
        self.auto_soa = enabled;
        self
    }

    /// Classify and validate every argument of `call`.
    pub fn build(&self, call: &LoopCall) -> BuiltKernel {
        let mut diagnostics = Vec::new();
        let args: Vec<ArgDescriptor> = call
            .args
            .iter()
            .enumerate()
            .map(|(pos, raw)| self.classify(pos, raw, &mut diagnostics))
            .collect();
        let any_soa = args.iter().any(ArgDescriptor::is_soa);
        BuiltKernel {
            descriptor: KernelDescriptor::new(&call.kernel, args),
            diagnostics,
            any_soa,
        }
    }

    fn classify(&self, pos: usize, raw: &RawArg, diagnostics: &mut Vec<SemanticError>) -> ArgDescriptor {
        let arg = match raw {
            RawArg::Dat(fields) => self.dataset(pos, ArgVariant::Dataset, fields, diagnostics),
            RawArg::OptDat { guard, fields } => self.dataset(
                pos,
                ArgVariant::OptionalDataset { guard: guard.clone() },
                fields,
                diagnostics,
            ),
            RawArg::Gbl(g) => ArgDescriptor {
                variant: ArgVariant::Global,
                data: g.data.clone(),
                index: None,
                kind: ArgKind::Global,
                dim: self.resolver.evaluate(&g.dim),
                ty: unquote(&g.typ).to_string(),
                access: Access::from_literal(&g.acc),
                access_literal: g.acc.trim().to_string(),
                soa: None,
            },
        };

        if arg.access.is_none() {
            diagnostics.push(SemanticError::new(
                SemanticErrorKind::UnknownAccess,
                format!("unknown access type '{}' for argument {}", arg.access_literal, pos),
                pos,
            ));
        }
        let illegal = match arg.access {
            Some(Access::Write | Access::ReadWrite) => arg.is_global(),
            Some(Access::Max | Access::Min) => !arg.is_global(),
            _ => false,
        };
        if illegal {
            diagnostics.push(SemanticError::new(
                SemanticErrorKind::IllegalAccess,
                format!("invalid access type {} for argument {}", arg.access_literal, pos),
                pos,
            ));
        }
        arg
    }

    fn dataset(
        &self,
        pos: usize,
        variant: ArgVariant,
        fields: &DatFields,
        diagnostics: &mut Vec<SemanticError>,
    ) -> ArgDescriptor {
        let index = self.resolver.evaluate(&fields.idx);
        let dim = self.resolver.evaluate(&fields.dim);
        let kind = if fields.map.trim() == DIRECT_MARKER {
            if index.as_int() != Some(-1) {
                diagnostics.push(SemanticError::new(
                    SemanticErrorKind::InvalidDirectIndex,
                    format!("invalid index {} for direct argument {}", index, pos),
                    pos,
                ));
            }
            ArgKind::Direct
        } else {
            ArgKind::Indirect(fields.map.trim().to_string())
        };

        let (ty, explicit_soa) = split_type(&fields.typ);
        let soa = if explicit_soa {
            Some(SoaSource::Explicit)
        } else if self.auto_soa && (dim.is_symbolic() || dim.as_int().map_or(false, |d| d > 1)) {
            Some(SoaSource::Auto)
        } else {
            None
        };

        ArgDescriptor {
            variant,
            data: fields.dat.clone(),
            index: Some(index),
            kind,
            dim,
            ty,
            access: Access::from_literal(&fields.acc),
            access_literal: fields.acc.trim().to_string(),
            soa,
        }
    }
}
