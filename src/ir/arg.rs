//! Argument descriptors.
//!
//! An [`ArgDescriptor`] is the classified, macro-resolved form of one loop
//! argument. Its canonical text ([`ArgDescriptor::to_raw`]) is what the
//! rewriter writes into the generated wrapper call.

use crate::frontend::ast::{DatFields, GblFields, RawArg};
use crate::frontend::extract::unquote;
use crate::macros::Resolved;
use serde::Serialize;
use std::fmt;

/// Marker naming the identity mapping of a direct argument.
pub const DIRECT_MARKER: &str = "OP_ID";

/// Access mode of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
    Increment,
    Max,
    Min,
}

impl Access {
    /// All access modes in library order.
    pub const ALL: [Access; 6] = [
        Access::Read,
        Access::Write,
        Access::ReadWrite,
        Access::Increment,
        Access::Max,
        Access::Min,
    ];

    /// Parse an access literal such as `OP_READ`.
    pub fn from_literal(literal: &str) -> Option<Access> {
        Self::ALL.into_iter().find(|a| a.literal() == literal.trim())
    }

    /// Library spelling of the access mode.
    pub fn literal(self) -> &'static str {
        match self {
            Access::Read => "OP_READ",
            Access::Write => "OP_WRITE",
            Access::ReadWrite => "OP_RW",
            Access::Increment => "OP_INC",
            Access::Max => "OP_MAX",
            Access::Min => "OP_MIN",
        }
    }

    /// True for modes that combine values across elements.
    pub fn is_reduction(self) -> bool {
        !matches!(self, Access::Read)
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

/// How an argument addresses its data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "map")]
pub enum ArgKind {
    /// Identity mapping over the loop set
    Direct,
    /// Through the named mapping table
    Indirect(String),
    /// Not addressed through the mesh
    Global,
}

impl ArgKind {
    /// Mapping table name, for indirect arguments.
    pub fn map_name(&self) -> Option<&str> {
        match self {
            ArgKind::Indirect(map) => Some(map),
            _ => None,
        }
    }
}

/// Where an argument's SOA flag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SoaSource {
    /// `:soa` suffix on the type spelling
    Explicit,
    /// Forced on by the auto-SOA setting
    Auto,
}

/// Construct an argument was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArgVariant {
    /// `op_arg_dat`
    Dataset,
    /// `op_opt_arg_dat` with its guard expression
    OptionalDataset { guard: String },
    /// `op_arg_gbl`
    Global,
}

/// A classified loop argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgDescriptor {
    /// Construct the argument was written with
    pub variant: ArgVariant,
    /// Dataset or data expression
    pub data: String,
    /// Resolved index (datasets only)
    pub index: Option<Resolved>,
    /// Addressing kind
    pub kind: ArgKind,
    /// Resolved dimension
    pub dim: Resolved,
    /// Element type, without quotes or SOA marker
    pub ty: String,
    /// Access mode, if the literal was recognized
    pub access: Option<Access>,
    /// Access literal as written
    pub access_literal: String,
    /// SOA layout flag and its origin
    pub soa: Option<SoaSource>,
}

impl ArgDescriptor {
    /// True for `op_opt_arg_dat` arguments.
    pub fn is_optional(&self) -> bool {
        matches!(self.variant, ArgVariant::OptionalDataset { .. })
    }

    pub fn is_direct(&self) -> bool {
        self.kind == ArgKind::Direct
    }

    pub fn is_indirect(&self) -> bool {
        matches!(self.kind, ArgKind::Indirect(_))
    }

    pub fn is_global(&self) -> bool {
        self.kind == ArgKind::Global
    }

    /// True when the argument uses SOA layout.
    pub fn is_soa(&self) -> bool {
        self.soa.is_some()
    }

    /// Canonical construct for this argument.
    ///
    /// Dimension and index are written in resolved form; an explicit
    /// `:soa` marker is written back, an automatic one is not.
    pub fn to_raw(&self) -> RawArg {
        let typ = match self.soa {
            Some(SoaSource::Explicit) => format!("\"{}:soa\"", self.ty),
            _ => format!("\"{}\"", self.ty),
        };
        let dat = || DatFields {
            dat: self.data.clone(),
            idx: self.index.as_ref().map(Resolved::to_string).unwrap_or_default(),
            map: self.kind.map_name().unwrap_or(DIRECT_MARKER).to_string(),
            dim: self.dim.to_string(),
            typ: typ.clone(),
            acc: self.access_literal.clone(),
        };
        match &self.variant {
            ArgVariant::Dataset => RawArg::Dat(dat()),
            ArgVariant::OptionalDataset { guard } => RawArg::OptDat {
                guard: guard.clone(),
                fields: dat(),
            },
            ArgVariant::Global => RawArg::Gbl(GblFields {
                data: self.data.clone(),
                dim: self.dim.to_string(),
                typ: typ.clone(),
                acc: self.access_literal.clone(),
            }),
        }
    }
}

impl fmt::Display for ArgDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw())
    }
}

/// Split a quoted type spelling into its element type and explicit SOA flag.
pub fn split_type(spelling: &str) -> (String, bool) {
    let inner = unquote(spelling.trim());
    match inner.find(":soa") {
        Some(pos) => (inner[..pos].to_string(), true),
        None => (inner.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_literals() {
        assert_eq!(Access::from_literal(" OP_INC "), Some(Access::Increment));
        assert_eq!(Access::from_literal("OP_RW"), Some(Access::ReadWrite));
        assert_eq!(Access::from_literal("OP_READWRITE"), None);
        assert!(Access::Max.is_reduction());
        assert!(!Access::Read.is_reduction());
    }

    #[test]
    fn test_split_type() {
        assert_eq!(split_type("\"double:soa\""), ("double".to_string(), true));
        assert_eq!(split_type("\"int\""), ("int".to_string(), false));
    }

    #[test]
    fn test_canonical_text() {
        let arg = ArgDescriptor {
            variant: ArgVariant::OptionalDataset { guard: "flag".into() },
            data: "p_q".into(),
            index: Some(Resolved::Int(0)),
            kind: ArgKind::Indirect("pecell".into()),
            dim: Resolved::Int(4),
            ty: "double".into(),
            access: Some(Access::Read),
            access_literal: "OP_READ".into(),
            soa: Some(SoaSource::Explicit),
        };
        assert_eq!(arg.to_string(), "op_opt_arg_dat(flag,p_q,0,pecell,4,\"double:soa\",OP_READ)");

        let auto = ArgDescriptor { soa: Some(SoaSource::Auto), ..arg };
        assert!(auto.to_string().ends_with("\"double\",OP_READ)"));
    }
}
