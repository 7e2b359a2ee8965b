//! Source rewriting by offset splicing.
//!
//! All splice ranges are computed against one immutable snapshot of the
//! unit. [`SplicePlan::apply`] validates the whole plan (bounds, character
//! boundaries, overlaps) before producing any output, then copies the
//! snapshot in a single forward pass.

use crate::frontend::ast::{ConstDecl, HeaderInclude, InitCall, LoopCall};
use crate::frontend::loops::WRAPPER_PREFIX;
use crate::frontend::scanner::Construct;
use crate::ir::arg::ArgDescriptor;
use crate::ir::kernel::KernelDescriptor;
use crate::macros::Resolved;
use crate::utils::errors::{SpliceError, SpliceErrorKind};
use crate::utils::location::SourceMap;
use crate::utils::pretty::CodeFormatter;
use std::ops::Range;

/// Header that replaces the API include.
pub const LIBRARY_HEADER: &str = "op_lib_cpp.h";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Splice {
    range: Range<usize>,
    text: String,
}

/// Replacements against one source snapshot.
#[derive(Debug, Clone)]
pub struct SplicePlan<'a> {
    source: &'a str,
    splices: Vec<Splice>,
}

impl<'a> SplicePlan<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, splices: Vec::new() }
    }

    /// Replace `range` of the snapshot with `text`.
    pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.splices.push(Splice { range, text: text.into() });
    }

    pub fn len(&self) -> usize {
        self.splices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splices.is_empty()
    }

    /// Validate every splice, then produce the rewritten text.
    pub fn apply(mut self) -> Result<String, SpliceError> {
        self.splices.sort_by_key(|s| (s.range.start, s.range.end));

        let mut previous_end = 0;
        for splice in &self.splices {
            let Range { start, end } = splice.range;
            if start > end || end > self.source.len() {
                return Err(SpliceError {
                    message: format!("splice {}..{} is outside a {} byte source", start, end, self.source.len()),
                    kind: SpliceErrorKind::OutOfBounds,
                });
            }
            if !self.source.is_char_boundary(start) || !self.source.is_char_boundary(end) {
                return Err(SpliceError {
                    message: format!("splice {}..{} splits a character", start, end),
                    kind: SpliceErrorKind::CharBoundary,
                });
            }
            if start < previous_end {
                return Err(SpliceError {
                    message: format!("splice {}..{} overlaps a previous splice ending at {}", start, end, previous_end),
                    kind: SpliceErrorKind::Overlap,
                });
            }
            previous_end = end;
        }

        let replaced: usize = self.splices.iter().map(|s| s.range.len()).sum();
        let inserted: usize = self.splices.iter().map(|s| s.text.len()).sum();
        let mut out = String::with_capacity(self.source.len() - replaced + inserted);
        let mut copied = 0;
        for splice in &self.splices {
            out.push_str(&self.source[copied..splice.range.start]);
            out.push_str(&splice.text);
            copied = splice.range.end;
        }
        out.push_str(&self.source[copied..]);
        Ok(out)
    }
}

/// A wrapper call emitted for one loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedWrapper {
    /// Kernel name
    pub kernel: String,
    /// Full call text, through the `;`
    pub text: String,
}

/// Output of rewriting one unit.
#[derive(Debug, Clone)]
pub struct RewrittenUnit {
    pub text: String,
    pub wrappers: Vec<EmittedWrapper>,
}

/// Collects the canonical replacements for one unit.
pub struct FileRewrite<'a> {
    map: SourceMap<'a>,
    plan: SplicePlan<'a>,
    wrappers: Vec<EmittedWrapper>,
}

impl<'a> FileRewrite<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            map: SourceMap::new(source),
            plan: SplicePlan::new(source),
            wrappers: Vec::new(),
        }
    }

    /// Replace the API include with the library header and one forward
    /// declaration per kernel used in the unit.
    pub fn header<'k, I>(&mut self, include: &HeaderInclude, kernels: I)
    where
        I: IntoIterator<Item = &'k KernelDescriptor>,
    {
        let mut f = CodeFormatter::new();
        f.writeln(&format!("#include \"{}\"", LIBRARY_HEADER));
        f.newline();
        f.writeln("//");
        f.writeln("// op_par_loop declarations");
        f.writeln("//");
        f.guarded("OPENACC", |f| f.guarded("__cplusplus", |f| f.writeln("extern \"C\" {")));
        for kernel in kernels {
            f.newline();
            f.write(&forward_declaration(kernel));
        }
        f.guarded("OPENACC", |f| f.guarded("__cplusplus", |f| f.writeln("}")));
        self.plan.replace(include.span.range(), f.finish());
    }

    /// Replace a constant declaration with its four-field form.
    pub fn constant(&mut self, decl: &ConstDecl, dim: &Resolved) {
        let text = format!(
            "op_decl_const2(\"{}\",{},{},{});",
            decl.name(),
            dim,
            decl.typ,
            decl.expr.trim()
        );
        self.plan.replace(decl.span.range(), text);
    }

    /// Replace a loop call with its wrapper call, aligned to the call's column.
    pub fn par_loop(&mut self, call: &LoopCall, args: &[ArgDescriptor]) {
        let indent = " ".repeat(self.map.column_of(call.span.start) + WRAPPER_PREFIX.len());
        let mut text = format!("{}{}({},{}", WRAPPER_PREFIX, call.kernel, call.label, call.set);
        for arg in args {
            text.push_str(",\n");
            text.push_str(&indent);
            text.push_str(&arg.to_string());
        }
        text.push_str(");");
        self.wrappers.push(EmittedWrapper { kernel: call.kernel.clone(), text: text.clone() });
        self.plan.replace(call.span.range(), text);
    }

    /// Redirect a library init call to its SOA variant.
    pub fn init(&mut self, init: &InitCall) {
        let name = match init.construct {
            Construct::MpiInit => "op_mpi_init_soa",
            _ => "op_init_soa",
        };
        self.plan.replace(init.span.range(), format!("{}({},1)", name, init.args));
    }

    /// Number of splice points collected so far.
    pub fn splice_count(&self) -> usize {
        self.plan.len()
    }

    /// Apply every splice and prefix the banner.
    pub fn finish(self, banner: &str) -> Result<RewrittenUnit, SpliceError> {
        let body = self.plan.apply()?;
        let mut text = String::with_capacity(banner.len() + body.len());
        text.push_str(banner);
        text.push_str(&body);
        Ok(RewrittenUnit { text, wrappers: self.wrappers })
    }
}

/// `void op_par_loop_<kernel>(char const *, op_set, op_arg, ...);`
pub fn forward_declaration(kernel: &KernelDescriptor) -> String {
    let mut line = format!("void {}{}(char const *, op_set", WRAPPER_PREFIX, kernel.name());
    if kernel.nargs() == 0 {
        line.push_str(");\n");
        return line;
    }
    line.push_str(",\n");
    for _ in 1..kernel.nargs() {
        line.push_str("  op_arg,\n");
    }
    line.push_str("  op_arg );\n");
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::decls::{extract_consts, find_api_header};
    use crate::frontend::extract_loops;
    use crate::ir::kernel::KernelBuilder;
    use crate::macros::MacroTable;

    #[test]
    fn test_plan_rejects_overlap() {
        let mut plan = SplicePlan::new("abcdef");
        plan.replace(1..4, "X");
        plan.replace(3..5, "Y");
        assert_eq!(plan.apply().unwrap_err().kind, SpliceErrorKind::Overlap);
    }

    #[test]
    fn test_plan_rejects_out_of_bounds_and_char_boundary() {
        let mut plan = SplicePlan::new("abc");
        plan.replace(2..9, "X");
        assert_eq!(plan.apply().unwrap_err().kind, SpliceErrorKind::OutOfBounds);

        let mut plan = SplicePlan::new("aé");
        plan.replace(2..3, "X");
        assert_eq!(plan.apply().unwrap_err().kind, SpliceErrorKind::CharBoundary);
    }

    #[test]
    fn test_plan_applies_in_order() {
        let mut plan = SplicePlan::new("0123456789");
        plan.replace(6..8, "B");
        plan.replace(1..3, "A");
        plan.replace(9..9, "C");
        assert_eq!(plan.apply().unwrap(), "0A345B8C9");
    }

    #[test]
    fn test_rewrite_unit() {
        let source = "#include \"op_seq.h\"\nint main() {\n  op_decl_const(1, \"double\", &gam);\n  op_par_loop(save, \"save\", cells,\n              op_arg_dat(p_q, -1, OP_ID, 4, \"double\", OP_READ),\n              op_arg_dat(p_qold, -1, OP_ID, 4, \"double\", OP_WRITE));\n}\n";
        let table = MacroTable::default();
        let call = extract_loops(source).remove(0).unwrap();
        let built = KernelBuilder::new(&table).build(&call);
        let decl = extract_consts(source).remove(0).unwrap();

        let mut rw = FileRewrite::new(source);
        rw.header(&find_api_header(source).unwrap(), [&built.descriptor]);
        rw.constant(&decl, &Resolved::Int(1));
        rw.par_loop(&call, &built.descriptor.args);
        assert_eq!(rw.splice_count(), 3);
        let out = rw.finish("// banner\n").unwrap();

        let expected = concat!(
            "// banner\n",
            "#include \"op_lib_cpp.h\"\n\n//\n// op_par_loop declarations\n//\n",
            "#ifdef OPENACC\n#ifdef __cplusplus\nextern \"C\" {\n#endif\n#endif\n",
            "\nvoid op_par_loop_save(char const *, op_set,\n  op_arg,\n  op_arg );\n",
            "#ifdef OPENACC\n#ifdef __cplusplus\n}\n#endif\n#endif\n",
            "\nint main() {\n",
            "  op_decl_const2(\"gam\",1,\"double\",&gam);\n",
            "  op_par_loop_save(\"save\",cells,\n",
            "              op_arg_dat(p_q,-1,OP_ID,4,\"double\",OP_READ),\n",
            "              op_arg_dat(p_qold,-1,OP_ID,4,\"double\",OP_WRITE));\n",
            "}\n",
        );
        assert_eq!(out.text, expected);
        assert_eq!(out.wrappers.len(), 1);
        assert_eq!(out.wrappers[0].kernel, "save");
    }

    #[test]
    fn test_init_redirect() {
        let source = "op_mpi_init(argc, argv, 2, MPI_COMM_WORLD, MPI_COMM_WORLD);";
        let init = crate::frontend::decls::extract_init_calls(source).remove(0).unwrap();
        let mut rw = FileRewrite::new(source);
        rw.init(&init);
        assert_eq!(
            rw.finish("").unwrap().text,
            "op_mpi_init_soa(argc, argv, 2, MPI_COMM_WORLD, MPI_COMM_WORLD,1);"
        );
    }
}
