//! Loop extractor.
//!
//! Finds every `op_par_loop` call in a unit and extracts its kernel name,
//! label, mesh set and its mixed-kind argument list in source order. The
//! same machinery parses the `op_par_loop_<kernel>` wrapper calls the
//! rewriter emits, so a rewritten call can be checked against its source.

use crate::frontend::ast::{LoopCall, RawArg};
use crate::frontend::extract::{extract_arg, split_fields, CallSite};
use crate::frontend::scanner::{occurrences, Construct, Identifiers};
use crate::utils::errors::{ExtractError, ExtractErrorKind};
use crate::utils::location::Span;

/// Prefix of the generated per-kernel wrapper functions.
pub const WRAPPER_PREFIX: &str = "op_par_loop_";

/// Extract every `op_par_loop` call in `text`, in source order.
///
/// Each element is the parsed call or the reason it was rejected.
pub fn extract_loops(text: &str) -> Vec<Result<LoopCall, ExtractError>> {
    let mut calls = Vec::new();
    let mut resume = 0;
    for occ in occurrences(text, &[Construct::ParLoop]) {
        if occ.offset < resume {
            continue;
        }
        let result = CallSite::locate(text, occ).and_then(|call| {
            let end = call.statement_end(text)?;
            resume = end;
            let (header, args) = parse_body(&call, 3)?;
            let mut header = header.into_iter();
            Ok(LoopCall {
                span: Span::from_range(call.start..end),
                kernel: header.next().unwrap_or_default(),
                label: header.next().unwrap_or_default(),
                set: header.next().unwrap_or_default(),
                args,
            })
        });
        calls.push(result);
    }
    calls
}

/// Extract every `op_par_loop_<kernel>(label, set, args...);` wrapper call.
///
/// Forward declarations (`void op_par_loop_x(...);`) are skipped.
pub fn extract_wrapper_calls(text: &str) -> Vec<Result<LoopCall, ExtractError>> {
    let mut calls = Vec::new();
    let mut resume = 0;
    let mut previous: Option<&str> = None;
    for (offset, ident) in Identifiers::new(text) {
        let after_void = previous == Some("void");
        previous = Some(ident);
        let kernel = match ident.strip_prefix(WRAPPER_PREFIX) {
            Some(k) if !k.is_empty() && offset >= resume && !after_void => k,
            _ => continue,
        };
        let result = CallSite::after_name(text, Construct::ParLoop, offset..offset + ident.len()).and_then(|call| {
            let end = call.statement_end(text)?;
            resume = end;
            let (header, args) = parse_body(&call, 2)?;
            let mut header = header.into_iter();
            Ok(LoopCall {
                span: Span::from_range(call.start..end),
                kernel: kernel.to_string(),
                label: header.next().unwrap_or_default(),
                set: header.next().unwrap_or_default(),
                args,
            })
        });
        calls.push(result);
    }
    calls
}

/// Split a loop call into its leading header fields and its argument constructs.
fn parse_body(call: &CallSite<'_>, header_len: usize) -> Result<(Vec<String>, Vec<RawArg>), ExtractError> {
    let fields = split_fields(call.inner);
    if fields.len() < header_len || fields[..header_len].iter().any(|f| f.is_empty()) {
        return Err(ExtractError::new(
            ExtractErrorKind::Arity { expected: header_len, found: fields.len() },
            format!(
                "op_par_loop call must start with {} non-empty fields (kernel, name, set)",
                header_len
            ),
            call.span(),
        ));
    }

    let base = call.open + 1;
    let mut args = Vec::new();
    let mut resume = 0;
    for occ in occurrences(call.inner, &Construct::LOOP_ARGS) {
        if occ.offset < resume {
            continue;
        }
        let site = CallSite::locate(call.inner, occ).map_err(|e| shifted(e, base))?;
        resume = site.close + 1;
        args.push(extract_arg(&site).map_err(|e| shifted(e, base))?);
    }

    let declared = fields.len() - header_len;
    if declared != args.len() {
        return Err(ExtractError::new(
            ExtractErrorKind::Arity { expected: declared, found: args.len() },
            format!(
                "op_par_loop({}) has {} argument fields but {} op_arg constructs",
                fields[0],
                declared,
                args.len()
            ),
            call.span(),
        ));
    }

    let header = fields.into_iter().take(header_len).collect();
    Ok((header, args))
}

fn shifted(mut err: ExtractError, base: usize) -> ExtractError {
    err.span = err.span.offset_by(base);
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    const RES_CALC: &str = r#"
    op_par_loop(res_calc, "res_calc", edges,
                op_arg_dat(p_x, 0, pedge, 2, "double", OP_READ),
                op_arg_dat(p_x, 1, pedge, 2, "double", OP_READ),
                op_opt_arg_dat(with_q, p_q, 0, pecell, 4, "double", OP_READ),
                op_arg_gbl(&rms, 1, "double", OP_INC), // reduction
                op_arg_dat(p_res, 1, pecell, 4, "double", OP_INC));
"#;

    #[test]
    fn test_extract_mixed_arguments_in_order() {
        let calls = extract_loops(RES_CALC);
        assert_eq!(calls.len(), 1);
        let call = calls[0].as_ref().unwrap();
        assert_eq!(call.kernel, "res_calc");
        assert_eq!(call.label, "\"res_calc\"");
        assert_eq!(call.set, "edges");
        let kinds: Vec<Construct> = call.args.iter().map(RawArg::construct).collect();
        assert_eq!(
            kinds,
            vec![
                Construct::ArgDat,
                Construct::ArgDat,
                Construct::OptArgDat,
                Construct::ArgGbl,
                Construct::ArgDat,
            ]
        );
        assert_eq!(&RES_CALC[call.span.range()][..11], "op_par_loop");
        assert!(RES_CALC[call.span.range()].ends_with("OP_INC));"));
    }

    #[test]
    fn test_commented_loop_is_ignored() {
        let text = "// op_par_loop(a, \"a\", s, op_arg_gbl(&x,1,\"int\",OP_READ));\n";
        assert!(extract_loops(text).is_empty());
    }

    #[test]
    fn test_bad_argument_rejects_call_only() {
        let text = r#"
            op_par_loop(bad, "bad", cells, op_arg_dat(p_q, -1, OP_ID, 4, OP_READ));
            op_par_loop(good, "good", cells, op_arg_dat(p_q, -1, OP_ID, 4, "double", OP_READ));
        "#;
        let calls = extract_loops(text);
        assert_eq!(calls.len(), 2);
        let err = calls[0].as_ref().unwrap_err();
        assert_eq!(err.kind, ExtractErrorKind::Arity { expected: 6, found: 5 });
        assert_eq!(&text[err.span.start..err.span.start + 10], "op_arg_dat");
        assert_eq!(calls[1].as_ref().unwrap().kernel, "good");
    }

    #[test]
    fn test_unrecognized_argument_field() {
        let text = r#"op_par_loop(k, "k", cells, op_arg_gbl(&x, 1, "int", OP_READ), extra_arg);"#;
        let err = extract_loops(text).remove(0).unwrap_err();
        assert_eq!(err.kind, ExtractErrorKind::Arity { expected: 2, found: 1 });
    }

    #[test]
    fn test_missing_terminator() {
        let text = r#"op_par_loop(k, "k", cells, op_arg_gbl(&x, 1, "int", OP_READ)) x"#;
        let err = extract_loops(text).remove(0).unwrap_err();
        assert_eq!(err.kind, ExtractErrorKind::MissingTerminator);
    }

    #[test]
    fn test_wrapper_calls_skip_declarations() {
        let text = "void op_par_loop_save(char const *, op_set,\n  op_arg );\n\
                    op_par_loop_save(\"save\",cells,\n    op_arg_dat(p_q,-1,OP_ID,4,\"double\",OP_READ));";
        let calls = extract_wrapper_calls(text);
        assert_eq!(calls.len(), 1);
        let call = calls[0].as_ref().unwrap();
        assert_eq!(call.kernel, "save");
        assert_eq!(call.label, "\"save\"");
        assert_eq!(call.set, "cells");
        assert_eq!(call.nargs(), 1);
    }
}
