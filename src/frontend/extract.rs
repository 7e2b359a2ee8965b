//! Fixed-arity argument extractors.
//!
//! Each extractor locates the parenthesized argument list after a keyword,
//! strips comments from that list only, splits it at top-level commas and
//! checks the field count required by the construct.

use crate::frontend::ast::RawArg;
use crate::frontend::brackets::{matching_close, split_top_level};
use crate::frontend::comments::strip_comments;
use crate::frontend::scanner::{skip_blank, Construct, Occurrence};
use crate::utils::errors::{ExtractError, ExtractErrorKind};
use crate::utils::location::Span;
use std::ops::Range;

/// A located call: keyword, parentheses and the raw argument text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite<'a> {
    /// Construct keyword
    pub construct: Construct,
    /// Offset of the keyword
    pub start: usize,
    /// Offset of the opening parenthesis
    pub open: usize,
    /// Offset of the closing parenthesis
    pub close: usize,
    /// Text strictly between the parentheses
    pub inner: &'a str,
}

impl<'a> CallSite<'a> {
    /// Locate the call whose keyword occurrence is `occ`.
    pub fn locate(text: &'a str, occ: Occurrence) -> Result<Self, ExtractError> {
        Self::after_name(text, occ.construct, occ.offset..occ.keyword_end())
    }

    /// Locate the call whose callee name spans `name`.
    pub fn after_name(text: &'a str, construct: Construct, name: Range<usize>) -> Result<Self, ExtractError> {
        let open = skip_blank(text, name.end);
        if text.as_bytes().get(open) != Some(&b'(') {
            return Err(ExtractError::new(
                ExtractErrorKind::MissingParen,
                format!("expected '(' after {}", &text[name.clone()]),
                Span::from_range(name),
            ));
        }
        let close = matching_close(text, open).map_err(|mut e| {
            e.message = format!("{}: {}", &text[name.clone()], e.message);
            e.span = Span::from_range(name.start..text.len());
            e
        })?;
        Ok(Self {
            construct,
            start: name.start,
            open,
            close,
            inner: &text[open + 1..close],
        })
    }

    /// Offset just past the `;` ending the statement this call heads.
    pub fn statement_end(&self, text: &str) -> Result<usize, ExtractError> {
        let semi = skip_blank(text, self.close + 1);
        if text.as_bytes().get(semi) == Some(&b';') {
            Ok(semi + 1)
        } else {
            Err(ExtractError::new(
                ExtractErrorKind::MissingTerminator,
                format!("{} call is not terminated by ';'", self.construct),
                self.span(),
            ))
        }
    }

    /// Span from the keyword through the closing parenthesis.
    pub fn span(&self) -> Span {
        Span::from_range(self.start..self.close + 1)
    }

    /// Comment-free, trimmed, top-level fields of the argument list.
    pub fn fields(&self) -> Vec<String> {
        split_fields(self.inner)
    }

    /// Fields of the argument list, which must number exactly `expected`.
    pub fn fields_exact(&self, expected: usize) -> Result<Vec<String>, ExtractError> {
        let fields = self.fields();
        if fields.len() != expected {
            return Err(ExtractError::new(
                ExtractErrorKind::Arity { expected, found: fields.len() },
                format!(
                    "Error parsing {}({}): must have {} arguments",
                    self.construct,
                    fields.join(","),
                    expected
                ),
                self.span(),
            ));
        }
        Ok(fields)
    }
}

/// Strip comments, split at top-level commas and trim each field.
pub fn split_fields(raw: &str) -> Vec<String> {
    let scratch = strip_comments(raw);
    split_top_level(&scratch)
        .into_iter()
        .map(|f| f.trim().to_string())
        .collect()
}

/// Extract the loop argument construct located at `site`.
pub fn extract_arg(site: &CallSite<'_>) -> Result<RawArg, ExtractError> {
    let expected = site.construct.arity().ok_or_else(|| {
        ExtractError::new(
            ExtractErrorKind::MissingParen,
            format!("{} is not a loop argument", site.construct),
            site.span(),
        )
    })?;
    let fields = site.fields_exact(expected)?;
    RawArg::from_fields(site.construct, fields).ok_or_else(|| {
        ExtractError::new(
            ExtractErrorKind::Arity { expected, found: 0 },
            format!("{} is not a loop argument", site.construct),
            site.span(),
        )
    })
}

/// Remove one layer of surrounding double quotes.
pub fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::DatFields;
    use crate::frontend::scanner::occurrences;

    fn arg_at_first(text: &str, c: Construct) -> Result<RawArg, ExtractError> {
        let occ = occurrences(text, &[c]).next().unwrap();
        CallSite::locate(text, occ).and_then(|site| extract_arg(&site))
    }

    #[test]
    fn test_extract_dat_with_comments() {
        let text = "op_arg_dat(p_q, -1, OP_ID, /* dim */ 4, \"double\", OP_READ)";
        let arg = arg_at_first(text, Construct::ArgDat).unwrap();
        assert_eq!(
            arg,
            RawArg::Dat(DatFields {
                dat: "p_q".into(),
                idx: "-1".into(),
                map: "OP_ID".into(),
                dim: "4".into(),
                typ: "\"double\"".into(),
                acc: "OP_READ".into(),
            })
        );
    }

    #[test]
    fn test_arity_error() {
        let text = "op_arg_gbl(&rms, 1, OP_INC)";
        let err = arg_at_first(text, Construct::ArgGbl).unwrap_err();
        assert_eq!(err.kind, ExtractErrorKind::Arity { expected: 4, found: 3 });
        assert!(err.message.contains("must have 4 arguments"));
    }

    #[test]
    fn test_nested_commas_are_one_field() {
        let text = "op_arg_gbl(max(a, b), 1, \"int\", OP_MAX)";
        match arg_at_first(text, Construct::ArgGbl).unwrap() {
            RawArg::Gbl(g) => assert_eq!(g.data, "max(a, b)"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_paren() {
        let text = "op_arg_dat;";
        let err = arg_at_first(text, Construct::ArgDat).unwrap_err();
        assert_eq!(err.kind, ExtractErrorKind::MissingParen);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"cells\""), "cells");
        assert_eq!(unquote("cells"), "cells");
    }
}
