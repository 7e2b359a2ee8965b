//! Comment-aware scratch view.
//!
//! The scratch copy drops every comment and keeps quoted literals verbatim.
//! Its offsets do not line up with the original text, so it is only used for
//! counting and field splitting, never for anything the rewriter consumes.

use crate::frontend::scanner::{comment_end, literal_end};

/// Remove `//` and `/* */` comments from `text`.
pub fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(end) = comment_end(bytes, i) {
            out.push_str(&text[copied..i]);
            i = end;
            copied = end;
        } else if let Some(end) = literal_end(bytes, i) {
            i = end;
        } else {
            i += 1;
        }
    }
    out.push_str(&text[copied..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line_and_block() {
        let text = "a, // first\nb /* second */, c";
        assert_eq!(strip_comments(text), "a, \nb , c");
    }

    #[test]
    fn test_literals_kept() {
        let text = r#"p_x, "http://a/*b*/", '/'"#;
        assert_eq!(strip_comments(text), text);
    }

    #[test]
    fn test_unterminated_block() {
        assert_eq!(strip_comments("x /* open"), "x ");
    }
}
