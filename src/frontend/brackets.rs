//! Balanced-bracket scanning and top-level field splitting.

use crate::frontend::scanner::trivia_end;
use crate::utils::errors::{ExtractError, ExtractErrorKind};
use crate::utils::location::Span;

fn closing_for(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

/// Return the offset of the bracket closing the one at `open`.
///
/// Only the bracket kind found at `open` is counted. Brackets inside
/// comments and quoted literals are ignored.
pub fn matching_close(text: &str, open: usize) -> Result<usize, ExtractError> {
    let bytes = text.as_bytes();
    let open_byte = *bytes.get(open).ok_or_else(|| {
        ExtractError::new(
            ExtractErrorKind::OutOfBounds,
            format!("bracket offset {} is past the end of the text", open),
            Span::from_range(open..open),
        )
    })?;
    let close_byte = closing_for(open_byte).ok_or_else(|| {
        ExtractError::new(
            ExtractErrorKind::OutOfBounds,
            format!("expected an opening bracket at offset {}", open),
            Span::from_range(open..open + 1),
        )
    })?;

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if let Some(end) = trivia_end(bytes, i) {
            i = end;
            continue;
        }
        let b = bytes[i];
        if b == open_byte {
            depth += 1;
        } else if b == close_byte {
            depth -= 1;
            if depth == 0 {
                return Ok(i);
            }
        }
        i += 1;
    }

    Err(ExtractError::new(
        ExtractErrorKind::UnbalancedBracket,
        format!("no matching '{}' for '{}'", close_byte as char, open_byte as char),
        Span::from_range(open..bytes.len()),
    ))
}

/// Split `text` at commas that are not nested inside any bracket or literal.
///
/// Fields are returned untrimmed. An empty text yields one empty field.
pub fn split_top_level(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut fields = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(end) = trivia_end(bytes, i) {
            i = end;
            continue;
        }
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b',' if depth == 0 => {
                fields.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    fields.push(&text[start..]);
    fields
}
