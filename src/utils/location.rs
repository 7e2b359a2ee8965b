//! Source location tracking.
//!
//! Every construct the scanner finds is addressed by byte offsets into one
//! immutable snapshot of a file. [`SourceMap`] turns those offsets into
//! line/column pairs for diagnostics and for the column alignment the
//! rewriter needs.

use serde::{Serialize, Deserialize};
use std::fmt;
use std::ops::Range;

/// A position in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, in bytes)
    pub column: usize,
    /// Byte offset from start of file
    pub offset: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A byte range in a file, with the line and column of its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of start
    pub start: usize,
    /// Byte offset one past the end
    pub end: usize,
    /// Start line (1-indexed)
    pub line: usize,
    /// Start column (1-indexed)
    pub column: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self { start, end, line, column }
    }

    /// A span known only by offsets (line/column unknown).
    pub fn from_range(range: Range<usize>) -> Self {
        Self { start: range.start, end: range.end, line: 0, column: 0 }
    }

    /// Create a dummy span (for synthesized text).
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Shift the span by `base` bytes, for spans computed on a substring.
    pub fn offset_by(self, base: usize) -> Self {
        Self { start: self.start + base, end: self.end + base, ..self }
    }

    /// Byte range covered by the span.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Get the length of this span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "bytes {}..{}", self.start, self.end)
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Line index over a source snapshot.
#[derive(Debug, Clone)]
pub struct SourceMap<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceMap<'a> {
    /// Create a new source map.
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { source, line_starts }
    }

    /// Convert a byte offset to a source location.
    pub fn locate(&self, offset: usize) -> SourceLocation {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        SourceLocation::new(line + 1, offset - self.line_starts[line] + 1, offset)
    }

    /// Zero-based byte column of an offset.
    pub fn column_of(&self, offset: usize) -> usize {
        self.locate(offset).column - 1
    }

    /// Build a span for a byte range.
    pub fn span(&self, range: Range<usize>) -> Span {
        let loc = self.locate(range.start);
        Span::new(range.start, range.end, loc.line, loc.column)
    }

    /// Attach line/column information to an offset-only span.
    pub fn resolve(&self, span: Span) -> Span {
        self.span(span.range())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        assert_eq!(format!("{}", Span::new(4, 9, 2, 3)), "2:3");
        assert_eq!(format!("{}", Span::from_range(4..9)), "bytes 4..9");
    }

    #[test]
    fn test_source_map() {
        let map = SourceMap::new("line1\n  line2\nline3");

        let loc = map.locate(8); // 'l' of line2
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 3);
        assert_eq!(map.column_of(8), 2);
        assert_eq!(map.locate(100).offset, 19);
    }

    #[test]
    fn test_resolve_offset_span() {
        let map = SourceMap::new("a\nbc;");
        let span = map.resolve(Span::from_range(2..4));
        assert_eq!((span.line, span.column), (2, 1));
        assert_eq!(span.len(), 2);
    }
}
