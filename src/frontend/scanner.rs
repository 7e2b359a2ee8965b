//! Construct scanner for annotated host source.
//!
//! This is the only place that knows how host-language text is tokenized.
//! It walks a snapshot once, skipping comments, quoted literals and numeric
//! literals, and yields identifiers with their byte offsets. Everything above
//! it (extractors, IR builder, rewriter) works with offsets into the same
//! snapshot, so a real tokenizer can replace this module without touching
//! those layers.

use unicode_xid::UnicodeXID;
use std::fmt;

/// Annotation vocabulary recognized in host source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
    /// `op_par_loop(kernel, "label", set, args...)`
    ParLoop,
    /// `op_arg_dat(dat, idx, map, dim, "type", acc)`
    ArgDat,
    /// `op_opt_arg_dat(guard, dat, idx, map, dim, "type", acc)`
    OptArgDat,
    /// `op_arg_gbl(data, dim, "type", acc)`
    ArgGbl,
    /// `op_decl_const(dim, "type", &name)`
    DeclConst,
    /// `op_decl_set(size, name)`
    DeclSet,
    /// `op_decl_set_hdf5(file, "name")`
    DeclSetHdf5,
    /// `op_init(...)`
    Init,
    /// `op_mpi_init(...)`
    MpiInit,
}

impl Construct {
    /// Every construct, for lookups.
    pub const ALL: [Construct; 9] = [
        Construct::ParLoop,
        Construct::ArgDat,
        Construct::OptArgDat,
        Construct::ArgGbl,
        Construct::DeclConst,
        Construct::DeclSet,
        Construct::DeclSetHdf5,
        Construct::Init,
        Construct::MpiInit,
    ];

    /// Argument constructs that may appear inside a loop call.
    pub const LOOP_ARGS: [Construct; 3] = [Construct::ArgDat, Construct::OptArgDat, Construct::ArgGbl];

    /// Keyword spelling in source.
    pub fn keyword(self) -> &'static str {
        match self {
            Construct::ParLoop => "op_par_loop",
            Construct::ArgDat => "op_arg_dat",
            Construct::OptArgDat => "op_opt_arg_dat",
            Construct::ArgGbl => "op_arg_gbl",
            Construct::DeclConst => "op_decl_const",
            Construct::DeclSet => "op_decl_set",
            Construct::DeclSetHdf5 => "op_decl_set_hdf5",
            Construct::Init => "op_init",
            Construct::MpiInit => "op_mpi_init",
        }
    }

    /// Number of comma-separated fields the construct takes, if fixed.
    pub fn arity(self) -> Option<usize> {
        match self {
            Construct::ArgDat => Some(6),
            Construct::OptArgDat => Some(7),
            Construct::ArgGbl => Some(4),
            Construct::DeclConst => Some(3),
            Construct::DeclSet | Construct::DeclSetHdf5 => Some(2),
            Construct::ParLoop | Construct::Init | Construct::MpiInit => None,
        }
    }

    /// Look up the construct spelled by an identifier.
    pub fn from_identifier(ident: &str) -> Option<Construct> {
        Construct::ALL.iter().copied().find(|c| c.keyword() == ident)
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One keyword occurrence in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// Construct spelled at this position
    pub construct: Construct,
    /// Byte offset of the first keyword character
    pub offset: usize,
}

impl Occurrence {
    /// Byte offset just past the keyword.
    pub fn keyword_end(&self) -> usize {
        self.offset + self.construct.keyword().len()
    }
}

/// If a comment starts at `pos`, return the offset just past it.
///
/// Line comments end before their newline; an unterminated block comment
/// runs to the end of the text.
pub(crate) fn comment_end(bytes: &[u8], pos: usize) -> Option<usize> {
    if bytes.get(pos) != Some(&b'/') {
        return None;
    }
    match bytes.get(pos + 1) {
        Some(b'/') => {
            let end = bytes[pos..].iter().position(|&b| b == b'\n').map_or(bytes.len(), |n| pos + n);
            Some(end)
        }
        Some(b'*') => {
            let mut i = pos + 2;
            while i + 1 < bytes.len() {
                if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                    return Some(i + 2);
                }
                i += 1;
            }
            Some(bytes.len())
        }
        _ => None,
    }
}

/// If a quoted literal starts at `pos`, return the offset just past its
/// closing quote. An unterminated literal stops at the end of its line.
pub(crate) fn literal_end(bytes: &[u8], pos: usize) -> Option<usize> {
    let quote = *bytes.get(pos)?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return Some(i),
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    Some(bytes.len())
}

/// If comment or literal trivia starts at `pos`, return where it ends.
pub(crate) fn trivia_end(bytes: &[u8], pos: usize) -> Option<usize> {
    comment_end(bytes, pos).or_else(|| literal_end(bytes, pos))
}

/// Iterator over identifiers outside comments and literals.
#[derive(Debug, Clone)]
pub struct Identifiers<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Identifiers<'a> {
    /// Scan identifiers in `text` from the start.
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn identifier_end(&self, start: usize) -> usize {
        self.text[start..]
            .char_indices()
            .find(|&(i, c)| !(c.is_xid_continue() || (i == 0 && c == '_')))
            .map_or(self.text.len(), |(i, _)| start + i)
    }
}

impl<'a> Iterator for Identifiers<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            if let Some(end) = trivia_end(bytes, self.pos) {
                self.pos = end;
                continue;
            }
            if b.is_ascii_digit() {
                // numeric literal, including suffixes and exponents
                while self.pos < bytes.len()
                    && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'.' || bytes[self.pos] == b'_')
                {
                    self.pos += 1;
                }
                continue;
            }
            let c = match self.text[self.pos..].chars().next() {
                Some(c) => c,
                None => break,
            };
            if c == '_' || c.is_xid_start() {
                let start = self.pos;
                let end = self.identifier_end(start);
                self.pos = end;
                return Some((start, &self.text[start..end]));
            }
            self.pos += c.len_utf8();
        }
        None
    }
}

/// Lazy, position-ordered sequence of keyword occurrences.
///
/// One forward pass yields every wanted construct in source order, so
/// interleaved argument kinds come out left to right without rescanning.
#[derive(Debug, Clone)]
pub struct Occurrences<'a, 'w> {
    idents: Identifiers<'a>,
    wanted: &'w [Construct],
}

impl<'a, 'w> Occurrences<'a, 'w> {
    /// Scan `text` for the constructs in `wanted`.
    pub fn new(text: &'a str, wanted: &'w [Construct]) -> Self {
        Self { idents: Identifiers::new(text), wanted }
    }
}

impl<'a, 'w> Iterator for Occurrences<'a, 'w> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        for (offset, ident) in self.idents.by_ref() {
            if let Some(construct) = Construct::from_identifier(ident) {
                if self.wanted.contains(&construct) {
                    return Some(Occurrence { construct, offset });
                }
            }
        }
        None
    }
}

/// Find occurrences of the given constructs in `text`.
pub fn occurrences<'a, 'w>(text: &'a str, wanted: &'w [Construct]) -> Occurrences<'a, 'w> {
    Occurrences::new(text, wanted)
}

/// Offset of the first non-trivia character at or after `pos`.
///
/// Whitespace and comments are skipped; quoted literals are not.
pub fn skip_blank(text: &str, mut pos: usize) -> usize {
    let bytes = text.as_bytes();
    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
        } else if let Some(end) = comment_end(bytes, pos) {
            pos = end;
        } else {
            break;
        }
    }
    pos
}

/// Offset of the first `byte` at or after `pos` outside comments and literals.
pub fn find_outside_trivia(text: &str, pos: usize, byte: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i < bytes.len() {
        if let Some(end) = trivia_end(bytes, i) {
            i = end;
        } else if bytes[i] == byte {
            return Some(i);
        } else {
            i += 1;
        }
    }
    None
}
