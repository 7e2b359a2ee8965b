//! Macro harvesting and evaluation.
//!
//! Object-like `#define NAME BODY` lines are harvested from every input file
//! before any unit is processed, so a dimension may use a macro defined later
//! or in another file. Resolution is explicit and order independent:
//!
//! 1. Build the dependency graph (macro → macros named in its body).
//! 2. Mark every macro that can reach itself as cyclic. Cyclic macros are
//!    never expanded and stay symbolic.
//! 3. Resolve the remaining macros depth-first with memoization, folding a
//!    body to an integer whenever it reduces to integer arithmetic.

use crate::frontend::comments::strip_comments;
use crate::frontend::scanner::Identifiers;
use crate::utils::errors::{Diagnostic, DiagnosticKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

static DEFINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*#[ \t]*define[ \t]+([A-Za-z_][A-Za-z0-9_]*)[ \t]+([^\n]*)$").expect("valid define regex")
});

/// A dimension or index after macro evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Resolved {
    /// Folded integer value
    Int(i64),
    /// Expression that could not be reduced to an integer
    Expr(String),
}

impl Resolved {
    /// Fold `text` if possible, otherwise keep it (trimmed) as an expression.
    pub fn from_text(text: &str) -> Self {
        match fold(text) {
            Some(v) => Resolved::Int(v),
            None => Resolved::Expr(text.trim().to_string()),
        }
    }

    /// Integer value, if folded.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Resolved::Int(v) => Some(*v),
            Resolved::Expr(_) => None,
        }
    }

    /// True when the value is not a known integer.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Resolved::Expr(_))
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Int(v) => write!(f, "{}", v),
            Resolved::Expr(s) => f.write_str(s),
        }
    }
}

/// Service that turns dimension and index expressions into values.
pub trait MacroResolver {
    /// Substitute known macros in `expr` and fold the result.
    fn evaluate(&self, expr: &str) -> Resolved;
}

/// Resolved macro values, read-only after harvesting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MacroTable {
    values: BTreeMap<String, String>,
    /// Cyclic macros; never expanded, so evaluation is idempotent
    #[serde(skip)]
    symbolic: BTreeSet<String>,
}

impl MacroTable {
    /// Build a table from already-resolved values.
    pub fn from_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            symbolic: BTreeSet::new(),
        }
    }

    /// Resolved value of a macro.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of macros.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no macros were harvested.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when `name` is part of a definition cycle.
    pub fn is_cyclic(&self, name: &str) -> bool {
        self.symbolic.contains(name)
    }

    /// Replace every acyclic macro identifier in `expr` by its resolved value.
    pub fn substitute(&self, expr: &str) -> String {
        substitute_with(expr, |ident| {
            if self.symbolic.contains(ident) {
                None
            } else {
                self.values.get(ident).cloned()
            }
        })
    }
}

impl MacroResolver for MacroTable {
    fn evaluate(&self, expr: &str) -> Resolved {
        Resolved::from_text(&self.substitute(expr))
    }
}

#[derive(Debug, Clone)]
struct Definition {
    body: String,
    origin: PathBuf,
}

/// Collects `#define`s across input files.
#[derive(Debug, Default)]
pub struct MacroHarvester {
    defs: BTreeMap<String, Definition>,
    diagnostics: Vec<Diagnostic>,
}

impl MacroHarvester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Object-like definitions in `text`, in source order.
    ///
    /// Function-like macros, empty bodies and multi-line bodies are skipped.
    pub fn definitions(text: &str) -> Vec<(String, String)> {
        let scratch = strip_comments(text);
        DEFINE_RE
            .captures_iter(&scratch)
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str();
                let body = caps.get(2)?.as_str().trim();
                (!body.is_empty() && !body.ends_with('\\')).then(|| (name.to_string(), body.to_string()))
            })
            .collect()
    }

    /// Harvest definitions from one file. The first definition of a name wins.
    pub fn harvest(&mut self, text: &str, origin: &Path) {
        for (name, body) in Self::definitions(text) {
            match self.defs.get(&name) {
                Some(existing) if existing.body != body => {
                    let diag = Diagnostic::warning(
                        DiagnosticKind::MacroConflict,
                        format!(
                            "Have found two different definitions for macro '{}': '{}' and '{}'. Using the first definition.",
                            name, existing.body, body
                        ),
                    )
                    .in_file(origin)
                    .with_note(format!("first defined in {}", existing.origin.display()));
                    self.diagnostics.push(diag);
                }
                Some(_) => {}
                None => {
                    self.defs.insert(name, Definition { body, origin: origin.to_path_buf() });
                }
            }
        }
    }

    /// Resolve every definition and return the table plus any diagnostics.
    pub fn finish(self) -> (MacroTable, Vec<Diagnostic>) {
        let MacroHarvester { defs, mut diagnostics } = self;
        let deps = dependencies(&defs);
        let cyclic = cyclic_macros(&deps);

        for name in &cyclic {
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::UnresolvedMacro,
                    format!("macro '{}' is defined in terms of itself and is left unexpanded", name),
                )
                .in_file(&defs[name.as_str()].origin),
            );
        }

        let mut resolved = BTreeMap::new();
        for (name, def) in &defs {
            if cyclic.contains(name) {
                resolved.insert(name.clone(), def.body.clone());
            } else {
                resolve(name, &defs, &cyclic, &mut resolved);
            }
        }
        let table = MacroTable {
            values: resolved,
            symbolic: cyclic,
        };
        (table, diagnostics)
    }
}

fn dependencies(defs: &BTreeMap<String, Definition>) -> HashMap<&str, BTreeSet<&str>> {
    defs.iter()
        .map(|(name, def)| {
            let used = Identifiers::new(&def.body)
                .filter_map(|(_, ident)| defs.get_key_value(ident).map(|(k, _)| k.as_str()))
                .collect();
            (name.as_str(), used)
        })
        .collect()
}

/// Macros that can reach themselves through the dependency graph.
fn cyclic_macros(deps: &HashMap<&str, BTreeSet<&str>>) -> BTreeSet<String> {
    let mut cyclic = BTreeSet::new();
    for &start in deps.keys() {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = deps[start].iter().copied().collect();
        while let Some(node) = stack.pop() {
            if node == start {
                cyclic.insert(start.to_string());
                break;
            }
            if seen.insert(node) {
                stack.extend(deps.get(node).into_iter().flatten().copied());
            }
        }
    }
    cyclic
}

fn resolve(
    name: &str,
    defs: &BTreeMap<String, Definition>,
    cyclic: &BTreeSet<String>,
    resolved: &mut BTreeMap<String, String>,
) -> String {
    if cyclic.contains(name) {
        return name.to_string();
    }
    if let Some(value) = resolved.get(name) {
        return value.clone();
    }
    let body = &defs[name].body;
    let text = substitute_with(body, |ident| {
        defs.contains_key(ident).then(|| resolve(ident, defs, cyclic, resolved))
    });
    let value = fold(&text).map_or(text, |v| v.to_string());
    resolved.insert(name.to_string(), value.clone());
    value
}

fn substitute_with<F>(text: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for (offset, ident) in Identifiers::new(text) {
        if let Some(value) = lookup(ident) {
            out.push_str(&text[copied..offset]);
            out.push_str(&value);
            copied = offset + ident.len();
        }
    }
    out.push_str(&text[copied..]);
    out
}

/// Fold integer arithmetic (`+ - * / %`, parentheses, unary signs).
///
/// Returns `None` for anything else, or on overflow or division by zero.
pub fn fold(expr: &str) -> Option<i64> {
    let mut folder = Folder { s: expr.as_bytes(), pos: 0 };
    let value = folder.sum()?;
    folder.skip_ws();
    (folder.pos == folder.s.len()).then_some(value)
}

struct Folder<'a> {
    s: &'a [u8],
    pos: usize,
}

impl<'a> Folder<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.s.len() && self.s[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.s.get(self.pos).copied()
    }

    fn sum(&mut self) -> Option<i64> {
        let mut value = self.product()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.product()?;
            value = if op == b'+' { value.checked_add(rhs)? } else { value.checked_sub(rhs)? };
        }
        Some(value)
    }

    fn product(&mut self) -> Option<i64> {
        let mut value = self.unary()?;
        while let Some(op @ (b'*' | b'/' | b'%')) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                b'*' => value.checked_mul(rhs)?,
                b'/' => value.checked_div(rhs)?,
                _ => value.checked_rem(rhs)?,
            };
        }
        Some(value)
    }

    fn unary(&mut self) -> Option<i64> {
        match self.peek()? {
            b'-' => {
                self.pos += 1;
                self.unary()?.checked_neg()
            }
            b'+' => {
                self.pos += 1;
                self.unary()
            }
            b'(' => {
                self.pos += 1;
                let value = self.sum()?;
                (self.peek()? == b')').then(|| self.pos += 1)?;
                Some(value)
            }
            b if b.is_ascii_digit() => self.number(),
            _ => None,
        }
    }

    fn number(&mut self) -> Option<i64> {
        let start = self.pos;
        while self.pos < self.s.len() && self.s[self.pos].is_ascii_alphanumeric() {
            self.pos += 1;
        }
        let literal = std::str::from_utf8(&self.s[start..self.pos]).ok()?;
        let digits = literal.trim_end_matches(['u', 'U', 'l', 'L']);
        if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).ok()
        } else {
            digits.parse().ok()
        }
    }
}
