//! Error types for the translator.
//!
//! Fatal conditions are [`TranslatorError`] values. Findings that must be
//! reported without stopping the run are recorded as [`Diagnostic`]s, which
//! carry the category ([`DiagnosticKind`]) they belong to.

use crate::utils::location::Span;
use thiserror::Error;
use std::fmt;
use std::path::PathBuf;

/// Top-level error type for a translation run.
#[derive(Error, Debug)]
pub enum TranslatorError {
    /// A fixed-arity construct could not be extracted
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// A rewrite plan was inconsistent with its source snapshot
    #[error("Splice error: {0}")]
    Splice(#[from] SpliceError),

    /// Two loop calls share a kernel name but not a signature
    #[error("incompatible redeclaration of kernel '{kernel}' in {file}")]
    RedeclarationConflict {
        /// Kernel name
        kernel: String,
        /// File containing the conflicting call
        file: PathBuf,
    },

    /// No implementation was found for one or more kernels
    #[error("declaration not found for kernel(s): {}", .kernels.join(", "))]
    DeclarationNotFound {
        /// Every unresolved kernel, in registry order
        kernels: Vec<String>,
    },

    /// Annotation calls were rejected because of malformed syntax
    #[error("{count} annotation call(s) were rejected; see the errors above")]
    RejectedCalls {
        /// Number of rejected calls across all files
        count: usize,
    },

    /// I/O failure on a specific path
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Internal translator error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TranslatorError {
    /// Process exit status the command line tool reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            TranslatorError::DeclarationNotFound { .. } => 2,
            _ => 1,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TranslatorError::Io { path: path.into(), source }
    }
}

/// Error while extracting a construct from source text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ExtractError {
    /// The error message
    pub message: String,
    /// Location of the offending construct
    pub span: Span,
    /// The kind of extraction error
    pub kind: ExtractErrorKind,
}

impl ExtractError {
    /// Create a new extraction error.
    pub fn new(kind: ExtractErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self { message: message.into(), span, kind }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractErrorKind {
    /// Wrong number of fields in a fixed-arity construct
    Arity {
        /// Required field count
        expected: usize,
        /// Field count found
        found: usize,
    },
    /// No opening parenthesis after a construct keyword
    MissingParen,
    /// Opening bracket without a matching close
    UnbalancedBracket,
    /// Offset outside the text or not on a bracket
    OutOfBounds,
    /// Statement has no terminating semicolon
    MissingTerminator,
}

/// Error in the meaning of an otherwise well-formed construct.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct SemanticError {
    /// The error message
    pub message: String,
    /// Zero-based argument position inside the loop call
    pub argument: usize,
    /// The kind of semantic error
    pub kind: SemanticErrorKind,
}

impl SemanticError {
    /// Create a new semantic error for the argument at `argument`.
    pub fn new(kind: SemanticErrorKind, message: impl Into<String>, argument: usize) -> Self {
        Self { message: message.into(), argument, kind }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (argument {})", self.message, self.argument)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// Write/ReadWrite on a global, or Max/Min on a dataset
    IllegalAccess,
    /// Access literal is not one of the known modes
    UnknownAccess,
    /// Direct dataset argument whose index is not -1
    InvalidDirectIndex,
}

/// Error raised when a rewrite plan does not fit its snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct SpliceError {
    /// The error message
    pub message: String,
    /// The kind of splice error
    pub kind: SpliceErrorKind,
}

impl fmt::Display for SpliceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceErrorKind {
    /// Two splice ranges overlap
    Overlap,
    /// A splice range ends past the snapshot
    OutOfBounds,
    /// A splice boundary falls inside a UTF-8 sequence
    CharBoundary,
}

/// Category of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Fixed-arity construct with the wrong field count
    Arity,
    /// Malformed call other than an arity mismatch
    Malformed,
    /// Access-mode or index violation
    Semantic,
    /// Repeated constant with a different type or dimension
    ConstantConflict,
    /// Repeated macro with a different body
    MacroConflict,
    /// Macro that could not be fully resolved
    UnresolvedMacro,
    /// Missing init/exit/partition call
    MissingAnnotation,
    /// Rewritten wrapper call does not parse back to its kernel
    RewriteMismatch,
}

/// A diagnostic message with severity level.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level
    pub severity: DiagnosticSeverity,
    /// Category
    pub kind: DiagnosticKind,
    /// Message
    pub message: String,
    /// File the diagnostic refers to (if any)
    pub file: Option<PathBuf>,
    /// Primary span
    pub span: Option<Span>,
    /// Additional notes
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    /// Note - informational message
    Note,
    /// Warning - translation continues
    Warning,
    /// Error - the construct is unusable
    Error,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, kind, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, kind, message)
    }

    /// Create a new note diagnostic.
    pub fn note(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Note, kind, message)
    }

    fn with_severity(severity: DiagnosticSeverity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            file: None,
            span: None,
            notes: Vec::new(),
        }
    }

    /// Attach the file the diagnostic refers to.
    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Add a span to the diagnostic.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Add a note to the diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Forward the diagnostic to the `log` facade at its severity.
    pub fn emit(&self) {
        match self.severity {
            DiagnosticSeverity::Error => log::error!("{}", self),
            DiagnosticSeverity::Warning => log::warn!("{}", self),
            DiagnosticSeverity::Note => log::info!("{}", self),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref file) = self.file {
            write!(f, "{}", file.display())?;
            if let Some(ref span) = self.span {
                write!(f, ":{}", span)?;
            }
            write!(f, ": ")?;
        }
        write!(f, "{}", self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {}", note)?;
        }
        Ok(())
    }
}

impl From<&ExtractError> for Diagnostic {
    fn from(err: &ExtractError) -> Self {
        let kind = match err.kind {
            ExtractErrorKind::Arity { .. } => DiagnosticKind::Arity,
            _ => DiagnosticKind::Malformed,
        };
        Diagnostic::error(kind, err.message.clone()).with_span(err.span)
    }
}

impl From<&SemanticError> for Diagnostic {
    fn from(err: &SemanticError) -> Self {
        Diagnostic::warning(DiagnosticKind::Semantic, err.to_string())
    }
}

/// Result type using TranslatorError.
pub type TranslateResult<T> = Result<T, TranslatorError>;
