//! Error types for matchql
//!
//! Every compile-time failure is fail-fast: the compiler never retries and
//! never hands back a partially rewritten tree.

use std::fmt;
use thiserror::Error;

/// A single error reported by the parse stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// 1-based line of the offending token
    pub line: usize,
    /// 1-based column of the offending token
    pub column: usize,
    /// Human-readable description
    pub message: String,
}

impl SyntaxError {
    /// Create a new syntax error at the given position
    pub fn new<S: Into<String>>(line: usize, column: usize, message: S) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

fn join_syntax_errors(errors: &[SyntaxError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The main error type for matchql operations
#[derive(Error, Debug)]
pub enum Error {
    // ========== Front-end Errors ==========
    #[error("Syntax error ({} error(s)): {}", .0.len(), join_syntax_errors(.0))]
    Syntax(Vec<SyntaxError>),

    // ========== Compilation Errors ==========
    #[error("Query compilation error: {0}")]
    QueryCompilation(String),

    #[error("Identifier {0} must be bound to a table alias")]
    UnboundIdentifier(String),

    #[error("Unsupported target '{target}' for {statement} statement")]
    UnsupportedTarget { statement: String, target: String },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    // ========== Execution Errors ==========
    #[error("Execution error: {message}")]
    Execution {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ========== Serialization Errors ==========
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ========== IO Errors ==========
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for matchql operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a backend failure, keeping the original cause as the error source
    pub fn execution<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Execution {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Returns true if the query text or tree has to be fixed by the caller
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::Syntax(_)
                | Error::QueryCompilation(_)
                | Error::UnboundIdentifier(_)
                | Error::UnsupportedTarget { .. }
        )
    }

    /// Returns true if this error marks a known limitation of the compiler
    pub fn is_compiler_limitation(&self) -> bool {
        matches!(self, Error::NotImplemented(_))
    }

    /// Syntax errors carried by this error, if any
    pub fn syntax_errors(&self) -> &[SyntaxError] {
        match self {
            Error::Syntax(errors) => errors,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
