//! matchql - graph-pattern-aware SQL compiler
//!
//! This is the main library crate that re-exports all matchql components.

pub use matchql_core as core;
pub use matchql_query as query;

// Re-export commonly used types
pub use matchql_core::{Backend, CompilerConfig, Error, Result, SyntaxError};

pub use matchql_query::{
    parse, CompilationOutput, Compiler, ExecutionStats, MatchGraph, Script, SelectPlan, StatementExecutor,
    StatementScript, StatementTarget,
};
