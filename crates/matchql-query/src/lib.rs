//! matchql Query Compiler
//!
//! Compiles SQL-like scripts with a MATCH clause into scripts for a
//! relational or document-style graph backend.
//!
//! # Overview
//!
//! The pipeline is:
//! - Lexing and error-collecting parsing into a syntax tree
//! - Table classification and aggregation-block partitioning
//! - Pattern-graph construction with connected components
//! - Predicate placement and backend-specific rewrites
//! - Statement dispatch and script emission

pub mod ast;
pub mod block;
pub mod classifier;
pub mod compiler;
pub mod executor;
pub mod lexer;
pub mod parser;
pub mod pattern;
pub mod planner;
pub mod union_find;
pub mod visit;
pub mod visitors;

pub use ast::{Script, Statement, StatementKind};
pub use block::{partition_blocks, AggregationBlock};
pub use classifier::{classify_from, classify_tables};
pub use compiler::{dispatch, CompilationOutput, Compiler, StatementScript, StatementTarget};
pub use executor::{ExecutionStats, StatementExecutor};
pub use lexer::{tokenize, Token};
pub use parser::{parse, parse_statement};
pub use pattern::{ConnectedComponent, MatchEdge, MatchGraph, MatchNode};
pub use planner::{SelectPlan, SelectPlanner};
pub use union_find::DisjointSet;
pub use visit::{rewrite, Visitor, VisitorMut, Walkable};

// Type alias for lexer (uses logos::Lexer)
pub type QueryLexer<'a> = logos::Lexer<'a, Token>;
