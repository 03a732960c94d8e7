//! Predicate and column rewrite visitors
//!
//! Each visitor is a single pass over the fragment it is applied to. Rewriting
//! visitors are meant to be driven through [`crate::visit::rewrite`], which
//! only commits a fully rewritten copy.

pub mod boolean;
pub mod columns;
pub mod encode;
pub mod runtime;
pub mod subscript;
pub mod unfold;

pub use boolean::BooleanLiteralNormalizer;
pub use columns::{adjacency_column, referenced_tables, AccessedColumnCollector, AccessedColumns};
pub use encode::{decode, encode, NodePredicateEncoder};
pub use runtime::{needs_runtime, RuntimeFunctionCounter};
pub use subscript::SubscriptIdentifierConverter;
pub use unfold::StringArrayUnfoldRewriter;
