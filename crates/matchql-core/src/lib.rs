//! matchql Core Library
//!
//! This crate provides the error handling, configuration and reserved
//! keywords shared by the matchql compiler crates.
//!
//! # Modules
//!
//! - `error` - Error types and result aliases
//! - `config` - Compiler configuration and target backends
//! - `keywords` - Reserved names that are part of the storage wire contract

pub mod config;
pub mod error;
pub mod keywords;

pub use config::{Backend, CompilerConfig};
pub use error::{Error, Result, SyntaxError};
