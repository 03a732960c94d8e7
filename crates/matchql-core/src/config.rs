//! Compiler configuration

use crate::error::{Error, Result};
use crate::keywords;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Storage representation the compiler targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Flat relational columns: the rewritten tree is serialized back to text
    Relational,
    /// Nested document properties addressed through encoded names
    DocumentDb,
    /// Nested document properties stored as arrays of scalars
    JsonServer,
}

impl Backend {
    /// Returns true if the backend stores properties as nested documents
    pub fn is_document(&self) -> bool {
        matches!(self, Backend::DocumentDb | Backend::JsonServer)
    }
}

/// Compiler configuration
///
/// The property and table sets are snapshotted by every visitor that reads
/// them, so a config can be shared across concurrent compilations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Target backend
    pub backend: Backend,

    /// Partition key of the document collection, stored flat when set
    pub partition_key: Option<String>,

    /// Additional properties stored as top-level scalars
    pub flat_properties: BTreeSet<String>,

    /// Table aliases whose column references are never rewritten
    pub skip_tables: BTreeSet<String>,

    /// Emit pretty-printed JSON scripts
    pub pretty_scripts: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Relational,
            partition_key: None,
            flat_properties: BTreeSet::new(),
            skip_tables: BTreeSet::new(),
            pretty_scripts: false,
        }
    }
}

impl CompilerConfig {
    /// Create a configuration for the given backend
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            ..Default::default()
        }
    }

    /// Create configuration for a relational backend
    pub fn for_relational() -> Self {
        Self::new(Backend::Relational)
    }

    /// Create configuration for a document backend with a partition key
    pub fn for_document_db<S: Into<String>>(partition_key: Option<S>) -> Self {
        Self {
            backend: Backend::DocumentDb,
            partition_key: partition_key.map(Into::into),
            ..Default::default()
        }
    }

    /// Create configuration for the JSON server backend
    pub fn for_json_server() -> Self {
        Self::new(Backend::JsonServer)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            Error::Configuration(format!("invalid config file {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded compiler config from {}", path.display());
        Ok(config)
    }

    /// Builder: set the partition key
    pub fn partition_key(mut self, key: &str) -> Self {
        self.partition_key = Some(key.to_string());
        self
    }

    /// Builder: add a flat property
    pub fn flat_property(mut self, property: &str) -> Self {
        self.flat_properties.insert(property.to_string());
        self
    }

    /// Builder: add a table alias that rewrites must leave untouched
    pub fn skip_table(mut self, alias: &str) -> Self {
        self.skip_tables.insert(alias.to_string());
        self
    }

    /// Builder: pretty-print emitted scripts
    pub fn pretty(mut self) -> Self {
        self.pretty_scripts = true;
        self
    }

    /// The full flat-property set: record id, label, partition key and extras
    pub fn effective_flat_properties(&self) -> BTreeSet<String> {
        let mut set: BTreeSet<String> = [keywords::NODE_ID, keywords::LABEL]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(key) = &self.partition_key {
            set.insert(key.clone());
        }
        set.extend(self.flat_properties.iter().cloned());
        set
    }
}
