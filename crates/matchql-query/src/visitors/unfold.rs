//! Array-of-scalars addressing for the JSON server backend

use crate::ast::{ColumnReference, ColumnType};
use crate::visit::VisitorMut;
use matchql_core::{keywords, CompilerConfig, Error, Result};
use std::collections::BTreeSet;

/// Appends `*` and `_value` to every non-flat `alias.property`, so
/// `N_0.name` addresses `N_0.name.*._value`
#[derive(Debug, Clone)]
pub struct StringArrayUnfoldRewriter {
    flat_properties: BTreeSet<String>,
    skip_tables: BTreeSet<String>,
}

impl StringArrayUnfoldRewriter {
    pub fn new(flat_properties: BTreeSet<String>) -> Self {
        Self {
            flat_properties,
            skip_tables: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            flat_properties: config.effective_flat_properties(),
            skip_tables: config.skip_tables.clone(),
        }
    }

    pub fn add_skip_table(&mut self, alias: &str) {
        self.skip_tables.insert(alias.to_string());
    }
}

impl VisitorMut for StringArrayUnfoldRewriter {
    fn visit_column(&mut self, column: &mut ColumnReference) -> Result<()> {
        if column.column_type == ColumnType::Wildcard {
            return Ok(());
        }

        let parts = &column.identifier.parts;
        if parts.len() != 2 {
            return Err(Error::QueryCompilation(format!(
                "Identifier {} should be bound to a table",
                column.identifier
            )));
        }
        if self.skip_tables.contains(&parts[0]) || self.flat_properties.contains(&parts[1]) {
            return Ok(());
        }

        column.add_identifier(keywords::STAR);
        column.add_identifier(keywords::PROPERTY_VALUE);
        Ok(())
    }
}
