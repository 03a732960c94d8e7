//! Accessed-column collection

use crate::ast::{ColumnReference, ColumnType, EdgeType, MatchPath};
use crate::visit::{Visitor, Walkable};
use matchql_core::{keywords, Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Columns a fragment reads, per target alias
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessedColumns {
    /// Target alias → referenced column names; aliases with no reference are absent
    pub columns: BTreeMap<String, BTreeSet<String>>,
    /// False once a column of a non-target alias was seen
    pub only_target_referenced: bool,
}

impl AccessedColumns {
    pub fn get(&self, alias: &str) -> Option<&BTreeSet<String>> {
        self.columns.get(alias)
    }
}

/// Synthetic adjacency column read by a path source for `edge_type`
pub fn adjacency_column(edge_type: EdgeType) -> &'static str {
    match edge_type {
        EdgeType::Out => keywords::OUT_ADJACENCY_LIST,
        EdgeType::In => keywords::IN_ADJACENCY_LIST,
        EdgeType::Both => keywords::BOTH_ADJACENCY_LIST,
    }
}

/// Collects the columns a fragment references for a set of target aliases
///
/// A column with no table alias is an error. Wildcards are ignored.
pub struct AccessedColumnCollector {
    targets: BTreeSet<String>,
    columns: BTreeMap<String, BTreeSet<String>>,
    only_target_referenced: bool,
}

impl AccessedColumnCollector {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            columns: BTreeMap::new(),
            only_target_referenced: true,
        }
    }

    /// Walk `fragment` and return what it accessed
    pub fn collect<W: Walkable + ?Sized>(mut self, fragment: &W) -> Result<AccessedColumns> {
        fragment.accept(&mut self)?;
        Ok(self.finish())
    }

    fn finish(self) -> AccessedColumns {
        AccessedColumns {
            columns: self.columns,
            only_target_referenced: self.only_target_referenced,
        }
    }

    fn record(&mut self, alias: &str, column: &str) {
        self.columns
            .entry(alias.to_string())
            .or_default()
            .insert(column.to_string());
    }
}

impl Visitor for AccessedColumnCollector {
    fn visit_column(&mut self, column: &ColumnReference) -> Result<()> {
        if column.column_type == ColumnType::Wildcard {
            return Ok(());
        }

        let Some(alias) = column.table_reference() else {
            return Err(Error::UnboundIdentifier(column.column_name().to_string()));
        };

        if self.targets.contains(alias) {
            let name = column.column_name().to_string();
            self.record(alias, &name);
        } else {
            self.only_target_referenced = false;
        }
        Ok(())
    }

    fn visit_match_path(&mut self, path: &MatchPath) -> Result<()> {
        for step in &path.steps {
            if self.targets.contains(&step.node) {
                self.record(&step.node, adjacency_column(step.edge.edge_type));
            }
        }
        Ok(())
    }
}

/// Every table alias a fragment's columns are bound to; unbound columns are ignored
pub fn referenced_tables<W: Walkable + ?Sized>(fragment: &W) -> Result<BTreeSet<String>> {
    struct Aliases(BTreeSet<String>);

    impl Visitor for Aliases {
        fn visit_column(&mut self, column: &ColumnReference) -> Result<()> {
            if let Some(alias) = column.table_reference() {
                self.0.insert(alias.to_string());
            }
            Ok(())
        }
    }

    let mut aliases = Aliases(BTreeSet::new());
    fragment.accept(&mut aliases)?;
    Ok(aliases.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BooleanExpr, ComparisonOp, ScalarExpr, Statement};
    use crate::parser::parse_statement;

    fn compare(column: &[&str], value: &str) -> BooleanExpr {
        BooleanExpr::compare(ScalarExpr::column(column), ComparisonOp::Equals, ScalarExpr::literal(value))
    }

    #[test]
    fn test_pruning_to_targets() {
        let predicate = compare(&["A", "age"], "27");
        let accessed = AccessedColumnCollector::new(["A", "B"]).collect(&predicate).unwrap();

        assert_eq!(accessed.columns.len(), 1);
        assert_eq!(accessed.get("A").unwrap().iter().collect::<Vec<_>>(), vec!["age"]);
        assert!(accessed.get("B").is_none());
        assert!(accessed.only_target_referenced);
    }

    #[test]
    fn test_foreign_alias_flips_flag() {
        let predicate = BooleanExpr::and(compare(&["A", "age"], "27"), compare(&["C", "name"], "'x'"));
        let accessed = AccessedColumnCollector::new(["A", "B"]).collect(&predicate).unwrap();

        assert!(!accessed.only_target_referenced);
        assert_eq!(accessed.columns.len(), 1);
        assert!(accessed.get("A").unwrap().contains("age"));
    }

    #[test]
    fn test_unbound_column_is_an_error() {
        let predicate = compare(&["age"], "27");
        let err = AccessedColumnCollector::new(["A"]).collect(&predicate).unwrap_err();
        assert!(matches!(err, Error::UnboundIdentifier(ref name) if name == "age"));
    }

    #[test]
    fn test_wildcards_are_ignored() {
        let Statement::Select(select) = parse_statement("SELECT A.*, * FROM Node AS A").unwrap() else {
            panic!("expected select");
        };
        let accessed = AccessedColumnCollector::new(["A"]).collect(&select).unwrap();
        assert!(accessed.columns.is_empty());
        assert!(accessed.only_target_referenced);
    }

    #[test]
    fn test_path_sources_read_adjacency() {
        let Statement::Select(select) = parse_statement(
            "SELECT B.name FROM Node AS A, Edge AS E, Node AS B, Edge AS F, Node AS C MATCH A-[E]->B-[F]-C",
        )
        .unwrap() else {
            panic!("expected select");
        };
        let accessed = AccessedColumnCollector::new(["A", "B"]).collect(&select).unwrap();

        assert!(accessed.get("A").unwrap().contains(keywords::OUT_ADJACENCY_LIST));
        let b = accessed.get("B").unwrap();
        assert!(b.contains(keywords::BOTH_ADJACENCY_LIST));
        assert!(b.contains("name"));
    }

    #[test]
    fn test_referenced_tables() {
        let predicate = BooleanExpr::and(compare(&["A", "age"], "27"), compare(&["bare"], "1"));
        let aliases = referenced_tables(&predicate).unwrap();
        assert_eq!(aliases.into_iter().collect::<Vec<_>>(), vec!["A".to_string()]);
    }
}
