//! Aggregation blocks
//!
//! A FROM clause is cut into aggregation blocks around blocking operators
//! (side effects, global filters and maps, barriers, modifications). Inside
//! a block the free tables may be reordered as long as input dependencies
//! hold; the anchoring operator, when there is one, always comes first.

use crate::ast::{FromClause, FunctionTable, MatchClause, TableReference};
use crate::pattern::MatchGraph;
use crate::visitors::referenced_tables;
use matchql_core::{keywords, Error, Result};
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace};
use xxhash_rust::xxh3::xxh3_64;

/// Operators that start a new aggregation block
const BLOCKING_FUNCTIONS: &[&str] = &[
    // side effects
    "aggregate",
    "store",
    "group",
    "subgraph",
    "tree",
    // global filters
    "coin",
    "dedup",
    "range",
    // global maps
    "order",
    "select",
    "barrier",
    // modifications
    "addV",
    "addE",
    "commit",
    "drop",
    "property",
    "updateProperties",
    // special
    "constant",
    "inject",
    "sample",
];

/// True when a table-valued function of this name anchors its own block
pub fn is_blocking_function(name: &str) -> bool {
    BLOCKING_FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(name))
}

/// One reorderable unit of a query block
#[derive(Debug, Clone)]
pub struct AggregationBlock {
    aggregation_alias: String,
    free_tables: Vec<String>,
    table_list: Vec<String>,
    table_dict: HashMap<String, Option<TableReference>>,
    table_input_dependency: HashMap<String, BTreeSet<String>>,
    graph: Option<MatchGraph>,
    hash: Cell<Option<u64>>,
}

impl Default for AggregationBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationBlock {
    /// Block without an anchoring operator
    pub fn new() -> Self {
        Self::with_anchor(keywords::SENTINEL_ALIAS.to_string(), None)
    }

    /// Block anchored by a table-valued operator
    pub fn from_function(table: FunctionTable) -> Self {
        let alias = table.alias.clone();
        Self::with_anchor(alias, Some(TableReference::Function(table)))
    }

    fn with_anchor(alias: String, anchor: Option<TableReference>) -> Self {
        let mut table_dict = HashMap::new();
        // The sentinel is always resolvable, so dependencies on it stay valid
        table_dict.insert(keywords::SENTINEL_ALIAS.to_string(), None);
        table_dict.insert(alias.clone(), anchor);

        Self {
            aggregation_alias: alias,
            free_tables: Vec::new(),
            table_list: Vec::new(),
            table_dict,
            table_input_dependency: HashMap::new(),
            graph: None,
            hash: Cell::new(None),
        }
    }

    // ========== Accessors ==========

    pub fn aggregation_alias(&self) -> &str {
        &self.aggregation_alias
    }

    pub fn is_anchored(&self) -> bool {
        self.aggregation_alias != keywords::SENTINEL_ALIAS
    }

    pub fn free_tables(&self) -> &[String] {
        &self.free_tables
    }

    /// Every table except the anchor, in insertion order
    pub fn table_list(&self) -> &[String] {
        &self.table_list
    }

    /// Table bound to `alias`; the anchor is included, the sentinel maps to `None`
    pub fn table(&self, alias: &str) -> Option<&TableReference> {
        self.table_dict.get(alias).and_then(Option::as_ref)
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.table_dict.contains_key(alias)
    }

    pub fn input_dependencies(&self, alias: &str) -> Option<&BTreeSet<String>> {
        self.table_input_dependency.get(alias)
    }

    pub fn graph(&self) -> Option<&MatchGraph> {
        self.graph.as_ref()
    }

    pub fn graph_mut(&mut self) -> Option<&mut MatchGraph> {
        self.graph.as_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.table_list.is_empty()
    }

    fn invalidate(&mut self) {
        self.hash.set(None);
    }

    // ========== Mutation ==========

    /// Add a table to the block and return its alias
    ///
    /// Vertex, derived and variable tables are free. A function table is
    /// an ordering anchor: it is never free and depends on the sentinel, so
    /// it sees every row the rest of the block produces. The first function
    /// table of an unanchored block becomes its aggregation alias and is
    /// kept out of the table list.
    pub fn add_table(&mut self, table: TableReference) -> String {
        let alias = table.alias().to_string();
        let mut dependencies = BTreeSet::new();
        let mut promoted = false;

        match &table {
            TableReference::Vertex(_) | TableReference::Derived(_) | TableReference::Variable(_) => {
                self.free_tables.push(alias.clone());
            }
            TableReference::Function(_) => {
                dependencies.insert(keywords::SENTINEL_ALIAS.to_string());
                if !self.is_anchored() {
                    debug!("Promoting {} to aggregation alias", alias);
                    self.aggregation_alias = alias.clone();
                    promoted = true;
                }
            }
        }

        if !promoted {
            self.table_list.push(alias.clone());
        }
        self.table_dict.insert(alias.clone(), Some(table));
        self.table_input_dependency.insert(alias.clone(), dependencies);
        self.invalidate();
        alias
    }

    /// Record that `alias` reads from `tables`
    ///
    /// Ignored when `alias` is not a table of this block. Dependencies on
    /// aliases the block does not know are dropped.
    pub fn attach_input_dependency<I, S>(&mut self, alias: &str, tables: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(dependencies) = self.table_input_dependency.get_mut(alias) else {
            return;
        };
        for table in tables {
            let table = table.as_ref();
            if table == alias {
                continue;
            }
            if self.table_dict.contains_key(table) {
                dependencies.insert(table.to_string());
            } else {
                trace!("Dropping dependency of {} on {}: not in block", alias, table);
            }
        }
        self.invalidate();
    }

    /// Build the block's pattern graph from the free tables
    pub fn create_match_graph(&mut self, match_clause: Option<&MatchClause>) {
        self.graph = Some(MatchGraph::build(&self.free_tables, match_clause));
        self.invalidate();
    }

    /// Memoized structural hash
    ///
    /// Computed from the aggregation alias followed by the table list in
    /// insertion order, so the same tables added in a different order hash
    /// differently. Used as a memoization key for block shapes.
    pub fn structural_hash(&self) -> u64 {
        if let Some(hash) = self.hash.get() {
            return hash;
        }
        let mut key = self.aggregation_alias.clone();
        for table in &self.table_list {
            key.push_str(table);
        }
        let hash = xxh3_64(key.as_bytes());
        self.hash.set(Some(hash));
        hash
    }

    /// Aliases in an order that respects input dependencies
    ///
    /// The anchor comes first; the rest keep insertion order wherever the
    /// dependencies allow it. An anchor reading from another table of its
    /// own block cannot come first, so that is an error.
    pub fn linearize(&self) -> Result<Vec<String>> {
        let mut ordered = Vec::with_capacity(self.table_list.len() + 1);
        if self.is_anchored() {
            let anchor_inputs: Vec<&str> = self
                .table_input_dependency
                .get(&self.aggregation_alias)
                .into_iter()
                .flatten()
                .map(String::as_str)
                .filter(|d| *d != keywords::SENTINEL_ALIAS)
                .collect();
            if !anchor_inputs.is_empty() {
                return Err(Error::QueryCompilation(format!(
                    "Aggregation alias {} reads from {} of its own block",
                    self.aggregation_alias,
                    anchor_inputs.join(", ")
                )));
            }
            ordered.push(self.aggregation_alias.clone());
        }

        let mut placed: BTreeSet<&str> = BTreeSet::new();
        placed.insert(keywords::SENTINEL_ALIAS);
        placed.insert(self.aggregation_alias.as_str());

        let mut pending: Vec<&String> = self.table_list.iter().collect();
        while !pending.is_empty() {
            let ready = pending.iter().position(|alias| {
                self.table_input_dependency
                    .get(alias.as_str())
                    .map(|deps| deps.iter().all(|d| placed.contains(d.as_str())))
                    .unwrap_or(true)
            });
            let Some(index) = ready else {
                let stuck: Vec<&str> = pending.iter().map(|s| s.as_str()).collect();
                return Err(Error::QueryCompilation(format!(
                    "Cyclic input dependency among {}",
                    stuck.join(", ")
                )));
            };
            let alias = pending.remove(index);
            placed.insert(alias.as_str());
            ordered.push(alias.clone());
        }

        Ok(ordered)
    }
}

/// Cut a FROM clause into aggregation blocks
///
/// A blocking operator opens a new block it anchors; every other table
/// joins the current block. The leading unanchored block is dropped when
/// it ends up empty. Function and derived tables then depend on the other
/// aliases of their block that their arguments or sub-query reference.
pub fn partition_blocks(from: &FromClause) -> Result<Vec<AggregationBlock>> {
    let mut blocks = vec![AggregationBlock::new()];

    for table in &from.tables {
        match table {
            TableReference::Function(function) if is_blocking_function(&function.name) => {
                debug!("Opening aggregation block at {}({})", function.name, function.alias);
                blocks.push(AggregationBlock::from_function(function.clone()));
            }
            other => {
                if let Some(current) = blocks.last_mut() {
                    current.add_table(other.clone());
                }
            }
        }
    }

    if blocks.len() > 1 && blocks[0].is_empty() && !blocks[0].is_anchored() {
        blocks.remove(0);
    }

    for block in &mut blocks {
        let mut pending = Vec::new();
        let aliases = std::iter::once(&block.aggregation_alias).chain(&block.table_list);
        for alias in aliases {
            let referenced = match block.table(alias) {
                Some(TableReference::Function(function)) => {
                    let mut referenced = BTreeSet::new();
                    for arg in &function.args {
                        referenced.extend(referenced_tables(arg)?);
                    }
                    referenced
                }
                Some(TableReference::Derived(derived)) => referenced_tables(derived.query.as_ref())?,
                _ => BTreeSet::new(),
            };
            if !referenced.is_empty() {
                pending.push((alias.clone(), referenced));
            }
        }
        for (alias, referenced) in pending {
            block.attach_input_dependency(&alias, referenced);
        }
    }

    debug!("Partitioned FROM clause into {} aggregation block(s)", blocks.len());
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Statement, VertexTable};
    use crate::parser::parse_statement;

    fn from_clause(query: &str) -> FromClause {
        let Statement::Select(select) = parse_statement(query).unwrap() else {
            panic!("expected select");
        };
        select.from.unwrap()
    }

    fn vertex(alias: &str) -> TableReference {
        TableReference::Vertex(VertexTable {
            collection: "Node".to_string(),
            alias: alias.to_string(),
        })
    }

    #[test]
    fn test_new_block_uses_sentinel() {
        let block = AggregationBlock::new();
        assert_eq!(block.aggregation_alias(), "dummy");
        assert!(!block.is_anchored());
        assert!(block.contains_alias("dummy"));
        assert!(block.table("dummy").is_none());
    }

    #[test]
    fn test_add_table_kinds() {
        let from = from_clause("SELECT * FROM Node AS N_0, @v AS V_0, values(N_0.name) AS F_0");
        let mut block = AggregationBlock::new();
        for table in &from.tables {
            block.add_table(table.clone());
        }

        assert_eq!(block.free_tables(), &["N_0".to_string(), "V_0".to_string()]);
        assert_eq!(block.aggregation_alias(), "F_0");
        assert_eq!(block.table_list(), &["N_0".to_string(), "V_0".to_string()]);
        let deps = block.input_dependencies("F_0").unwrap();
        assert!(deps.contains("dummy"));
        // Every dependency resolves to a table of the block
        for deps in block.table_input_dependency.values() {
            for dep in deps {
                assert!(block.contains_alias(dep));
            }
        }
    }

    #[test]
    fn test_hash_is_memoized_and_reset() {
        let mut block = AggregationBlock::new();
        block.add_table(vertex("N_0"));
        let first = block.structural_hash();
        assert_eq!(block.hash.get(), Some(first));
        assert_eq!(block.structural_hash(), first);

        block.add_table(vertex("N_1"));
        assert_eq!(block.hash.get(), None);
        assert_ne!(block.structural_hash(), first);
    }

    #[test]
    fn test_hash_is_order_sensitive() {
        let mut a = AggregationBlock::new();
        a.add_table(vertex("N_0"));
        a.add_table(vertex("N_1"));

        let mut b = AggregationBlock::new();
        b.add_table(vertex("N_1"));
        b.add_table(vertex("N_0"));

        assert_ne!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn test_attach_input_dependency_requires_known_alias() {
        let mut block = AggregationBlock::new();
        block.add_table(vertex("N_0"));
        block.add_table(vertex("N_1"));

        block.attach_input_dependency("N_1", ["N_0", "X_9"]);
        block.attach_input_dependency("missing", ["N_0"]);

        let deps = block.input_dependencies("N_1").unwrap();
        assert!(deps.contains("N_0"));
        assert!(!deps.contains("X_9"));
        assert!(block.input_dependencies("missing").is_none());
    }

    #[test]
    fn test_partition_on_blocking_operators() {
        let from = from_clause(
            "SELECT * FROM Node AS N_0, Edge AS E_0, Node AS N_1, aggregate(N_1.name) AS A_0, Node AS N_2, values(N_2.age) AS F_0",
        );
        let blocks = partition_blocks(&from).unwrap();

        assert_eq!(blocks.len(), 2);
        assert!(!blocks[0].is_anchored());
        assert_eq!(blocks[0].table_list(), &["N_0", "E_0", "N_1"].map(String::from));

        assert_eq!(blocks[1].aggregation_alias(), "A_0");
        assert_eq!(blocks[1].free_tables(), &["N_2".to_string()]);
        let deps = blocks[1].input_dependencies("F_0").unwrap();
        assert!(deps.contains("N_2"));
        assert!(deps.contains("dummy"));

        let order = blocks[1].linearize().unwrap();
        assert_eq!(order, vec!["A_0", "N_2", "F_0"]);
    }

    #[test]
    fn test_leading_empty_block_is_dropped() {
        let from = from_clause("SELECT * FROM inject(1) AS I_0, Node AS N_0");
        let blocks = partition_blocks(&from).unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].aggregation_alias(), "I_0");
        assert_eq!(blocks[0].table_list(), &["N_0".to_string()]);
    }

    #[test]
    fn test_linearize_respects_dependencies() {
        let from = from_clause("SELECT * FROM aggregate(1) AS A_0, values(N_0.name) AS F_0, Node AS N_0");
        let blocks = partition_blocks(&from).unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].linearize().unwrap(), vec!["A_0", "N_0", "F_0"]);
    }

    #[test]
    fn test_function_table_anchors_unanchored_block() {
        let from = from_clause("SELECT * FROM values(1) AS F_0, Node AS N_0, values(N_0.age) AS F_1");
        let blocks = partition_blocks(&from).unwrap();

        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.aggregation_alias(), "F_0");
        assert!(block.is_anchored());
        assert_eq!(block.free_tables(), &["N_0".to_string()]);
        assert_eq!(block.table_list(), &["N_0".to_string(), "F_1".to_string()]);
        assert!(block.table("F_0").is_some());
        assert!(block.input_dependencies("F_0").unwrap().contains("dummy"));
        assert_eq!(block.structural_hash(), xxh3_64(b"F_0N_0F_1"));
        assert_eq!(block.linearize().unwrap(), vec!["F_0", "N_0", "F_1"]);
    }

    #[test]
    fn test_anchor_reading_its_own_block_is_rejected() {
        let from = from_clause("SELECT * FROM Node AS N_0, values(N_0.name) AS F_0");
        let blocks = partition_blocks(&from).unwrap();

        assert_eq!(blocks[0].aggregation_alias(), "F_0");
        assert_eq!(blocks[0].table_list(), &["N_0".to_string()]);
        assert!(blocks[0].input_dependencies("F_0").unwrap().contains("N_0"));
        assert!(matches!(blocks[0].linearize(), Err(Error::QueryCompilation(_))));
    }

    #[test]
    fn test_promoted_anchor_alone_is_not_dropped() {
        let from = from_clause("SELECT * FROM values(1) AS F_0, inject(2) AS I_0, Node AS N_0");
        let blocks = partition_blocks(&from).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].aggregation_alias(), "F_0");
        assert!(blocks[0].is_empty());
        assert_eq!(blocks[1].aggregation_alias(), "I_0");
    }

    #[test]
    fn test_linearize_detects_cycles() {
        let mut block = AggregationBlock::new();
        block.add_table(vertex("N_0"));
        block.add_table(vertex("N_1"));
        block.attach_input_dependency("N_0", ["N_1"]);
        block.attach_input_dependency("N_1", ["N_0"]);

        assert!(matches!(block.linearize(), Err(Error::QueryCompilation(_))));
    }
}
