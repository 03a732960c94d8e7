//! Pattern graph built from MATCH clauses
//!
//! Nodes, edges and the predicate/property lists edges share live in three
//! arenas owned by [`MatchGraph`]. Adjacency lists hold handles into the
//! arenas, so a node and the edges that point at it never own each other.
//!
//! A forward edge and the reverse edge synthesized on its sink point at the
//! same [`EdgeData`] slot: a predicate attached through either one is seen
//! through both.

use crate::ast::{BooleanExpr, EdgeReference, EdgeType, MatchClause, MatchPath, ValueExpr};
use crate::union_find::DisjointSet;
use matchql_core::keywords;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, trace};

/// Handle of a node in [`MatchGraph::nodes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// Handle of an edge in [`MatchGraph::edges`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeId(pub usize);

/// Handle of a shared predicate/property slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeDataId(pub usize);

/// A vertex-typed alias
#[derive(Debug, Clone, Serialize)]
pub struct MatchNode {
    pub alias: String,
    pub neighbors: Vec<EdgeId>,
    pub reverse_neighbors: Vec<EdgeId>,
    /// Edges leaving this node whose sink is not bound in the block
    pub dangling_edges: Vec<EdgeId>,
    pub predicates: Vec<BooleanExpr>,
    /// Referenced property names; contains `*` once the node is starred
    pub properties: BTreeSet<String>,
}

impl MatchNode {
    fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            neighbors: Vec::new(),
            reverse_neighbors: Vec::new(),
            dangling_edges: Vec::new(),
            predicates: Vec::new(),
            properties: BTreeSet::new(),
        }
    }

    pub fn has_adjacency(&self) -> bool {
        self.neighbors.len() + self.reverse_neighbors.len() + self.dangling_edges.len() > 0
    }

    /// Needs its full adjacency materialized
    pub fn is_starred(&self) -> bool {
        self.properties.contains(keywords::STAR)
    }
}

/// Predicates and accessed properties of one edge alias
#[derive(Debug, Clone, Default, Serialize)]
pub struct EdgeData {
    pub predicates: Vec<BooleanExpr>,
    pub properties: Vec<String>,
}

/// Hop bounds and attribute filters of a variable-length edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathBounds {
    pub min_length: u32,
    pub max_length: Option<u32>,
    pub attributes: BTreeMap<String, ValueExpr>,
}

/// An edge-typed alias
///
/// When `path` is set this is a variable-length match path. It is never
/// expanded into single hops here.
#[derive(Debug, Clone, Serialize)]
pub struct MatchEdge {
    pub alias: String,
    pub source: Option<NodeId>,
    pub sink: Option<NodeId>,
    pub edge_type: EdgeType,
    pub is_reversed: bool,
    pub data: EdgeDataId,
    pub path: Option<PathBounds>,
    pub edge_column: Option<EdgeReference>,
}

impl MatchEdge {
    pub fn is_path(&self) -> bool {
        self.path.is_some()
    }
}

/// Nodes and edges reachable from one another
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectedComponent {
    pub nodes: BTreeMap<String, NodeId>,
    pub edges: BTreeMap<String, EdgeId>,
    /// Nodes only reached as sinks so far
    pub tail_nodes: BTreeMap<String, bool>,
}

impl ConnectedComponent {
    pub fn is_tail(&self, alias: &str) -> bool {
        self.tail_nodes.get(alias).copied().unwrap_or(false)
    }
}

/// Pattern graph of one aggregation block
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchGraph {
    pub components: Vec<ConnectedComponent>,
    nodes: Vec<MatchNode>,
    edges: Vec<MatchEdge>,
    edge_data: Vec<EdgeData>,
    #[serde(skip)]
    node_index: HashMap<String, NodeId>,
    #[serde(skip)]
    edge_index: HashMap<String, EdgeId>,
}

impl MatchGraph {
    /// Build the pattern graph for a block
    ///
    /// `free_tables` are the block's reorderable aliases. A free alias named
    /// as an edge somewhere in `match_clause` becomes a [`MatchEdge`], every
    /// other free alias a [`MatchNode`]. Path steps whose source node or edge
    /// belongs to another block are skipped.
    pub fn build(free_tables: &[String], match_clause: Option<&MatchClause>) -> Self {
        let edge_aliases: HashSet<&str> = match_clause
            .map(|m| {
                m.paths
                    .iter()
                    .flat_map(|p| p.steps.iter().map(|s| s.edge.alias.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let mut graph = MatchGraph::default();
        let mut disjoint_set = DisjointSet::new();

        for alias in free_tables {
            if edge_aliases.contains(alias.as_str()) {
                graph.add_edge_alias(alias);
            } else {
                graph.add_node(alias);
            }
            disjoint_set.insert(alias);
        }

        if let Some(match_clause) = match_clause {
            for path in &match_clause.paths {
                graph.walk_path(path, &mut disjoint_set);
            }
        }

        graph.assign_components(&mut disjoint_set);

        debug!(
            "Built match graph: {} component(s), {} node(s), {} edge alias(es)",
            graph.components.len(),
            graph.node_index.len(),
            graph.edge_index.len()
        );
        graph
    }

    fn add_node(&mut self, alias: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MatchNode::new(alias));
        self.node_index.insert(alias.to_string(), id);
        id
    }

    fn add_edge_alias(&mut self, alias: &str) -> EdgeId {
        let data = EdgeDataId(self.edge_data.len());
        self.edge_data.push(EdgeData {
            predicates: Vec::new(),
            properties: keywords::RESERVED_EDGE_PROPERTIES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        });

        let id = EdgeId(self.edges.len());
        self.edges.push(MatchEdge {
            alias: alias.to_string(),
            source: None,
            sink: None,
            edge_type: EdgeType::Out,
            is_reversed: false,
            data,
            path: None,
            edge_column: None,
        });
        self.edge_index.insert(alias.to_string(), id);
        id
    }

    fn walk_path(&mut self, path: &MatchPath, disjoint_set: &mut DisjointSet) {
        for (index, step) in path.steps.iter().enumerate() {
            let Some(source) = self.node_id(&step.node) else {
                trace!("Skipping step from {}: not a node of this block", step.node);
                continue;
            };
            let Some(edge_id) = self.edge_id(&step.edge.alias) else {
                trace!("Skipping edge {}: not a free edge of this block", step.edge.alias);
                continue;
            };

            {
                let edge = &mut self.edges[edge_id.0];
                edge.source = Some(source);
                edge.edge_type = step.edge.edge_type;
                edge.edge_column = Some(step.edge.clone());
                edge.path = if step.edge.is_single_hop() {
                    None
                } else {
                    Some(PathBounds {
                        min_length: step.edge.min_length,
                        max_length: step.edge.max_length,
                        attributes: step.edge.attributes.clone(),
                    })
                };
            }

            if path.is_reversed {
                disjoint_set.union(&step.edge.alias, &step.node);
            } else {
                disjoint_set.union(&step.node, &step.edge.alias);
            }

            let next = path.next_node(index);
            if let Some(next) = next {
                disjoint_set.insert(next);
                if path.is_reversed {
                    disjoint_set.union(next, &step.edge.alias);
                } else {
                    disjoint_set.union(&step.edge.alias, next);
                }
            }

            match next.and_then(|n| self.node_id(n)) {
                Some(sink) => self.link(source, edge_id, sink),
                None => {
                    self.edges[edge_id.0].sink = None;
                    self.nodes[source.0].dangling_edges.push(edge_id);
                }
            }
        }
    }

    /// Bind `edge` from `source` to `sink`, pairing fixed edges with a reverse edge
    fn link(&mut self, source: NodeId, edge_id: EdgeId, sink: NodeId) {
        self.nodes[source.0].neighbors.push(edge_id);
        self.edges[edge_id.0].sink = Some(sink);

        let forward = &self.edges[edge_id.0];
        if forward.is_path() {
            return;
        }

        let reverse = MatchEdge {
            alias: forward.alias.clone(),
            source: Some(sink),
            sink: Some(source),
            edge_type: forward.edge_type,
            is_reversed: true,
            data: forward.data,
            path: None,
            edge_column: forward.edge_column.clone(),
        };
        let reverse_id = EdgeId(self.edges.len());
        self.edges.push(reverse);
        self.nodes[sink.0].reverse_neighbors.push(reverse_id);
    }

    fn assign_components(&mut self, disjoint_set: &mut DisjointSet) {
        let mut by_root: HashMap<String, usize> = HashMap::new();
        let mut components: Vec<ConnectedComponent> = Vec::new();

        for index in 0..self.nodes.len() {
            let alias = self.nodes[index].alias.clone();
            let root = disjoint_set.find(&alias);
            let slot = *by_root.entry(root).or_insert_with(|| {
                components.push(ConnectedComponent::default());
                components.len() - 1
            });

            let node = &mut self.nodes[index];
            let is_tail = !node.reverse_neighbors.is_empty()
                && node.neighbors.is_empty()
                && node.dangling_edges.is_empty();
            if node.has_adjacency() {
                node.properties.insert(keywords::STAR.to_string());
            }

            let component = &mut components[slot];
            component.nodes.insert(alias.clone(), NodeId(index));
            component.tail_nodes.insert(alias, is_tail);
        }

        let mut edge_aliases: Vec<(String, EdgeId)> =
            self.edge_index.iter().map(|(a, id)| (a.clone(), *id)).collect();
        edge_aliases.sort_by_key(|(_, id)| *id);

        for (alias, id) in edge_aliases {
            let root = disjoint_set.find(&alias);
            let slot = *by_root.entry(root).or_insert_with(|| {
                components.push(ConnectedComponent::default());
                components.len() - 1
            });
            components[slot].edges.insert(alias, id);
        }

        self.components = components;
    }

    // ========== Lookup ==========

    pub fn node_id(&self, alias: &str) -> Option<NodeId> {
        self.node_index.get(alias).copied()
    }

    /// Handle of the forward edge bound to `alias`
    pub fn edge_id(&self, alias: &str) -> Option<EdgeId> {
        self.edge_index.get(alias).copied()
    }

    pub fn node(&self, id: NodeId) -> &MatchNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut MatchNode {
        &mut self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &MatchEdge {
        &self.edges[id.0]
    }

    pub fn node_by_alias(&self, alias: &str) -> Option<&MatchNode> {
        self.node_id(alias).map(|id| self.node(id))
    }

    pub fn edge_by_alias(&self, alias: &str) -> Option<&MatchEdge> {
        self.edge_id(alias).map(|id| self.edge(id))
    }

    pub fn edge_data(&self, id: EdgeId) -> &EdgeData {
        &self.edge_data[self.edges[id.0].data.0]
    }

    pub fn edge_data_mut(&mut self, id: EdgeId) -> &mut EdgeData {
        let data = self.edges[id.0].data;
        &mut self.edge_data[data.0]
    }

    pub fn nodes(&self) -> &[MatchNode] {
        &self.nodes
    }

    /// Every edge in the arena, reverse edges included
    pub fn edges(&self) -> &[MatchEdge] {
        &self.edges
    }

    pub fn is_node(&self, alias: &str) -> bool {
        self.node_index.contains_key(alias)
    }

    pub fn is_edge(&self, alias: &str) -> bool {
        self.edge_index.contains_key(alias)
    }

    /// Component holding `alias`, node or edge
    pub fn component_of(&self, alias: &str) -> Option<usize> {
        self.components
            .iter()
            .position(|c| c.nodes.contains_key(alias) || c.edges.contains_key(alias))
    }

    // ========== Predicates and properties ==========

    /// Attach a predicate to a node; false when `alias` is not a node
    pub fn attach_node_predicate(&mut self, alias: &str, predicate: BooleanExpr) -> bool {
        match self.node_id(alias) {
            Some(id) => {
                self.nodes[id.0].predicates.push(predicate);
                true
            }
            None => false,
        }
    }

    /// Attach a predicate to an edge alias; visible through its reverse edge too
    pub fn attach_edge_predicate(&mut self, alias: &str, predicate: BooleanExpr) -> bool {
        match self.edge_id(alias) {
            Some(id) => {
                self.edge_data_mut(id).predicates.push(predicate);
                true
            }
            None => false,
        }
    }

    /// Record accessed properties for a node or edge alias
    pub fn add_properties<'a, I>(&mut self, alias: &str, properties: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        if let Some(id) = self.node_id(alias) {
            self.nodes[id.0].properties.extend(properties.into_iter().cloned());
        } else if let Some(id) = self.edge_id(alias) {
            let data = self.edge_data_mut(id);
            for property in properties {
                if !data.properties.contains(property) {
                    data.properties.push(property.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ComparisonOp, ScalarExpr, Statement};
    use crate::parser::parse_statement;

    fn graph_for(query: &str) -> MatchGraph {
        let Statement::Select(select) = parse_statement(query).unwrap() else {
            panic!("expected select");
        };
        let free: Vec<String> = select
            .from
            .as_ref()
            .map(|f| f.tables.iter().map(|t| t.alias().to_string()).collect())
            .unwrap_or_default();
        MatchGraph::build(&free, select.match_clause.as_ref())
    }

    fn age_predicate(alias: &str) -> BooleanExpr {
        BooleanExpr::compare(
            ScalarExpr::column(&[alias, "age"]),
            ComparisonOp::Equals,
            ScalarExpr::literal("27"),
        )
    }

    #[test]
    fn test_single_edge_component() {
        let graph = graph_for("SELECT * FROM Node AS A, Edge AS E, Node AS B MATCH A-[E]->B");

        assert_eq!(graph.components.len(), 1);
        let component = &graph.components[0];
        assert!(component.nodes.contains_key("A"));
        assert!(component.nodes.contains_key("B"));
        assert!(component.edges.contains_key("E"));

        let a = graph.node_by_alias("A").unwrap();
        let b = graph.node_by_alias("B").unwrap();
        assert!(a.is_starred());
        assert!(b.is_starred());
        assert_eq!(a.neighbors.len(), 1);
        assert_eq!(b.reverse_neighbors.len(), 1);
        assert!(component.is_tail("B"));
        assert!(!component.is_tail("A"));

        let e = graph.edge_by_alias("E").unwrap();
        assert_eq!(e.source, graph.node_id("A"));
        assert_eq!(e.sink, graph.node_id("B"));
        assert_eq!(graph.edge_data(graph.edge_id("E").unwrap()).properties.len(), 4);
    }

    #[test]
    fn test_reverse_edge_shares_predicates() {
        let mut graph = graph_for("SELECT * FROM Node AS A, Edge AS E, Node AS B MATCH A-[E]->B");
        let b = graph.node_by_alias("B").unwrap();
        let reverse_id = b.reverse_neighbors[0];

        let reverse = graph.edge(reverse_id);
        assert!(reverse.is_reversed);
        assert_eq!(reverse.source, graph.node_id("B"));
        assert_eq!(reverse.sink, graph.node_id("A"));

        assert!(graph.attach_edge_predicate("E", age_predicate("E")));
        assert_eq!(graph.edge_data(reverse_id).predicates.len(), 1);
    }

    #[test]
    fn test_dangling_edge() {
        let graph = graph_for("SELECT * FROM Node AS A, Edge AS E MATCH A-[E]->");
        let a = graph.node_by_alias("A").unwrap();
        let e = graph.edge_id("E").unwrap();

        assert_eq!(a.dangling_edges, vec![e]);
        assert!(a.neighbors.is_empty());
        assert!(graph.edge(e).sink.is_none());
        assert!(a.is_starred());
        assert_eq!(graph.components.len(), 1);
    }

    #[test]
    fn test_out_of_block_sink_is_dangling() {
        // B is not a table of this block
        let graph = graph_for("SELECT * FROM Node AS A, Edge AS E MATCH A-[E]->B");
        let a = graph.node_by_alias("A").unwrap();

        assert_eq!(a.dangling_edges.len(), 1);
        assert!(a.neighbors.is_empty());
        assert!(graph.node_by_alias("B").is_none());
    }

    #[test]
    fn test_variable_length_path_has_no_reverse_edge() {
        let graph = graph_for("SELECT * FROM Node AS A, Edge AS P, Node AS B MATCH A-[P*1..3 {label: 'knows'}]->B");
        let p = graph.edge_by_alias("P").unwrap();
        let bounds = p.path.as_ref().unwrap();

        assert_eq!(bounds.min_length, 1);
        assert_eq!(bounds.max_length, Some(3));
        assert_eq!(bounds.attributes.get("label").map(|v| v.value.as_str()), Some("knows"));
        assert!(graph.node_by_alias("B").unwrap().reverse_neighbors.is_empty());
        assert_eq!(p.sink, graph.node_id("B"));
    }

    #[test]
    fn test_reversed_path_connects() {
        let graph = graph_for("SELECT * FROM Node AS A, Edge AS E, Node AS B, Node AS C MATCH A<-[E]-B");

        assert_eq!(graph.components.len(), 2);
        let shared = graph.component_of("A");
        assert_eq!(shared, graph.component_of("B"));
        assert_eq!(shared, graph.component_of("E"));
        assert_ne!(shared, graph.component_of("C"));

        let e = graph.edge_by_alias("E").unwrap();
        assert_eq!(e.source, graph.node_id("B"));
        assert_eq!(e.sink, graph.node_id("A"));
    }

    #[test]
    fn test_step_outside_block_is_skipped() {
        let graph = graph_for("SELECT * FROM Node AS B, Edge AS F, Node AS C MATCH A-[E]->B-[F]->C");

        assert!(graph.edge_by_alias("E").is_none());
        let b = graph.node_by_alias("B").unwrap();
        assert_eq!(b.neighbors.len(), 1);
        assert_eq!(graph.components.len(), 1);
    }

    #[test]
    fn test_isolated_nodes_get_own_components() {
        let graph = graph_for("SELECT * FROM Node AS A, Node AS B");
        assert_eq!(graph.components.len(), 2);
        assert!(!graph.node_by_alias("A").unwrap().is_starred());
    }
}
