//! Select planning for document backends
//!
//! The planner decomposes a SELECT structurally; it does no cost-based
//! optimization. It produces:
//! - aggregation blocks, each in a dependency-respecting order
//! - connected components of each block's pattern graph
//! - per-node document queries with pushed-down predicates
//! - per-edge predicates in subscript form
//! - residual predicates that span several aliases

use crate::ast::{BooleanExpr, EdgeType, SelectStatement, TableReference};
use crate::block::{partition_blocks, AggregationBlock};
use crate::classifier::classify_from;
use crate::pattern::{EdgeId, MatchGraph, NodeId, PathBounds};
use crate::visit::rewrite;
use crate::visitors::{
    needs_runtime, referenced_tables, AccessedColumnCollector, BooleanLiteralNormalizer, NodePredicateEncoder,
    StringArrayUnfoldRewriter, SubscriptIdentifierConverter,
};
use matchql_core::{Backend, CompilerConfig, Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Function table whose branches are merged into one edge stream
const UNION_FUNCTION: &str = "union";

/// Plan of one SELECT statement
#[derive(Debug, Clone, Serialize)]
pub struct SelectPlan {
    pub blocks: Vec<BlockPlan>,
    /// Conjuncts spanning more than one alias, evaluated after the joins
    pub residual_predicates: Vec<String>,
    pub projection: Vec<String>,
    /// Vertex alias → collection it reads from
    pub collections: BTreeMap<String, String>,
}

impl SelectPlan {
    pub fn node(&self, alias: &str) -> Option<&NodeQuery> {
        self.blocks
            .iter()
            .flat_map(|b| &b.components)
            .flat_map(|c| &c.nodes)
            .find(|n| n.alias == alias)
    }

    pub fn edge(&self, alias: &str) -> Option<&EdgePlan> {
        self.blocks
            .iter()
            .flat_map(|b| &b.components)
            .flat_map(|c| &c.edges)
            .find(|e| e.alias == alias)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockPlan {
    pub aggregation_alias: String,
    /// Memoization key of the block shape
    pub structural_hash: u64,
    pub order: Vec<String>,
    pub input_dependencies: BTreeMap<String, BTreeSet<String>>,
    pub components: Vec<ComponentPlan>,
    /// Merged edge type of each `union` table whose branches are edges
    pub union_edge_types: BTreeMap<String, EdgeType>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ComponentPlan {
    pub nodes: Vec<NodeQuery>,
    pub edges: Vec<EdgePlan>,
}

/// Document query fetching the vertices bound to one alias
#[derive(Debug, Clone, Serialize)]
pub struct NodeQuery {
    pub alias: String,
    /// Pushed-down filter, rewritten for the backend
    pub predicate: Option<String>,
    /// Filters only the runtime can evaluate
    pub runtime_predicates: Vec<String>,
    /// Properties to project
    pub properties: Vec<String>,
    /// Encoded name → original property name used by `predicate`
    pub encoded_properties: BTreeMap<String, String>,
    pub starred: bool,
    pub tail: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgePlan {
    pub alias: String,
    pub source: Option<String>,
    pub sink: Option<String>,
    pub edge_type: EdgeType,
    pub predicates: Vec<String>,
    pub properties: Vec<String>,
    pub path: Option<PathBounds>,
    pub dangling: bool,
}

/// Merge the edge types of the branches of a union
///
/// Branches that disagree cannot be merged yet.
pub fn union_edge_type(types: &[EdgeType]) -> Result<EdgeType> {
    let Some((first, rest)) = types.split_first() else {
        return Err(Error::NotImplemented("union without edge branches".to_string()));
    };
    for edge_type in rest {
        if edge_type != first {
            return Err(Error::NotImplemented(format!(
                "union of {:?} and {:?} edges",
                first, edge_type
            )));
        }
    }
    Ok(*first)
}

/// Where a WHERE conjunct ends up
enum Placement {
    Node(String),
    Edge(String),
    Residual,
}

/// Select planner
pub struct SelectPlanner<'a> {
    config: &'a CompilerConfig,
}

impl<'a> SelectPlanner<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self { config }
    }

    /// Plan a SELECT statement
    pub fn plan(&self, select: &SelectStatement) -> Result<SelectPlan> {
        let (vertex_tables, other_tables) = classify_from(select.from.as_ref());
        trace!(
            "Classified {} vertex and {} other table(s)",
            vertex_tables.len(),
            other_tables.len()
        );
        let collections = vertex_tables
            .iter()
            .map(|t| (t.alias.clone(), t.collection.clone()))
            .collect();

        let mut blocks = self.build_blocks(select)?;

        let mut residual = Vec::new();
        if let Some(predicate) = &select.where_clause {
            for conjunct in predicate.conjuncts() {
                match self.place(conjunct, &blocks)? {
                    Placement::Node(alias) => {
                        for block in &mut blocks {
                            if let Some(graph) = block.graph_mut() {
                                graph.attach_node_predicate(&alias, conjunct.clone());
                            }
                        }
                    }
                    Placement::Edge(alias) => {
                        for block in &mut blocks {
                            if let Some(graph) = block.graph_mut() {
                                graph.attach_edge_predicate(&alias, conjunct.clone());
                            }
                        }
                    }
                    Placement::Residual => residual.push(conjunct.clone()),
                }
            }
        }

        let targets: Vec<String> = blocks
            .iter()
            .filter_map(AggregationBlock::graph)
            .flat_map(|g| g.nodes().iter().map(|n| n.alias.clone()).chain(edge_aliases(g)))
            .collect();
        let accessed = AccessedColumnCollector::new(targets).collect(select)?;
        for block in &mut blocks {
            if let Some(graph) = block.graph_mut() {
                for (alias, columns) in &accessed.columns {
                    graph.add_properties(alias, columns);
                }
            }
        }

        let mut block_plans = Vec::with_capacity(blocks.len());
        for block in &blocks {
            block_plans.push(self.plan_block(block)?);
        }

        let mut residual_predicates = Vec::with_capacity(residual.len());
        for mut predicate in residual {
            rewrite(&mut predicate, &mut BooleanLiteralNormalizer::new())?;
            residual_predicates.push(predicate.to_string());
        }

        debug!(
            "Planned select: {} block(s), {} residual predicate(s)",
            block_plans.len(),
            residual_predicates.len()
        );

        Ok(SelectPlan {
            blocks: block_plans,
            residual_predicates,
            projection: select.elements.iter().map(ToString::to_string).collect(),
            collections,
        })
    }

    fn build_blocks(&self, select: &SelectStatement) -> Result<Vec<AggregationBlock>> {
        let mut blocks = match &select.from {
            Some(from) => partition_blocks(from)?,
            None => Vec::new(),
        };
        for block in &mut blocks {
            block.create_match_graph(select.match_clause.as_ref());
        }
        Ok(blocks)
    }

    fn place(&self, conjunct: &BooleanExpr, blocks: &[AggregationBlock]) -> Result<Placement> {
        let aliases = referenced_tables(conjunct)?;
        let mut aliases = aliases.iter();
        let (Some(alias), None) = (aliases.next(), aliases.next()) else {
            return Ok(Placement::Residual);
        };

        for graph in blocks.iter().filter_map(AggregationBlock::graph) {
            if graph.is_node(alias) {
                return Ok(Placement::Node(alias.clone()));
            }
            if graph.is_edge(alias) {
                return Ok(Placement::Edge(alias.clone()));
            }
        }
        trace!("Predicate on {} stays residual", alias);
        Ok(Placement::Residual)
    }

    fn plan_block(&self, block: &AggregationBlock) -> Result<BlockPlan> {
        let mut components = Vec::new();
        if let Some(graph) = block.graph() {
            for component in &graph.components {
                let mut plan = ComponentPlan::default();
                for (alias, id) in &component.nodes {
                    let mut query = self.node_query(graph, *id)?;
                    query.tail = component.is_tail(alias);
                    plan.nodes.push(query);
                }
                for id in component.edges.values() {
                    plan.edges.push(self.edge_plan(graph, *id)?);
                }
                components.push(plan);
            }
        }

        let input_dependencies = std::iter::once(block.aggregation_alias())
            .chain(block.table_list().iter().map(String::as_str))
            .filter_map(|alias| {
                block
                    .input_dependencies(alias)
                    .filter(|deps| !deps.is_empty())
                    .map(|deps| (alias.to_string(), deps.clone()))
            })
            .collect();

        Ok(BlockPlan {
            aggregation_alias: block.aggregation_alias().to_string(),
            structural_hash: block.structural_hash(),
            order: block.linearize()?,
            input_dependencies,
            components,
            union_edge_types: union_edge_types(block)?,
        })
    }

    fn node_query(&self, graph: &MatchGraph, id: NodeId) -> Result<NodeQuery> {
        let node = graph.node(id);
        let mut pushed = Vec::new();
        let mut runtime_predicates = Vec::new();

        for predicate in &node.predicates {
            if needs_runtime(predicate)? {
                runtime_predicates.push(predicate.to_string());
            } else {
                pushed.push(predicate.clone());
            }
        }

        let mut encoded_properties = BTreeMap::new();
        let predicate = match BooleanExpr::conjunction(pushed) {
            Some(mut predicate) => {
                rewrite(&mut predicate, &mut BooleanLiteralNormalizer::new())?;
                match self.config.backend {
                    Backend::DocumentDb => {
                        let mut encoder = NodePredicateEncoder::from_config(self.config);
                        rewrite(&mut predicate, &mut encoder)?;
                        encoded_properties = encoder.into_referenced_properties();
                    }
                    Backend::JsonServer => {
                        rewrite(&mut predicate, &mut StringArrayUnfoldRewriter::from_config(self.config))?;
                    }
                    Backend::Relational => {}
                }
                Some(predicate.to_string())
            }
            None => None,
        };

        Ok(NodeQuery {
            alias: node.alias.clone(),
            predicate,
            runtime_predicates,
            properties: node.properties.iter().cloned().collect(),
            encoded_properties,
            starred: node.is_starred(),
            tail: false,
        })
    }

    fn edge_plan(&self, graph: &MatchGraph, id: EdgeId) -> Result<EdgePlan> {
        let edge = graph.edge(id);
        let data = graph.edge_data(id);

        let mut predicates = Vec::with_capacity(data.predicates.len());
        for predicate in &data.predicates {
            let mut predicate = predicate.clone();
            rewrite(&mut predicate, &mut BooleanLiteralNormalizer::new())?;
            if self.config.backend.is_document() {
                rewrite(&mut predicate, &mut SubscriptIdentifierConverter::new([edge.alias.as_str()]))?;
            }
            predicates.push(predicate.to_string());
        }

        let dangling = edge
            .source
            .is_some_and(|source| graph.node(source).dangling_edges.contains(&id));

        Ok(EdgePlan {
            alias: edge.alias.clone(),
            source: edge.source.map(|n| graph.node(n).alias.clone()),
            sink: edge.sink.map(|n| graph.node(n).alias.clone()),
            edge_type: edge.edge_type,
            predicates,
            properties: data.properties.clone(),
            path: edge.path.clone(),
            dangling,
        })
    }
}

fn edge_aliases(graph: &MatchGraph) -> impl Iterator<Item = String> + '_ {
    graph
        .components
        .iter()
        .flat_map(|c| c.edges.keys().cloned())
}

/// Merged edge types of the block's `union` tables that reference edges
fn union_edge_types(block: &AggregationBlock) -> Result<BTreeMap<String, EdgeType>> {
    let mut merged = BTreeMap::new();
    let Some(graph) = block.graph() else {
        return Ok(merged);
    };

    let mut candidates: Vec<&TableReference> = block.table_list().iter().filter_map(|a| block.table(a)).collect();
    if let Some(anchor) = block.table(block.aggregation_alias()) {
        candidates.push(anchor);
    }

    for table in candidates {
        let TableReference::Function(function) = table else {
            continue;
        };
        if !function.name.eq_ignore_ascii_case(UNION_FUNCTION) {
            continue;
        }

        let mut branch_types = Vec::new();
        for arg in &function.args {
            let aliases = referenced_tables(arg)?;
            for alias in aliases {
                if let Some(edge) = graph.edge_by_alias(&alias) {
                    branch_types.push(edge.edge_type);
                }
            }
        }
        if !branch_types.is_empty() {
            merged.insert(function.alias.clone(), union_edge_type(&branch_types)?);
        }
    }
    Ok(merged)
}
