//! Reserved names shared by the compiler and the document backends
//!
//! These strings are part of the wire contract with the storage layer and
//! must not change between releases.

/// Alias of an aggregation block that has no anchoring table
pub const SENTINEL_ALIAS: &str = "dummy";

/// Record identifier property, always stored flat
pub const NODE_ID: &str = "id";

/// Label property, always stored flat
pub const LABEL: &str = "label";

/// Segment addressing the scalar value of a nested property
pub const PROPERTY_VALUE: &str = "_value";

/// Wildcard column / "all properties" marker
pub const STAR: &str = "*";

/// Prefix of every encoded property name
pub const ENCODED_NAME_PREFIX: char = 'D';

/// Edge properties every edge alias projects regardless of predicates
pub const EDGE_SOURCE: &str = "_srcV";
pub const EDGE_SINK: &str = "_sinkV";
pub const EDGE_OTHER: &str = "_otherV";
pub const EDGE_ID: &str = "_edgeId";

/// Reserved properties seeded into every edge's property list
pub const RESERVED_EDGE_PROPERTIES: [&str; 4] = [EDGE_SOURCE, EDGE_SINK, EDGE_OTHER, EDGE_ID];

/// Synthetic columns a path source reads its adjacency from
pub const OUT_ADJACENCY_LIST: &str = "OutAdjacencyList";
pub const IN_ADJACENCY_LIST: &str = "InAdjacencyList";
pub const BOTH_ADJACENCY_LIST: &str = "BothAdjacencyList";

/// Runtime helper functions that cannot be pushed into a backend query
pub const RUNTIME_FUNCTIONS: [&str; 3] = ["withinarray", "withoutarray", "hasproperty"];

/// Insert/delete target naming the vertex collection
pub const TARGET_NODE: &str = "Node";

/// Insert target naming the edge collection
pub const TARGET_EDGE: &str = "Edge";

/// Returns true if `name` is one of the runtime helper functions (case-insensitive)
pub fn is_runtime_function(name: &str) -> bool {
    RUNTIME_FUNCTIONS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(name))
}
