//! End-to-end compilation tests

use matchql_core::{CompilerConfig, Error};
use matchql_query::ast::Statement;
use matchql_query::{
    dispatch, parse, parse_statement, partition_blocks, CompilationOutput, Compiler, DisjointSet, StatementTarget,
};
use proptest::prelude::*;
use serde_json::Value;

const SOCIAL_QUERY: &str = "SELECT A.age FROM Node AS A, Edge AS E, Node AS B MATCH A-[E]->B WHERE A.age = 27";

fn document_scripts(query: &str) -> Vec<Value> {
    let compiler = Compiler::new(CompilerConfig::for_document_db(None::<String>));
    match compiler.compile_text(query).unwrap() {
        CompilationOutput::Scripts(scripts) => scripts
            .iter()
            .map(|s| serde_json::from_str(&s.text).unwrap())
            .collect(),
        CompilationOutput::Text(text) => panic!("expected scripts, got {}", text),
    }
}

#[test]
fn test_select_with_match_pushes_predicate_to_source_node() {
    let scripts = document_scripts(SOCIAL_QUERY);
    assert_eq!(scripts.len(), 1);

    let plan = &scripts[0]["plan"];
    assert_eq!(scripts[0]["op"], "select");
    assert_eq!(plan["blocks"].as_array().unwrap().len(), 1);

    let components = plan["blocks"][0]["components"].as_array().unwrap();
    assert_eq!(components.len(), 1);

    let nodes = components[0]["nodes"].as_array().unwrap();
    let a = nodes.iter().find(|n| n["alias"] == "A").unwrap();
    let b = nodes.iter().find(|n| n["alias"] == "B").unwrap();
    assert_eq!(a["predicate"], "Dage._value = 27");
    assert_eq!(a["starred"], true);
    assert_eq!(a["tail"], false);
    assert!(a["properties"].as_array().unwrap().iter().any(|p| p == "age"));
    assert_eq!(b["tail"], true);
    assert!(b["predicate"].is_null());

    let edge = &components[0]["edges"][0];
    assert_eq!(edge["alias"], "E");
    assert_eq!(edge["source"], "A");
    assert_eq!(edge["sink"], "B");
    assert_eq!(edge["dangling"], false);
}

#[test]
fn test_relational_backend_returns_script_text() {
    let compiler = Compiler::new(CompilerConfig::for_relational());
    let output = compiler.compile_text(SOCIAL_QUERY).unwrap();
    assert_eq!(output.to_string(), format!("{};", SOCIAL_QUERY));
}

#[test]
fn test_delete_edge_dispatch() {
    let query = "DELETE EDGE A-[E]->B FROM Node AS A, Edge AS E, Node AS B WHERE A.name = 'marko'";
    assert_eq!(dispatch(&parse_statement(query).unwrap()).unwrap(), StatementTarget::DeleteEdge);

    let scripts = document_scripts(query);
    assert_eq!(scripts[0]["op"], "delete_edge");
    assert_eq!(scripts[0]["edge"], "E");
    assert_eq!(scripts[0]["source"], "A");
    assert_eq!(scripts[0]["sink"], "B");

    let component = &scripts[0]["plan"]["blocks"][0]["components"][0];
    assert_eq!(component["edges"][0]["source"], "A");
    assert_eq!(component["edges"][0]["sink"], "B");
}

#[test]
fn test_batches_compile_in_order() {
    let scripts = document_scripts(
        "INSERT INTO Node (id, name) VALUES ('v1', 'marko');\n\
         INSERT INTO Node (id, name) VALUES ('v2', 'josh')\n\
         GO\n\
         SELECT * FROM Node AS A WHERE A.name = 'josh'",
    );
    let ops: Vec<_> = scripts.iter().map(|s| s["op"].as_str().unwrap().to_string()).collect();
    assert_eq!(ops, ["insert_vertex", "insert_vertex", "select"]);
}

#[test]
fn test_unbound_column_fails_compilation() {
    let compiler = Compiler::new(CompilerConfig::for_document_db(None::<String>));
    let err = compiler.compile_text("SELECT age FROM Node AS A").unwrap_err();
    assert!(matches!(err, Error::UnboundIdentifier(ref name) if name == "age"));
    assert!(err.is_user_error());
}

#[test]
fn test_syntax_errors_are_collected() {
    let err = parse("SELECT FROM Node A; SELECT * FROM Node B MATCH B-[E->C; SELECT * FROM Node C").unwrap_err();
    assert_eq!(err.syntax_errors().len(), 2);
    assert!(err.syntax_errors().iter().all(|e| e.line == 1));
}

fn edge_list() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..8).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..10)))
}

proptest! {
    #[test]
    fn test_components_partition_connected_nodes((n, edges) in edge_list()) {
        let nodes: Vec<String> = (0..n).map(|i| format!("N{}", i)).collect();
        let mut tables: Vec<String> = nodes.iter().map(|a| format!("Node AS {}", a)).collect();
        tables.extend((0..edges.len()).map(|k| format!("Edge AS E{}", k)));

        let mut query = format!("SELECT * FROM {}", tables.join(", "));
        if !edges.is_empty() {
            let paths: Vec<String> = edges
                .iter()
                .enumerate()
                .map(|(k, (s, t))| format!("N{}-[E{}]->N{}", s, k, t))
                .collect();
            query.push_str(" MATCH ");
            query.push_str(&paths.join(", "));
        }

        let Statement::Select(select) = parse_statement(&query).unwrap() else {
            panic!("expected select");
        };
        let mut blocks = partition_blocks(select.from.as_ref().unwrap()).unwrap();
        prop_assert_eq!(blocks.len(), 1);
        blocks[0].create_match_graph(select.match_clause.as_ref());
        let graph = blocks[0].graph().unwrap();

        let mut expected = DisjointSet::new();
        for node in &nodes {
            expected.insert(node);
        }
        for (s, t) in &edges {
            expected.union(&nodes[*s], &nodes[*t]);
        }
        let roots: std::collections::BTreeSet<String> = nodes.iter().map(|a| expected.find(a)).collect();
        prop_assert_eq!(graph.components.len(), roots.len());

        for a in &nodes {
            for b in &nodes {
                let same = graph.component_of(a) == graph.component_of(b);
                prop_assert_eq!(same, expected.connected(a, b));
            }
        }
        for (k, (s, _)) in edges.iter().enumerate() {
            let edge = format!("E{}", k);
            prop_assert_eq!(graph.component_of(&edge), graph.component_of(&nodes[*s]));
        }
    }
}
