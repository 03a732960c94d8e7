//! FROM-clause table classification

use crate::ast::{FromClause, TableReference, VertexTable};

/// Split table references into vertex tables and everything else
///
/// Order is preserved within each output.
pub fn classify_tables(tables: &[TableReference]) -> (Vec<&VertexTable>, Vec<&TableReference>) {
    let mut vertex_tables = Vec::new();
    let mut other_tables = Vec::new();

    for table in tables {
        match table {
            TableReference::Vertex(vertex) => vertex_tables.push(vertex),
            TableReference::Derived(_) | TableReference::Variable(_) | TableReference::Function(_) => {
                other_tables.push(table)
            }
        }
    }

    (vertex_tables, other_tables)
}

/// [`classify_tables`] over an optional FROM clause
pub fn classify_from(from: Option<&FromClause>) -> (Vec<&VertexTable>, Vec<&TableReference>) {
    match from {
        Some(from) => classify_tables(&from.tables),
        None => (Vec::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_statement;
    use crate::ast::Statement;

    #[test]
    fn test_classify_preserves_order() {
        let statement = parse_statement(
            "SELECT * FROM Node AS N_0, @v AS V_0, Edge AS E_0, count(N_0.id) AS F_0, Node AS N_1",
        )
        .unwrap();
        let Statement::Select(select) = statement else {
            panic!("expected select");
        };

        let (vertices, others) = classify_from(select.from.as_ref());
        let vertex_aliases: Vec<_> = vertices.iter().map(|v| v.alias.as_str()).collect();
        let other_aliases: Vec<_> = others.iter().map(|t| t.alias()).collect();

        assert_eq!(vertex_aliases, vec!["N_0", "E_0", "N_1"]);
        assert_eq!(other_aliases, vec!["V_0", "F_0"]);
    }

    #[test]
    fn test_classify_without_from() {
        let (vertices, others) = classify_from(None);
        assert!(vertices.is_empty());
        assert!(others.is_empty());
    }
}
