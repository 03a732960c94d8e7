//! Statement dispatch and emission
//!
//! Every statement is routed by kind and target:
//!
//! | Statement | Target | Code path |
//! |---|---|---|
//! | SELECT | any | select plan |
//! | INSERT | `Node` | insert vertex |
//! | INSERT | `Edge` | insert edge |
//! | DELETE EDGE | n/a | delete edge |
//! | DELETE FROM | `Node` | delete vertex |
//!
//! Any other target fails with [`Error::UnsupportedTarget`]. A relational
//! backend gets the script back as surface text with boolean literals
//! normalized; document backends get one JSON script per statement.

use crate::ast::*;
use crate::parser::parse;
use crate::planner::{SelectPlan, SelectPlanner};
use crate::visit::rewrite;
use crate::visitors::BooleanLiteralNormalizer;
use matchql_core::{keywords, Backend, CompilerConfig, Error, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, info};

/// Code path a statement is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementTarget {
    Select,
    InsertVertex,
    InsertEdge,
    DeleteVertex,
    DeleteEdge,
}

impl fmt::Display for StatementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatementTarget::Select => "select",
            StatementTarget::InsertVertex => "insert_vertex",
            StatementTarget::InsertEdge => "insert_edge",
            StatementTarget::DeleteVertex => "delete_vertex",
            StatementTarget::DeleteEdge => "delete_edge",
        };
        write!(f, "{}", s)
    }
}

/// Route a statement to its code path
pub fn dispatch(statement: &Statement) -> Result<StatementTarget> {
    match statement {
        Statement::Select(_) => Ok(StatementTarget::Select),
        Statement::Insert(insert) => match insert.target.as_str() {
            keywords::TARGET_NODE => Ok(StatementTarget::InsertVertex),
            keywords::TARGET_EDGE => Ok(StatementTarget::InsertEdge),
            other => Err(unsupported(statement, other)),
        },
        Statement::Delete(DeleteStatement::Edge(_)) => Ok(StatementTarget::DeleteEdge),
        Statement::Delete(DeleteStatement::Table(delete)) => match delete.target.as_str() {
            keywords::TARGET_NODE => Ok(StatementTarget::DeleteVertex),
            other => Err(unsupported(statement, other)),
        },
    }
}

fn unsupported(statement: &Statement, target: &str) -> Error {
    Error::UnsupportedTarget {
        statement: statement.kind().to_string(),
        target: target.to_string(),
    }
}

/// Script generated for one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementScript {
    pub target: StatementTarget,
    pub text: String,
}

/// Result of compiling a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationOutput {
    /// Rewritten script as surface text, for relational backends
    Text(String),
    /// One script per statement, for document backends
    Scripts(Vec<StatementScript>),
}

impl fmt::Display for CompilationOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilationOutput::Text(text) => write!(f, "{}", text),
            CompilationOutput::Scripts(scripts) => {
                for (i, script) in scripts.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", script.text)?;
                }
                Ok(())
            }
        }
    }
}

/// JSON document emitted for each statement
#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DocumentScript {
    Select {
        plan: SelectPlan,
    },
    InsertVertex {
        properties: Map<String, Value>,
    },
    InsertEdge {
        source: String,
        sink: String,
        properties: std::collections::BTreeMap<String, String>,
        plan: SelectPlan,
    },
    DeleteVertex {
        plan: SelectPlan,
    },
    DeleteEdge {
        edge: String,
        source: String,
        sink: String,
        plan: SelectPlan,
    },
}

/// Query compiler
///
/// Holds only an immutable configuration, so one compiler can serve
/// concurrent compilations.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Parse and compile query text
    pub fn compile_text(&self, text: &str) -> Result<CompilationOutput> {
        let script = parse(text)?;
        self.compile(&script)
    }

    /// Compile a parsed script
    pub fn compile(&self, script: &Script) -> Result<CompilationOutput> {
        let scripts = self.statement_scripts(script)?;
        info!(
            "Compiled {} statement(s) for {:?} backend",
            scripts.len(),
            self.config.backend
        );

        match self.config.backend {
            Backend::Relational => {
                let mut normalized = script.clone();
                for statement in normalized.batches.iter_mut().flat_map(|b| b.statements.iter_mut()) {
                    normalize_booleans(statement)?;
                }
                Ok(CompilationOutput::Text(normalized.to_string()))
            }
            Backend::DocumentDb | Backend::JsonServer => Ok(CompilationOutput::Scripts(scripts)),
        }
    }

    /// Compile every statement of every batch, in order
    pub fn statement_scripts(&self, script: &Script) -> Result<Vec<StatementScript>> {
        let mut scripts = Vec::new();
        for batch in &script.batches {
            for statement in &batch.statements {
                scripts.push(self.compile_statement(statement)?);
            }
        }
        Ok(scripts)
    }

    /// Compile one statement
    ///
    /// Relational backends still get every statement analyzed; the emitted
    /// text is the statement itself with boolean literals normalized.
    pub fn compile_statement(&self, statement: &Statement) -> Result<StatementScript> {
        let target = dispatch(statement)?;
        debug!("Dispatching {} statement to {}", statement.kind(), target);

        let document = match (target, statement) {
            (StatementTarget::Select, Statement::Select(select)) => DocumentScript::Select {
                plan: self.plan(select)?,
            },
            (StatementTarget::InsertVertex, Statement::Insert(insert)) => self.insert_vertex(insert)?,
            (StatementTarget::InsertEdge, Statement::Insert(insert)) => self.insert_edge(insert)?,
            (StatementTarget::DeleteVertex, Statement::Delete(DeleteStatement::Table(delete))) => {
                DocumentScript::DeleteVertex {
                    plan: self.plan(&delete_vertex_select(delete))?,
                }
            }
            (StatementTarget::DeleteEdge, Statement::Delete(DeleteStatement::Edge(delete))) => {
                DocumentScript::DeleteEdge {
                    edge: delete.edge.alias.clone(),
                    source: delete.source.clone(),
                    sink: delete.sink.clone(),
                    plan: self.plan(&delete_edge_select(delete))?,
                }
            }
            (target, statement) => {
                return Err(Error::QueryCompilation(format!(
                    "{} statement cannot be routed to {}",
                    statement.kind(),
                    target
                )));
            }
        };

        let text = match self.config.backend {
            Backend::Relational => {
                let mut normalized = statement.clone();
                normalize_booleans(&mut normalized)?;
                normalized.to_string()
            }
            Backend::DocumentDb | Backend::JsonServer if self.config.pretty_scripts => {
                serde_json::to_string_pretty(&document)?
            }
            Backend::DocumentDb | Backend::JsonServer => serde_json::to_string(&document)?,
        };

        Ok(StatementScript { target, text })
    }

    fn plan(&self, select: &SelectStatement) -> Result<SelectPlan> {
        SelectPlanner::new(&self.config).plan(select)
    }

    fn insert_vertex(&self, insert: &InsertStatement) -> Result<DocumentScript> {
        let InsertSource::Values(values) = &insert.source else {
            return Err(Error::NotImplemented("INSERT INTO Node ... SELECT".to_string()));
        };
        if values.len() != insert.columns.len() {
            return Err(Error::QueryCompilation(format!(
                "INSERT INTO {} lists {} column(s) but {} value(s)",
                insert.target,
                insert.columns.len(),
                values.len()
            )));
        }

        let flat = self.config.effective_flat_properties();
        let mut properties = Map::new();
        for (column, value) in insert.columns.iter().zip(values) {
            let value = literal_json(value)?;
            let stored = if flat.contains(column) {
                value
            } else {
                self.nest(value)
            };
            properties.insert(column.clone(), stored);
        }
        Ok(DocumentScript::InsertVertex { properties })
    }

    /// Wrap a non-flat property value in the backend's nested shape
    fn nest(&self, value: Value) -> Value {
        let mut nested = Map::new();
        nested.insert(keywords::PROPERTY_VALUE.to_string(), value);
        match self.config.backend {
            Backend::JsonServer => Value::Array(vec![Value::Object(nested)]),
            Backend::DocumentDb | Backend::Relational => Value::Object(nested),
        }
    }

    fn insert_edge(&self, insert: &InsertStatement) -> Result<DocumentScript> {
        let InsertSource::Select(select) = &insert.source else {
            return Err(Error::QueryCompilation(
                "INSERT INTO Edge needs a SELECT yielding source and sink".to_string(),
            ));
        };
        if select.elements.len() != insert.columns.len() + 2 {
            return Err(Error::QueryCompilation(format!(
                "INSERT INTO Edge selects {} element(s); expected source, sink and {} column(s)",
                select.elements.len(),
                insert.columns.len()
            )));
        }

        let endpoint = |element: &SelectElement| match &element.expr {
            ScalarExpr::Column(column) => column
                .table_reference()
                .map(str::to_string)
                .ok_or_else(|| Error::UnboundIdentifier(column.column_name().to_string())),
            other => Err(Error::QueryCompilation(format!(
                "edge endpoint must be a column reference, found {}",
                other
            ))),
        };
        let source = endpoint(&select.elements[0])?;
        let sink = endpoint(&select.elements[1])?;

        let properties = insert
            .columns
            .iter()
            .zip(&select.elements[2..])
            .map(|(column, element)| (column.clone(), element.expr.to_string()))
            .collect();

        Ok(DocumentScript::InsertEdge {
            source,
            sink,
            properties,
            plan: self.plan(select)?,
        })
    }
}

/// `DELETE FROM Node WHERE p` as `SELECT Node.* FROM Node AS Node WHERE p`
fn delete_vertex_select(delete: &DeleteTable) -> SelectStatement {
    SelectStatement {
        elements: vec![SelectElement {
            expr: ScalarExpr::Column(ColumnReference::wildcard(Some(&delete.target))),
            alias: None,
        }],
        from: Some(FromClause {
            tables: vec![TableReference::Vertex(VertexTable {
                collection: delete.target.clone(),
                alias: delete.target.clone(),
            })],
        }),
        match_clause: None,
        where_clause: delete.where_clause.clone(),
    }
}

/// `DELETE EDGE A-[E]->B FROM t WHERE p` as `SELECT A.*, B.* FROM t MATCH A-[E]->B WHERE p`
fn delete_edge_select(delete: &DeleteEdge) -> SelectStatement {
    SelectStatement {
        elements: [&delete.source, &delete.sink]
            .into_iter()
            .map(|alias| SelectElement {
                expr: ScalarExpr::Column(ColumnReference::wildcard(Some(alias))),
                alias: None,
            })
            .collect(),
        from: delete.from.clone(),
        match_clause: Some(MatchClause {
            paths: vec![MatchPath {
                steps: vec![PathStep {
                    node: delete.source.clone(),
                    edge: delete.edge.clone(),
                }],
                tail: Some(delete.sink.clone()),
                is_reversed: false,
            }],
        }),
        where_clause: delete.where_clause.clone(),
    }
}

/// JSON value of a literal INSERT value
fn literal_json(expr: &ScalarExpr) -> Result<Value> {
    match expr {
        ScalarExpr::Value(value) if value.single_quoted => Ok(Value::String(value.value.clone())),
        ScalarExpr::Value(value) => Ok(unquoted_json(&value.value)),
        ScalarExpr::Negate(inner) => match literal_json(inner)? {
            Value::Number(n) => {
                let negated = n
                    .as_i64()
                    .map(|i| json!(-i))
                    .or_else(|| n.as_f64().map(|f| json!(-f)));
                negated.ok_or_else(|| Error::QueryCompilation(format!("cannot negate {}", n)))
            }
            other => Err(Error::QueryCompilation(format!("cannot negate {}", other))),
        },
        other => Err(Error::QueryCompilation(format!(
            "INSERT values must be literals, found {}",
            other
        ))),
    }
}

fn unquoted_json(text: &str) -> Value {
    if text.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if text.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = text.parse::<i64>() {
        return json!(i);
    }
    match text.parse::<f64>() {
        Ok(f) => json!(f),
        Err(_) => Value::String(text.to_string()),
    }
}

/// Rewrite unquoted boolean literals of `statement` to `true` / `false`
fn normalize_booleans(statement: &mut Statement) -> Result<()> {
    let mut normalizer = BooleanLiteralNormalizer::new();
    match statement {
        Statement::Select(select) => rewrite(select, &mut normalizer)?,
        Statement::Insert(insert) => match &mut insert.source {
            InsertSource::Values(values) => {
                for value in values {
                    rewrite(value, &mut normalizer)?;
                }
            }
            InsertSource::Select(select) => rewrite(select.as_mut(), &mut normalizer)?,
        },
        Statement::Delete(DeleteStatement::Table(delete)) => {
            if let Some(predicate) = &mut delete.where_clause {
                rewrite(predicate, &mut normalizer)?;
            }
        }
        Statement::Delete(DeleteStatement::Edge(delete)) => {
            if let Some(from) = &mut delete.from {
                for table in &mut from.tables {
                    rewrite(table, &mut normalizer)?;
                }
            }
            if let Some(predicate) = &mut delete.where_clause {
                rewrite(predicate, &mut normalizer)?;
            }
        }
    }
    debug!("Normalized {} boolean literal(s)", normalizer.rewritten());
    Ok(())
}
