//! Syntax tree consumed by the compiler
//!
//! The tree is produced by [`crate::parser`] or built directly by a front end
//! (for example a traversal-language translator). Every node renders back to
//! surface query text through `Display`, which is how rewritten trees are
//! handed to a relational backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A parsed script: batches separated by `GO`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Script {
    pub batches: Vec<Batch>,
}

/// Statements of one batch, in source order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Batch {
    pub statements: Vec<Statement>,
}

/// A top-level statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Delete(DeleteStatement),
}

/// Coarse statement kind, before target resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Select,
    Insert,
    Delete,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Select => write!(f, "SELECT"),
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::Delete => write!(f, "DELETE"),
        }
    }
}

impl Statement {
    /// Kind of this statement
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select(_) => StatementKind::Select,
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Delete(_) => StatementKind::Delete,
        }
    }
}

/// SELECT ... FROM ... MATCH ... WHERE ...
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectStatement {
    pub elements: Vec<SelectElement>,
    pub from: Option<FromClause>,
    pub match_clause: Option<MatchClause>,
    pub where_clause: Option<BooleanExpr>,
}

/// One projected expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectElement {
    pub expr: ScalarExpr,
    pub alias: Option<String>,
}

/// FROM clause
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FromClause {
    pub tables: Vec<TableReference>,
}

/// A table reference in a FROM clause
///
/// The variant set is closed: the classifier and the partitioner match on it
/// exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableReference {
    /// Scan of a whole named collection (`Node AS N_0`, `Edge AS E_0`)
    Vertex(VertexTable),
    /// Nested sub-query (`(SELECT ...) AS T`)
    Derived(DerivedTable),
    /// Previously bound intermediate result (`@v AS T`)
    Variable(VariableTable),
    /// Table-valued operator invocation (`aggregate(N_0.name) AS A_0`)
    Function(FunctionTable),
}

impl TableReference {
    /// The alias this reference is bound to
    pub fn alias(&self) -> &str {
        match self {
            TableReference::Vertex(t) => &t.alias,
            TableReference::Derived(t) => &t.alias,
            TableReference::Variable(t) => &t.alias,
            TableReference::Function(t) => &t.alias,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexTable {
    pub collection: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedTable {
    pub query: Box<SelectStatement>,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableTable {
    pub variable: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTable {
    pub name: String,
    pub args: Vec<ScalarExpr>,
    pub alias: String,
}

/// MATCH clause: a list of path expressions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchClause {
    pub paths: Vec<MatchPath>,
}

/// One path expression
///
/// `steps` are always stored in edge direction (source node first). A path
/// written right-to-left (`A<-[E]-B`) is stored as `B -[E]-> A` with
/// `is_reversed` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPath {
    pub steps: Vec<PathStep>,
    pub tail: Option<String>,
    pub is_reversed: bool,
}

impl MatchPath {
    /// Alias of the node following step `index`, or the tail for the last step
    pub fn next_node(&self, index: usize) -> Option<&str> {
        match self.steps.get(index + 1) {
            Some(step) => Some(step.node.as_str()),
            None => self.tail.as_deref(),
        }
    }
}

/// A (node, edge) pair of a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub node: String,
    pub edge: EdgeReference,
}

/// Adjacency list an edge is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Out,
    In,
    Both,
}

/// Typed edge reference inside a path step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeReference {
    pub alias: String,
    pub edge_type: EdgeType,
    pub min_length: u32,
    /// `None` means unbounded
    pub max_length: Option<u32>,
    pub attributes: BTreeMap<String, ValueExpr>,
}

impl EdgeReference {
    /// A single-hop edge reference with no attribute filter
    pub fn single(alias: &str, edge_type: EdgeType) -> Self {
        Self {
            alias: alias.to_string(),
            edge_type,
            min_length: 1,
            max_length: Some(1),
            attributes: BTreeMap::new(),
        }
    }

    /// True when the hop bounds are exactly [1,1]
    pub fn is_single_hop(&self) -> bool {
        self.min_length == 1 && self.max_length == Some(1)
    }
}

/// INSERT INTO target (columns) VALUES (...) | SELECT ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub target: String,
    pub columns: Vec<String>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertSource {
    Values(Vec<ScalarExpr>),
    Select(Box<SelectStatement>),
}

/// DELETE statement, split by sub-kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeleteStatement {
    /// DELETE FROM target WHERE ...
    Table(DeleteTable),
    /// DELETE EDGE A-[E]->B FROM ... WHERE ...
    Edge(DeleteEdge),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteTable {
    pub target: String,
    pub where_clause: Option<BooleanExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteEdge {
    pub source: String,
    pub edge: EdgeReference,
    pub sink: String,
    pub from: Option<FromClause>,
    pub where_clause: Option<BooleanExpr>,
}

/// Scalar expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarExpr {
    Column(ColumnReference),
    Value(ValueExpr),
    Function(FunctionCall),
    Binary {
        left: Box<ScalarExpr>,
        op: ArithmeticOp,
        right: Box<ScalarExpr>,
    },
    Negate(Box<ScalarExpr>),
    Paren(Box<ScalarExpr>),
    Subquery(Box<SelectStatement>),
}

impl ScalarExpr {
    /// Dotted column reference built from its parts
    pub fn column(parts: &[&str]) -> Self {
        ScalarExpr::Column(ColumnReference::new(parts))
    }

    /// Unquoted literal (numbers, booleans, NULL)
    pub fn literal(value: &str) -> Self {
        ScalarExpr::Value(ValueExpr {
            value: value.to_string(),
            single_quoted: false,
        })
    }

    /// Single-quoted string literal
    pub fn string(value: &str) -> Self {
        ScalarExpr::Value(ValueExpr {
            value: value.to_string(),
            single_quoted: true,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

/// Regular column or `alias.*`/`*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Regular,
    Wildcard,
}

/// How a multi-part identifier renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdentifierStyle {
    /// `alias.property`
    #[default]
    Dotted,
    /// `alias['property']`
    Subscript,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiPartIdentifier {
    pub parts: Vec<String>,
    pub style: IdentifierStyle,
}

impl MultiPartIdentifier {
    pub fn new(parts: &[&str]) -> Self {
        Self {
            parts: parts.iter().map(|p| p.to_string()).collect(),
            style: IdentifierStyle::Dotted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReference {
    pub identifier: MultiPartIdentifier,
    pub column_type: ColumnType,
}

impl ColumnReference {
    /// Regular column reference
    pub fn new(parts: &[&str]) -> Self {
        Self {
            identifier: MultiPartIdentifier::new(parts),
            column_type: ColumnType::Regular,
        }
    }

    /// `alias.*`, or `*` when no qualifier is given
    pub fn wildcard(qualifier: Option<&str>) -> Self {
        Self {
            identifier: MultiPartIdentifier::new(&qualifier.into_iter().collect::<Vec<_>>()),
            column_type: ColumnType::Wildcard,
        }
    }

    /// The table alias this column is bound to
    pub fn table_reference(&self) -> Option<&str> {
        let parts = &self.identifier.parts;
        match self.column_type {
            ColumnType::Wildcard => parts.first().map(String::as_str),
            ColumnType::Regular if parts.len() >= 2 => Some(parts[0].as_str()),
            ColumnType::Regular => None,
        }
    }

    /// The referenced column (property) name
    pub fn column_name(&self) -> &str {
        let parts = &self.identifier.parts;
        match (self.column_type, parts.len()) {
            (ColumnType::Wildcard, _) => "*",
            (_, 0) => "",
            (_, 1) => &parts[0],
            _ => &parts[1],
        }
    }

    /// Append a trailing identifier segment
    pub fn add_identifier(&mut self, part: &str) {
        self.identifier.parts.push(part.to_string());
    }
}

/// Literal value as written in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueExpr {
    pub value: String,
    pub single_quoted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<ScalarExpr>,
}

/// Boolean expression (WHERE clauses, predicates)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BooleanExpr {
    Comparison {
        left: ScalarExpr,
        op: ComparisonOp,
        right: ScalarExpr,
    },
    Binary {
        left: Box<BooleanExpr>,
        op: BooleanOp,
        right: Box<BooleanExpr>,
    },
    Not(Box<BooleanExpr>),
    Paren(Box<BooleanExpr>),
    IsNull {
        expr: ScalarExpr,
        negated: bool,
    },
    InList {
        expr: ScalarExpr,
        list: Vec<ScalarExpr>,
        negated: bool,
    },
    Exists(Box<SelectStatement>),
    Function(FunctionCall),
}

impl BooleanExpr {
    /// `left op right` comparison
    pub fn compare(left: ScalarExpr, op: ComparisonOp, right: ScalarExpr) -> Self {
        BooleanExpr::Comparison { left, op, right }
    }

    /// `left AND right`
    pub fn and(left: BooleanExpr, right: BooleanExpr) -> Self {
        BooleanExpr::Binary {
            left: Box::new(left),
            op: BooleanOp::And,
            right: Box::new(right),
        }
    }

    /// Split a conjunction into its conjuncts, looking through parentheses
    pub fn conjuncts(&self) -> Vec<&BooleanExpr> {
        match self {
            BooleanExpr::Binary {
                left,
                op: BooleanOp::And,
                right,
            } => {
                let mut out = left.conjuncts();
                out.extend(right.conjuncts());
                out
            }
            BooleanExpr::Paren(inner) if matches!(**inner, BooleanExpr::Binary { op: BooleanOp::And, .. }) => {
                inner.conjuncts()
            }
            other => vec![other],
        }
    }

    /// Fold predicates back into one conjunction
    pub fn conjunction(predicates: Vec<BooleanExpr>) -> Option<BooleanExpr> {
        predicates.into_iter().reduce(BooleanExpr::and)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equals,
    NotEquals,
    LessThan,
    LessEquals,
    GreaterThan,
    GreaterEquals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOp {
    And,
    Or,
}

// ========== Serialization back to surface text ==========

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, batch) in self.batches.iter().enumerate() {
            if i > 0 {
                write!(f, "\nGO\n")?;
            }
            write!(f, "{}", batch)?;
        }
        Ok(())
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{};", statement)?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(s) => write!(f, "{}", s),
            Statement::Insert(s) => write!(f, "{}", s),
            Statement::Delete(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        write_list(f, &self.elements)?;
        if let Some(from) = &self.from {
            write!(f, " {}", from)?;
        }
        if let Some(m) = &self.match_clause {
            write!(f, " {}", m)?;
        }
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {}", w)?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM ")?;
        write_list(f, &self.tables)
    }
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableReference::Vertex(t) => write!(f, "{} AS {}", t.collection, t.alias),
            TableReference::Derived(t) => write!(f, "({}) AS {}", t.query, t.alias),
            TableReference::Variable(t) => write!(f, "@{} AS {}", t.variable, t.alias),
            TableReference::Function(t) => {
                write!(f, "{}(", t.name)?;
                write_list(f, &t.args)?;
                write!(f, ") AS {}", t.alias)
            }
        }
    }
}

impl fmt::Display for MatchClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MATCH ")?;
        write_list(f, &self.paths)
    }
}

impl fmt::Display for EdgeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.alias)?;
        if !self.is_single_hop() {
            write!(f, "*{}..", self.min_length)?;
            if let Some(max) = self.max_length {
                write!(f, "{}", max)?;
            }
        }
        if !self.attributes.is_empty() {
            write!(f, " {{")?;
            for (i, (k, v)) in self.attributes.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", k, v)?;
            }
            write!(f, "}}")?;
        }
        write!(f, "]")
    }
}

fn forward_connector(edge: &EdgeReference) -> (&'static str, &'static str) {
    match edge.edge_type {
        EdgeType::Out => ("-", "->"),
        EdgeType::In => ("-", "<-"),
        EdgeType::Both => ("-", "-"),
    }
}

impl fmt::Display for MatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_reversed {
            // Written right-to-left: start from the tail and walk steps backwards
            if let Some(tail) = &self.tail {
                write!(f, "{}", tail)?;
            }
            for step in self.steps.iter().rev() {
                write!(f, "<-{}-{}", step.edge, step.node)?;
            }
            return Ok(());
        }

        if self.steps.is_empty() {
            if let Some(tail) = &self.tail {
                write!(f, "{}", tail)?;
            }
            return Ok(());
        }

        for (i, step) in self.steps.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", step.node)?;
            }
            let (open, close) = forward_connector(&step.edge);
            write!(f, "{}{}{}", open, step.edge, close)?;
            if let Some(next) = self.next_node(i) {
                write!(f, "{}", next)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for InsertStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INSERT INTO {}", self.target)?;
        if !self.columns.is_empty() {
            write!(f, " (")?;
            write_list(f, &self.columns)?;
            write!(f, ")")?;
        }
        match &self.source {
            InsertSource::Values(values) => {
                write!(f, " VALUES (")?;
                write_list(f, values)?;
                write!(f, ")")
            }
            InsertSource::Select(select) => write!(f, " {}", select),
        }
    }
}

impl fmt::Display for DeleteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteStatement::Table(d) => {
                write!(f, "DELETE FROM {}", d.target)?;
                if let Some(w) = &d.where_clause {
                    write!(f, " WHERE {}", w)?;
                }
                Ok(())
            }
            DeleteStatement::Edge(d) => {
                let (open, close) = forward_connector(&d.edge);
                write!(f, "DELETE EDGE {}{}{}{}{}", d.source, open, d.edge, close, d.sink)?;
                if let Some(from) = &d.from {
                    write!(f, " {}", from)?;
                }
                if let Some(w) = &d.where_clause {
                    write!(f, " WHERE {}", w)?;
                }
                Ok(())
            }
        }
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

impl fmt::Display for MultiPartIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.style {
            IdentifierStyle::Dotted => write!(f, "{}", self.parts.join(".")),
            IdentifierStyle::Subscript => {
                let mut parts = self.parts.iter();
                if let Some(first) = parts.next() {
                    write!(f, "{}", first)?;
                }
                for part in parts {
                    if part == "*" {
                        write!(f, "[*]")?;
                    } else {
                        write!(f, "['{}']", escape_quotes(part))?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for ColumnReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column_type {
            ColumnType::Regular => write!(f, "{}", self.identifier),
            ColumnType::Wildcard if self.identifier.parts.is_empty() => write!(f, "*"),
            ColumnType::Wildcard => write!(f, "{}.*", self.identifier),
        }
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.single_quoted {
            write!(f, "'{}'", escape_quotes(&self.value))
        } else {
            write!(f, "{}", self.value)
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        write_list(f, &self.args)?;
        write!(f, ")")
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Modulo => "%",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::Column(c) => write!(f, "{}", c),
            ScalarExpr::Value(v) => write!(f, "{}", v),
            ScalarExpr::Function(call) => write!(f, "{}", call),
            ScalarExpr::Binary { left, op, right } => write!(f, "{} {} {}", left, op, right),
            ScalarExpr::Negate(inner) => write!(f, "-{}", inner),
            ScalarExpr::Paren(inner) => write!(f, "({})", inner),
            ScalarExpr::Subquery(query) => write!(f, "({})", query),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonOp::Equals => "=",
            ComparisonOp::NotEquals => "<>",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessEquals => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterEquals => ">=",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for BooleanExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BooleanExpr::Comparison { left, op, right } => write!(f, "{} {} {}", left, op, right),
            BooleanExpr::Binary { left, op, right } => {
                let op = match op {
                    BooleanOp::And => "AND",
                    BooleanOp::Or => "OR",
                };
                write!(f, "{} {} {}", left, op, right)
            }
            BooleanExpr::Not(inner) => write!(f, "NOT {}", inner),
            BooleanExpr::Paren(inner) => write!(f, "({})", inner),
            BooleanExpr::IsNull { expr, negated } => {
                write!(f, "{} IS {}NULL", expr, if *negated { "NOT " } else { "" })
            }
            BooleanExpr::InList { expr, list, negated } => {
                write!(f, "{} {}IN (", expr, if *negated { "NOT " } else { "" })?;
                write_list(f, list)?;
                write!(f, ")")
            }
            BooleanExpr::Exists(query) => write!(f, "EXISTS ({})", query),
            BooleanExpr::Function(call) => write!(f, "{}", call),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_reference_parts() {
        let col = ColumnReference::new(&["N_0", "age"]);
        assert_eq!(col.table_reference(), Some("N_0"));
        assert_eq!(col.column_name(), "age");

        let bare = ColumnReference::new(&["age"]);
        assert_eq!(bare.table_reference(), None);

        let star = ColumnReference::wildcard(Some("N_0"));
        assert_eq!(star.to_string(), "N_0.*");
        assert_eq!(ColumnReference::wildcard(None).to_string(), "*");
    }

    #[test]
    fn test_subscript_rendering() {
        let mut col = ColumnReference::new(&["E_0", "|id"]);
        col.identifier.style = IdentifierStyle::Subscript;
        assert_eq!(col.to_string(), "E_0['|id']");

        col.add_identifier("*");
        col.add_identifier("_value");
        assert_eq!(col.to_string(), "E_0['|id'][*]['_value']");
    }

    #[test]
    fn test_path_rendering() {
        let path = MatchPath {
            steps: vec![
                PathStep {
                    node: "A".to_string(),
                    edge: EdgeReference::single("E", EdgeType::Out),
                },
                PathStep {
                    node: "B".to_string(),
                    edge: EdgeReference {
                        min_length: 1,
                        max_length: None,
                        ..EdgeReference::single("P", EdgeType::Both)
                    },
                },
            ],
            tail: Some("C".to_string()),
            is_reversed: false,
        };
        assert_eq!(path.to_string(), "A-[E]->B-[P*1..]-C");

        let reversed = MatchPath {
            steps: vec![PathStep {
                node: "B".to_string(),
                edge: EdgeReference::single("E", EdgeType::Out),
            }],
            tail: Some("A".to_string()),
            is_reversed: true,
        };
        assert_eq!(reversed.to_string(), "A<-[E]-B");
    }

    #[test]
    fn test_conjuncts_look_through_parentheses() {
        let a = BooleanExpr::compare(ScalarExpr::column(&["A", "x"]), ComparisonOp::Equals, ScalarExpr::literal("1"));
        let b = BooleanExpr::compare(ScalarExpr::column(&["B", "y"]), ComparisonOp::Equals, ScalarExpr::literal("2"));
        let c = BooleanExpr::compare(ScalarExpr::column(&["C", "z"]), ComparisonOp::Equals, ScalarExpr::literal("3"));
        let expr = BooleanExpr::and(a.clone(), BooleanExpr::Paren(Box::new(BooleanExpr::and(b.clone(), c.clone()))));

        let conjuncts = expr.conjuncts();
        assert_eq!(conjuncts, vec![&a, &b, &c]);
        assert_eq!(expr.to_string(), "A.x = 1 AND (B.y = 2 AND C.z = 3)");
    }
}
