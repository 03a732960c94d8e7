//! Tree walkers over the syntax tree
//!
//! [`Visitor`] walks a tree by shared reference, [`VisitorMut`] by mutable
//! reference. Every hook has a default that recurses through the matching
//! `walk_*` function, so an implementation overrides only the node kinds it
//! cares about and calls `walk_*` itself when it still wants the children.

use crate::ast::*;
use matchql_core::Result;

/// Read-only walker
pub trait Visitor {
    fn visit_select(&mut self, select: &SelectStatement) -> Result<()> {
        walk_select(self, select)
    }

    fn visit_table_reference(&mut self, table: &TableReference) -> Result<()> {
        walk_table_reference(self, table)
    }

    fn visit_match_path(&mut self, _path: &MatchPath) -> Result<()> {
        Ok(())
    }

    fn visit_boolean(&mut self, expr: &BooleanExpr) -> Result<()> {
        walk_boolean(self, expr)
    }

    /// EXISTS sub-predicate
    fn visit_exists(&mut self, query: &SelectStatement) -> Result<()> {
        self.visit_select(query)
    }

    fn visit_scalar(&mut self, expr: &ScalarExpr) -> Result<()> {
        walk_scalar(self, expr)
    }

    fn visit_column(&mut self, _column: &ColumnReference) -> Result<()> {
        Ok(())
    }

    fn visit_value(&mut self, _value: &ValueExpr) -> Result<()> {
        Ok(())
    }

    fn visit_function(&mut self, call: &FunctionCall) -> Result<()> {
        walk_function(self, call)
    }
}

pub fn walk_select<V: Visitor + ?Sized>(visitor: &mut V, select: &SelectStatement) -> Result<()> {
    for element in &select.elements {
        visitor.visit_scalar(&element.expr)?;
    }
    if let Some(from) = &select.from {
        for table in &from.tables {
            visitor.visit_table_reference(table)?;
        }
    }
    if let Some(match_clause) = &select.match_clause {
        for path in &match_clause.paths {
            visitor.visit_match_path(path)?;
        }
    }
    if let Some(predicate) = &select.where_clause {
        visitor.visit_boolean(predicate)?;
    }
    Ok(())
}

pub fn walk_table_reference<V: Visitor + ?Sized>(visitor: &mut V, table: &TableReference) -> Result<()> {
    match table {
        TableReference::Vertex(_) | TableReference::Variable(_) => Ok(()),
        TableReference::Derived(derived) => visitor.visit_select(&derived.query),
        TableReference::Function(function) => {
            for arg in &function.args {
                visitor.visit_scalar(arg)?;
            }
            Ok(())
        }
    }
}

pub fn walk_boolean<V: Visitor + ?Sized>(visitor: &mut V, expr: &BooleanExpr) -> Result<()> {
    match expr {
        BooleanExpr::Comparison { left, right, .. } => {
            visitor.visit_scalar(left)?;
            visitor.visit_scalar(right)
        }
        BooleanExpr::Binary { left, right, .. } => {
            visitor.visit_boolean(left)?;
            visitor.visit_boolean(right)
        }
        BooleanExpr::Not(inner) | BooleanExpr::Paren(inner) => visitor.visit_boolean(inner),
        BooleanExpr::IsNull { expr, .. } => visitor.visit_scalar(expr),
        BooleanExpr::InList { expr, list, .. } => {
            visitor.visit_scalar(expr)?;
            for item in list {
                visitor.visit_scalar(item)?;
            }
            Ok(())
        }
        BooleanExpr::Exists(query) => visitor.visit_exists(query),
        BooleanExpr::Function(call) => visitor.visit_function(call),
    }
}

pub fn walk_scalar<V: Visitor + ?Sized>(visitor: &mut V, expr: &ScalarExpr) -> Result<()> {
    match expr {
        ScalarExpr::Column(column) => visitor.visit_column(column),
        ScalarExpr::Value(value) => visitor.visit_value(value),
        ScalarExpr::Function(call) => visitor.visit_function(call),
        ScalarExpr::Binary { left, right, .. } => {
            visitor.visit_scalar(left)?;
            visitor.visit_scalar(right)
        }
        ScalarExpr::Negate(inner) | ScalarExpr::Paren(inner) => visitor.visit_scalar(inner),
        ScalarExpr::Subquery(query) => visitor.visit_select(query),
    }
}

pub fn walk_function<V: Visitor + ?Sized>(visitor: &mut V, call: &FunctionCall) -> Result<()> {
    for arg in &call.args {
        visitor.visit_scalar(arg)?;
    }
    Ok(())
}

/// In-place rewriting walker
pub trait VisitorMut {
    fn visit_select(&mut self, select: &mut SelectStatement) -> Result<()> {
        walk_select_mut(self, select)
    }

    fn visit_table_reference(&mut self, table: &mut TableReference) -> Result<()> {
        walk_table_reference_mut(self, table)
    }

    fn visit_boolean(&mut self, expr: &mut BooleanExpr) -> Result<()> {
        walk_boolean_mut(self, expr)
    }

    fn visit_exists(&mut self, query: &mut SelectStatement) -> Result<()> {
        self.visit_select(query)
    }

    fn visit_scalar(&mut self, expr: &mut ScalarExpr) -> Result<()> {
        walk_scalar_mut(self, expr)
    }

    fn visit_column(&mut self, _column: &mut ColumnReference) -> Result<()> {
        Ok(())
    }

    fn visit_value(&mut self, _value: &mut ValueExpr) -> Result<()> {
        Ok(())
    }

    fn visit_function(&mut self, call: &mut FunctionCall) -> Result<()> {
        for arg in &mut call.args {
            self.visit_scalar(arg)?;
        }
        Ok(())
    }
}

pub fn walk_select_mut<V: VisitorMut + ?Sized>(visitor: &mut V, select: &mut SelectStatement) -> Result<()> {
    for element in &mut select.elements {
        visitor.visit_scalar(&mut element.expr)?;
    }
    if let Some(from) = &mut select.from {
        for table in &mut from.tables {
            visitor.visit_table_reference(table)?;
        }
    }
    if let Some(predicate) = &mut select.where_clause {
        visitor.visit_boolean(predicate)?;
    }
    Ok(())
}

pub fn walk_table_reference_mut<V: VisitorMut + ?Sized>(
    visitor: &mut V,
    table: &mut TableReference,
) -> Result<()> {
    match table {
        TableReference::Vertex(_) | TableReference::Variable(_) => Ok(()),
        TableReference::Derived(derived) => visitor.visit_select(&mut derived.query),
        TableReference::Function(function) => {
            for arg in &mut function.args {
                visitor.visit_scalar(arg)?;
            }
            Ok(())
        }
    }
}

pub fn walk_boolean_mut<V: VisitorMut + ?Sized>(visitor: &mut V, expr: &mut BooleanExpr) -> Result<()> {
    match expr {
        BooleanExpr::Comparison { left, right, .. } => {
            visitor.visit_scalar(left)?;
            visitor.visit_scalar(right)
        }
        BooleanExpr::Binary { left, right, .. } => {
            visitor.visit_boolean(left)?;
            visitor.visit_boolean(right)
        }
        BooleanExpr::Not(inner) | BooleanExpr::Paren(inner) => visitor.visit_boolean(inner),
        BooleanExpr::IsNull { expr, .. } => visitor.visit_scalar(expr),
        BooleanExpr::InList { expr, list, .. } => {
            visitor.visit_scalar(expr)?;
            for item in list {
                visitor.visit_scalar(item)?;
            }
            Ok(())
        }
        BooleanExpr::Exists(query) => visitor.visit_exists(query),
        BooleanExpr::Function(call) => visitor.visit_function(call),
    }
}

pub fn walk_scalar_mut<V: VisitorMut + ?Sized>(visitor: &mut V, expr: &mut ScalarExpr) -> Result<()> {
    match expr {
        ScalarExpr::Column(column) => visitor.visit_column(column),
        ScalarExpr::Value(value) => visitor.visit_value(value),
        ScalarExpr::Function(call) => visitor.visit_function(call),
        ScalarExpr::Binary { left, right, .. } => {
            visitor.visit_scalar(left)?;
            visitor.visit_scalar(right)
        }
        ScalarExpr::Negate(inner) | ScalarExpr::Paren(inner) => visitor.visit_scalar(inner),
        ScalarExpr::Subquery(query) => visitor.visit_select(query),
    }
}

/// A tree fragment a visitor can be applied to
pub trait Walkable {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()>;
    fn accept_mut<V: VisitorMut + ?Sized>(&mut self, visitor: &mut V) -> Result<()>;
}

impl Walkable for BooleanExpr {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.visit_boolean(self)
    }

    fn accept_mut<V: VisitorMut + ?Sized>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.visit_boolean(self)
    }
}

impl Walkable for ScalarExpr {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.visit_scalar(self)
    }

    fn accept_mut<V: VisitorMut + ?Sized>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.visit_scalar(self)
    }
}

impl Walkable for SelectStatement {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.visit_select(self)
    }

    fn accept_mut<V: VisitorMut + ?Sized>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.visit_select(self)
    }
}

impl Walkable for TableReference {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.visit_table_reference(self)
    }

    fn accept_mut<V: VisitorMut + ?Sized>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.visit_table_reference(self)
    }
}

impl Walkable for MatchPath {
    fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.visit_match_path(self)
    }

    fn accept_mut<V: VisitorMut + ?Sized>(&mut self, _visitor: &mut V) -> Result<()> {
        Ok(())
    }
}

/// Run a rewriting visitor on a copy of `fragment`, replacing the original
/// only when the whole walk succeeds
pub fn rewrite<T, V>(fragment: &mut T, visitor: &mut V) -> Result<()>
where
    T: Walkable + Clone,
    V: VisitorMut + ?Sized,
{
    let mut working = fragment.clone();
    working.accept_mut(visitor)?;
    *fragment = working;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchql_core::Error;

    struct ColumnCounter(usize);

    impl Visitor for ColumnCounter {
        fn visit_column(&mut self, _column: &ColumnReference) -> Result<()> {
            self.0 += 1;
            Ok(())
        }
    }

    struct FailOnSecond {
        seen: usize,
    }

    impl VisitorMut for FailOnSecond {
        fn visit_column(&mut self, column: &mut ColumnReference) -> Result<()> {
            self.seen += 1;
            if self.seen == 2 {
                return Err(Error::QueryCompilation("second column".to_string()));
            }
            column.add_identifier("x");
            Ok(())
        }
    }

    fn predicate() -> BooleanExpr {
        BooleanExpr::and(
            BooleanExpr::compare(ScalarExpr::column(&["A", "x"]), ComparisonOp::Equals, ScalarExpr::literal("1")),
            BooleanExpr::compare(ScalarExpr::column(&["B", "y"]), ComparisonOp::Equals, ScalarExpr::literal("2")),
        )
    }

    #[test]
    fn test_default_walk_reaches_columns() {
        let mut counter = ColumnCounter(0);
        predicate().accept(&mut counter).unwrap();
        assert_eq!(counter.0, 2);
    }

    #[test]
    fn test_failed_rewrite_leaves_tree_untouched() {
        let mut expr = predicate();
        let before = expr.clone();

        let result = rewrite(&mut expr, &mut FailOnSecond { seen: 0 });
        assert!(result.is_err());
        assert_eq!(expr, before);
    }
}
