//! Dotted → subscript identifier conversion

use crate::ast::{ColumnReference, IdentifierStyle};
use crate::visit::VisitorMut;
use matchql_core::Result;
use std::collections::BTreeSet;

/// Switches column references to `alias['property']` rendering
///
/// Only columns bound to one of `targets` are converted; an empty target
/// set converts every column. `E_0.|id` becomes `E_0['|id']`.
#[derive(Debug, Clone, Default)]
pub struct SubscriptIdentifierConverter {
    targets: BTreeSet<String>,
}

impl SubscriptIdentifierConverter {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    /// Converter for every column
    pub fn all() -> Self {
        Self::default()
    }
}

impl VisitorMut for SubscriptIdentifierConverter {
    fn visit_column(&mut self, column: &mut ColumnReference) -> Result<()> {
        let selected = self.targets.is_empty()
            || column
                .table_reference()
                .is_some_and(|alias| self.targets.contains(alias));
        if selected {
            column.identifier.style = IdentifierStyle::Subscript;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BooleanExpr, ComparisonOp, ScalarExpr};
    use crate::visit::rewrite;

    #[test]
    fn test_converts_only_targets() {
        let mut expr = BooleanExpr::and(
            BooleanExpr::compare(ScalarExpr::column(&["E_0", "|id"]), ComparisonOp::Equals, ScalarExpr::string("e1")),
            BooleanExpr::compare(ScalarExpr::column(&["N_0", "age"]), ComparisonOp::Equals, ScalarExpr::literal("3")),
        );
        rewrite(&mut expr, &mut SubscriptIdentifierConverter::new(["E_0"])).unwrap();

        assert_eq!(expr.to_string(), "E_0['|id'] = 'e1' AND N_0.age = 3");
    }

    #[test]
    fn test_empty_targets_convert_everything() {
        let mut expr =
            BooleanExpr::compare(ScalarExpr::column(&["N_0", "age"]), ComparisonOp::Equals, ScalarExpr::literal("3"));
        rewrite(&mut expr, &mut SubscriptIdentifierConverter::all()).unwrap();

        assert_eq!(expr.to_string(), "N_0['age'] = 3");
    }
}
