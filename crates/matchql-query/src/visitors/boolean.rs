//! Boolean literal normalization for JSON query targets

use crate::ast::ValueExpr;
use crate::visit::VisitorMut;
use matchql_core::Result;

/// Lowercases unquoted boolean literals (`True` → `true`)
#[derive(Debug, Default)]
pub struct BooleanLiteralNormalizer {
    rewritten: usize,
}

impl BooleanLiteralNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of literals changed so far
    pub fn rewritten(&self) -> usize {
        self.rewritten
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl VisitorMut for BooleanLiteralNormalizer {
    fn visit_value(&mut self, value: &mut ValueExpr) -> Result<()> {
        if value.single_quoted {
            return Ok(());
        }
        if let Some(parsed) = parse_bool(&value.value) {
            let normalized = parsed.to_string();
            if normalized != value.value {
                value.value = normalized;
                self.rewritten += 1;
            }
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
    fn test_normalizes_unquoted_booleans() {
        let mut expr = BooleanExpr::and(
            BooleanExpr::compare(ScalarExpr::column(&["A", "flag"]), ComparisonOp::Equals, ScalarExpr::literal("True")),
            BooleanExpr::compare(ScalarExpr::column(&["A", "name"]), ComparisonOp::Equals, ScalarExpr::string("FALSE")),
        );
        let mut normalizer = BooleanLiteralNormalizer::new();
        rewrite(&mut expr, &mut normalizer).unwrap();

        assert_eq!(expr.to_string(), "A.flag = true AND A.name = 'FALSE'");
        assert_eq!(normalizer.rewritten(), 1);
    }

    #[test]
    fn test_numbers_untouched() {
        let mut expr =
            BooleanExpr::compare(ScalarExpr::column(&["A", "age"]), ComparisonOp::Equals, ScalarExpr::literal("27"));
        rewrite(&mut expr, &mut BooleanLiteralNormalizer::new()).unwrap();
        assert_eq!(expr.to_string(), "A.age = 27");
    }
}
