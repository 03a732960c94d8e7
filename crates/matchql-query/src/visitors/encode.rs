//! Property-name encoding for document backends
//!
//! Node predicates are sent to the document store with every nested
//! property addressed as `<encoded>._value`. The encoded name is part of
//! the wire contract: the store hands it back verbatim, and the returned
//! encoded → original map is how results are translated back.

use crate::ast::{ColumnReference, ColumnType, MultiPartIdentifier};
use crate::visit::VisitorMut;
use matchql_core::{keywords, CompilerConfig, Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Encode a property name into letters, digits and underscores
///
/// `D` followed by every ASCII letter or digit as is; any other UTF-16 code
/// unit becomes `_x<HEX>_` with uppercase hex and no padding.
pub fn encode(name: &str) -> String {
    let mut out = String::with_capacity(name.len() * 2 + 1);
    out.push(keywords::ENCODED_NAME_PREFIX);
    for unit in name.encode_utf16() {
        match char::from_u32(unit as u32) {
            Some(c) if c.is_ascii_alphanumeric() => out.push(c),
            _ => {
                out.push_str(&format!("_x{:X}_", unit));
            }
        }
    }
    out
}

/// Reverse of [`encode`]; `None` when `encoded` is not a valid encoding
pub fn decode(encoded: &str) -> Option<String> {
    let body = encoded.strip_prefix(keywords::ENCODED_NAME_PREFIX)?;
    let mut units: Vec<u16> = Vec::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c.is_ascii_alphanumeric() {
            units.push(c as u16);
            continue;
        }
        if c != '_' || chars.next()? != 'x' {
            return None;
        }
        let mut hex = String::new();
        loop {
            match chars.next()? {
                '_' => break,
                h => hex.push(h),
            }
        }
        units.push(u16::from_str_radix(&hex, 16).ok()?);
    }

    String::from_utf16(&units).ok()
}

/// Rewrites `alias.property` into `<encode(property)>._value`
///
/// Flat properties and columns of skipped tables are left alone. The flat
/// and skip sets are copied at construction.
#[derive(Debug, Clone)]
pub struct NodePredicateEncoder {
    flat_properties: BTreeSet<String>,
    skip_tables: BTreeSet<String>,
    referenced: BTreeMap<String, String>,
}

impl NodePredicateEncoder {
    /// Flat set is `id`, `label` and the partition key when given
    pub fn new(partition_key: Option<&str>) -> Self {
        let mut flat_properties: BTreeSet<String> = [keywords::NODE_ID, keywords::LABEL]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(key) = partition_key {
            flat_properties.insert(key.to_string());
        }
        Self {
            flat_properties,
            skip_tables: BTreeSet::new(),
            referenced: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            flat_properties: config.effective_flat_properties(),
            skip_tables: config.skip_tables.clone(),
            referenced: BTreeMap::new(),
        }
    }

    pub fn add_skip_table(&mut self, alias: &str) {
        self.skip_tables.insert(alias.to_string());
    }

    /// Encoded name → original property name, accumulated over every walk
    pub fn referenced_properties(&self) -> &BTreeMap<String, String> {
        &self.referenced
    }

    pub fn into_referenced_properties(self) -> BTreeMap<String, String> {
        self.referenced
    }
}

impl VisitorMut for NodePredicateEncoder {
    fn visit_column(&mut self, column: &mut ColumnReference) -> Result<()> {
        if column.column_type == ColumnType::Wildcard {
            return Ok(());
        }

        let parts = &column.identifier.parts;
        if parts.len() != 2 {
            return Err(Error::QueryCompilation(format!(
                "Identifier {} should be bound to a table",
                column.identifier
            )));
        }
        if self.skip_tables.contains(&parts[0]) || self.flat_properties.contains(&parts[1]) {
            return Ok(());
        }

        let original = parts[1].clone();
        let encoded = encode(&original);
        self.referenced.insert(encoded.clone(), original);

        column.identifier = MultiPartIdentifier {
            parts: vec![encoded, keywords::PROPERTY_VALUE.to_string()],
            style: column.identifier.style,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BooleanExpr, ComparisonOp, ScalarExpr};
    use crate::visit::rewrite;
    use proptest::prelude::*;

    #[test]
    fn test_encode_examples() {
        assert_eq!(encode("age"), "Dage");
        assert_eq!(encode("first name"), "Dfirst_x20_name");
        assert_eq!(encode("a.b"), "Da_x2E_b");
        assert_eq!(encode("_id"), "D_x5F_id");
        assert_eq!(encode("é"), "D_xE9_");
        assert_eq!(encode(""), "D");
    }

    #[test]
    fn test_encode_supplementary_plane_uses_surrogates() {
        assert_eq!(encode("😀"), "D_xD83D__xDE00_");
        assert_eq!(decode("D_xD83D__xDE00_").as_deref(), Some("😀"));
    }

    #[test]
    fn test_rewrites_non_flat_properties() {
        let mut expr = BooleanExpr::and(
            BooleanExpr::compare(ScalarExpr::column(&["N_0", "age"]), ComparisonOp::Equals, ScalarExpr::literal("27")),
            BooleanExpr::compare(ScalarExpr::column(&["N_0", "id"]), ComparisonOp::Equals, ScalarExpr::string("v1")),
        );
        let mut encoder = NodePredicateEncoder::new(None);
        rewrite(&mut expr, &mut encoder).unwrap();

        assert_eq!(expr.to_string(), "Dage._value = 27 AND N_0.id = 'v1'");
        assert_eq!(encoder.referenced_properties().get("Dage").map(String::as_str), Some("age"));
        assert_eq!(encoder.referenced_properties().len(), 1);
    }

    #[test]
    fn test_partition_key_and_skip_tables() {
        let config = CompilerConfig::for_document_db(Some("tenant")).skip_table("E_0");
        let mut encoder = NodePredicateEncoder::from_config(&config);

        let mut expr = BooleanExpr::and(
            BooleanExpr::compare(ScalarExpr::column(&["N_0", "tenant"]), ComparisonOp::Equals, ScalarExpr::string("t")),
            BooleanExpr::compare(ScalarExpr::column(&["E_0", "weight"]), ComparisonOp::GreaterThan, ScalarExpr::literal("1")),
        );
        rewrite(&mut expr, &mut encoder).unwrap();

        assert_eq!(expr.to_string(), "N_0.tenant = 't' AND E_0.weight > 1");
        assert!(encoder.referenced_properties().is_empty());
    }

    #[test]
    fn test_unqualified_column_fails_without_partial_rewrite() {
        let mut expr = BooleanExpr::and(
            BooleanExpr::compare(ScalarExpr::column(&["N_0", "age"]), ComparisonOp::Equals, ScalarExpr::literal("27")),
            BooleanExpr::compare(ScalarExpr::column(&["age"]), ComparisonOp::Equals, ScalarExpr::literal("3")),
        );
        let before = expr.clone();

        let err = rewrite(&mut expr, &mut NodePredicateEncoder::new(None)).unwrap_err();
        assert!(matches!(err, Error::QueryCompilation(_)));
        assert_eq!(expr, before);
    }

    proptest! {
        #[test]
        fn prop_encode_round_trips(name in "[ -~]{0,24}") {
            let encoded = encode(&name);
            prop_assert!(encoded.starts_with('D'));
            prop_assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            prop_assert_eq!(decode(&encoded), Some(name));
        }

        #[test]
        fn prop_encode_is_injective(a in "[a-z0-9._ -]{0,12}", b in "[a-z0-9._ -]{0,12}") {
            prop_assume!(a != b);
            prop_assert_ne!(encode(&a), encode(&b));
        }
    }
}
