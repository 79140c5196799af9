//! Variable usage checks for compiled documents
//!
//! Parses a document with the async-graphql parser and compares the variables
//! an operation declares with the variables its selection actually uses. A
//! GraphQL server rejects both an undeclared reference and an unused
//! declaration, so the two sets must be equal.

use std::collections::{BTreeMap, BTreeSet};

use async_graphql::parser::parse_query;
use async_graphql::parser::types::{OperationType, Selection, SelectionSet};
use async_graphql_value::Value;

#[derive(Debug, thiserror::Error)]
#[error("Invalid GraphQL document: {0}")]
pub struct DocumentError(pub String);

/// Declared and referenced variables of one operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableUsage {
    pub operation_name: Option<String>,
    pub is_mutation: bool,
    /// Declared variable name to its rendered type, e.g. `ID!`
    pub declared: BTreeMap<String, String>,
    pub referenced: BTreeSet<String>,
}

impl VariableUsage {
    pub fn is_consistent(&self) -> bool {
        self.declared.keys().eq(self.referenced.iter())
    }

    /// Referenced but never declared
    pub fn undeclared(&self) -> Vec<&str> {
        self.referenced
            .iter()
            .filter(|name| !self.declared.contains_key(*name))
            .map(String::as_str)
            .collect()
    }

    /// Declared but never referenced
    pub fn unused(&self) -> Vec<&str> {
        self.declared
            .keys()
            .filter(|name| !self.referenced.contains(*name))
            .map(String::as_str)
            .collect()
    }
}

fn collect_value(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Variable(name) => {
            out.insert(name.to_string());
        }
        Value::List(items) => items.iter().for_each(|item| collect_value(item, out)),
        Value::Object(fields) => fields.values().for_each(|field| collect_value(field, out)),
        _ => {}
    }
}

fn collect_selection(selection_set: &SelectionSet, out: &mut BTreeSet<String>) {
    for item in &selection_set.items {
        match &item.node {
            Selection::Field(field) => {
                for (_, value) in &field.node.arguments {
                    collect_value(&value.node, out);
                }
                collect_selection(&field.node.selection_set.node, out);
            }
            Selection::InlineFragment(fragment) => {
                collect_selection(&fragment.node.selection_set.node, out);
            }
            // Fragment definitions are walked separately
            Selection::FragmentSpread(_) => {}
        }
    }
}

/// Parse `document` and report the variable usage of its first operation.
pub fn inspect(document: &str) -> Result<VariableUsage, DocumentError> {
    let parsed = parse_query(document).map_err(|e| DocumentError(e.to_string()))?;

    let (name, operation) = parsed
        .operations
        .iter()
        .next()
        .ok_or_else(|| DocumentError("document contains no operation".to_string()))?;

    let mut usage = VariableUsage {
        operation_name: name.map(|n| n.to_string()),
        is_mutation: operation.node.ty == OperationType::Mutation,
        ..Default::default()
    };
    for definition in &operation.node.variable_definitions {
        usage.declared.insert(
            definition.node.name.node.to_string(),
            definition.node.var_type.node.to_string(),
        );
    }

    collect_selection(&operation.node.selection_set.node, &mut usage.referenced);
    for fragment in parsed.fragments.values() {
        collect_selection(&fragment.node.selection_set.node, &mut usage.referenced);
    }

    Ok(usage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_consistent_document() {
        let usage = inspect(
            "query Things($a: String, $ids: [ID]) { \
             things(filters: { or: [{ a: { eq: $a } }, { id: { in: $ids } }] }) { data { id } } }",
        )
        .unwrap();

        assert!(usage.is_consistent());
        assert_eq!(usage.operation_name.as_deref(), Some("Things"));
        assert_eq!(usage.declared.get("ids").map(String::as_str), Some("[ID]"));
    }

    #[test]
    fn test_reports_undeclared_and_unused() {
        let usage =
            inspect("query Q($unused: Int) { things(filters: { a: { eq: $missing } }) { id } }")
                .unwrap();

        assert!(!usage.is_consistent());
        assert_eq!(usage.undeclared(), vec!["missing"]);
        assert_eq!(usage.unused(), vec!["unused"]);
    }

    #[test]
    fn test_mutation_is_detected() {
        let usage = inspect("mutation M($data: XInput!) { createX(data: $data) { data { id } } }")
            .unwrap();
        assert!(usage.is_mutation);
        assert!(usage.is_consistent());
    }

    #[test]
    fn test_syntax_error() {
        assert!(inspect("query { things(filters: { a: ").is_err());
    }
}
