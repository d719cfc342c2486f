//! ValueSet expansion coverage audit.
//!
//! A server can accept a ValueSet and still return an expansion that silently
//! drops whole code systems (typically because a referenced CodeSystem was
//! never uploaded). The audit compares the code systems named by the
//! composition rules against those that actually contributed concepts.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

/// Outcome of auditing one expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpansionAuditResult {
    pub contained_concept_count: usize,
    pub referenced_code_systems: BTreeSet<String>,
    pub covered_code_systems: BTreeSet<String>,
    pub missing_code_systems: BTreeSet<String>,
    pub is_valid: bool,
}

/// Audit `expansion` (a ValueSet carrying `expansion.contains`) against the
/// composition of `valueset`.
///
/// Valid only if the expansion holds at least one concept and every
/// referenced code system contributed at least one concept.
pub fn audit(valueset: &Value, expansion: &Value) -> ExpansionAuditResult {
    let referenced_code_systems = referenced_systems(valueset);

    let mut covered_code_systems = BTreeSet::new();
    let mut contained_concept_count = 0;
    if let Some(contains) = expansion
        .get("expansion")
        .and_then(|e| e.get("contains"))
        .and_then(|v| v.as_array())
    {
        collect_contains(contains, &mut contained_concept_count, &mut covered_code_systems);
    }

    let missing_code_systems: BTreeSet<String> = referenced_code_systems
        .difference(&covered_code_systems)
        .cloned()
        .collect();
    let is_valid = contained_concept_count > 0 && missing_code_systems.is_empty();

    tracing::info!(
        concepts = contained_concept_count,
        referenced = referenced_code_systems.len(),
        missing = missing_code_systems.len(),
        "Expansion contains {contained_concept_count} concept(s)"
    );

    ExpansionAuditResult {
        contained_concept_count,
        referenced_code_systems,
        covered_code_systems,
        missing_code_systems,
        is_valid,
    }
}

/// Audit against the raw text of a ValueSet. Unparseable text references no
/// code systems.
pub fn audit_content(valueset_content: &str, expansion: &Value) -> ExpansionAuditResult {
    let valueset = serde_json::from_str(valueset_content).unwrap_or(Value::Null);
    audit(&valueset, expansion)
}

/// `compose.include[].system`, regardless of filters or concept lists.
fn referenced_systems(valueset: &Value) -> BTreeSet<String> {
    valueset
        .get("compose")
        .and_then(|c| c.get("include"))
        .and_then(|v| v.as_array())
        .map(|includes| {
            includes
                .iter()
                .filter_map(|inc| inc.get("system").and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// Hierarchical expansions nest concepts under `contains`; abstract grouping
// entries without a code are not counted as concepts.
fn collect_contains(entries: &[Value], count: &mut usize, systems: &mut BTreeSet<String>) {
    for entry in entries {
        if entry.get("code").is_some() {
            *count += 1;
            if let Some(system) = entry.get("system").and_then(|v| v.as_str()) {
                systems.insert(system.to_string());
            }
        }
        if let Some(children) = entry.get("contains").and_then(|v| v.as_array()) {
            collect_contains(children, count, systems);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valueset(systems: &[&str]) -> Value {
        let include: Vec<Value> = systems.iter().map(|s| json!({"system": s})).collect();
        json!({"resourceType": "ValueSet", "compose": {"include": include}})
    }

    fn expansion(concepts: &[(&str, &str)]) -> Value {
        let contains: Vec<Value> = concepts
            .iter()
            .map(|(system, code)| json!({"system": system, "code": code}))
            .collect();
        json!({"resourceType": "ValueSet", "expansion": {"contains": contains}})
    }

    #[test]
    fn test_empty_expansion_is_invalid() {
        let result = audit(&valueset(&["http://loinc.org"]), &expansion(&[]));
        assert_eq!(result.contained_concept_count, 0);
        assert!(!result.is_valid);
        assert_eq!(
            result.missing_code_systems,
            BTreeSet::from(["http://loinc.org".to_string()])
        );
    }

    #[test]
    fn test_empty_expansion_without_composition_is_invalid() {
        let result = audit(&json!({"resourceType": "ValueSet"}), &json!({}));
        assert!(result.referenced_code_systems.is_empty());
        assert!(!result.is_valid);
    }

    #[test]
    fn test_partial_coverage_is_invalid() {
        let result = audit(
            &valueset(&["http://a", "http://b"]),
            &expansion(&[("http://a", "1"), ("http://a", "2")]),
        );
        assert_eq!(result.contained_concept_count, 2);
        assert_eq!(result.covered_code_systems, BTreeSet::from(["http://a".to_string()]));
        assert_eq!(result.missing_code_systems, BTreeSet::from(["http://b".to_string()]));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_full_coverage_is_valid() {
        let result = audit(
            &valueset(&["http://a", "http://b"]),
            &expansion(&[("http://a", "1"), ("http://b", "x")]),
        );
        assert!(result.is_valid);
        assert!(result.missing_code_systems.is_empty());
    }

    #[test]
    fn test_filtered_includes_still_reference_their_system() {
        let vs = json!({
            "resourceType": "ValueSet",
            "compose": {"include": [
                {"system": "http://snomed.info/sct",
                 "filter": [{"property": "concept", "op": "is-a", "value": "404684003"}]},
                {"valueSet": ["http://example.org/vs/other"]}
            ]}
        });
        let result = audit(&vs, &expansion(&[("http://snomed.info/sct", "22298006")]));
        assert_eq!(result.referenced_code_systems.len(), 1);
        assert!(result.is_valid);
    }

    #[test]
    fn test_nested_contains_are_counted() {
        let exp = json!({"expansion": {"contains": [
            {"abstract": true, "display": "Group", "contains": [
                {"system": "http://a", "code": "1"},
                {"system": "http://b", "code": "2", "contains": [
                    {"system": "http://b", "code": "3"}
                ]}
            ]}
        ]}});
        let result = audit(&valueset(&["http://a", "http://b"]), &exp);
        assert_eq!(result.contained_concept_count, 3);
        assert!(result.is_valid);
    }

    #[test]
    fn test_audit_content_with_unparseable_valueset() {
        let result = audit_content("{broken", &expansion(&[("http://a", "1")]));
        assert!(result.referenced_code_systems.is_empty());
        assert!(result.is_valid);
    }
}
