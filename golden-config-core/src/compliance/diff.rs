//! Diff result assembly.
//!
//! Turns a pair of scoped configuration elements into a compliance outcome.
//! Documents get a recursive structural diff; CLI lines get a line-set
//! difference rendered back to text with parents.

use serde_json::{Map, Value};
use similar::TextDiff;

use crate::normalize::{canonical_json, canonicalize_unordered};
use crate::parser::{diff_lines, render_with_parents, ConfigLine};
use crate::rules::resolver::IndexedRule;

use super::element::ConfigElement;
use super::outcome::ComplianceOutcome;

/// What intended has that actual lacks, and the reverse.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralDiff {
    pub missing: Value,
    pub extra: Value,
}

impl StructuralDiff {
    pub fn is_empty(&self) -> bool {
        is_empty_branch(&self.missing) && is_empty_branch(&self.extra)
    }
}

/// Recursive diff of two documents.
///
/// Keys only in `intended` land in `missing`; keys only in `actual` land in
/// `extra`; a changed leaf puts the actual value in `extra` and the intended
/// value in `missing` at the same path. Unordered sequences are compared as
/// multisets. Empty mappings never appear in the result.
pub fn structural_diff(actual: &Value, intended: &Value, ordered: bool) -> StructuralDiff {
    let (extra, missing) = diff_values(actual, intended, ordered);
    StructuralDiff {
        missing: missing.map(|v| prune_empty(&v)).unwrap_or_else(empty_map),
        extra: extra.map(|v| prune_empty(&v)).unwrap_or_else(empty_map),
    }
}

fn empty_map() -> Value {
    Value::Object(Map::new())
}

fn is_empty_branch(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

/// Returns (extra, missing) for one pair of values.
fn diff_values(actual: &Value, intended: &Value, ordered: bool) -> (Option<Value>, Option<Value>) {
    match (actual, intended) {
        (Value::Object(a), Value::Object(i)) => {
            let mut extra = Map::new();
            let mut missing = Map::new();

            for (key, a_val) in a {
                match i.get(key) {
                    None => {
                        extra.insert(key.clone(), a_val.clone());
                    }
                    Some(i_val) => {
                        let (e, m) = diff_values(a_val, i_val, ordered);
                        if let Some(e) = e {
                            extra.insert(key.clone(), e);
                        }
                        if let Some(m) = m {
                            missing.insert(key.clone(), m);
                        }
                    }
                }
            }
            for (key, i_val) in i {
                if !a.contains_key(key) {
                    missing.insert(key.clone(), i_val.clone());
                }
            }

            (non_empty_map(extra), non_empty_map(missing))
        }
        (Value::Array(a), Value::Array(i)) if !ordered => {
            let (extra, missing) = multiset_difference(a, i);
            (non_empty_list(extra), non_empty_list(missing))
        }
        _ if actual == intended => (None, None),
        _ => (Some(actual.clone()), Some(intended.clone())),
    }
}

/// Items of `actual` not matched in `intended`, and the reverse, counting
/// repetitions.
fn multiset_difference(actual: &[Value], intended: &[Value]) -> (Vec<Value>, Vec<Value>) {
    let mut pool: Vec<Option<String>> = intended.iter().map(|v| Some(canonical_json(v))).collect();
    let mut extra = Vec::new();

    for item in actual {
        let key = canonical_json(item);
        match pool.iter_mut().find(|slot| slot.as_deref() == Some(key.as_str())) {
            Some(slot) => *slot = None,
            None => extra.push(item.clone()),
        }
    }

    let missing = intended
        .iter()
        .zip(pool)
        .filter_map(|(item, slot)| slot.map(|_| item.clone()))
        .collect();
    (extra, missing)
}

fn non_empty_map(map: Map<String, Value>) -> Option<Value> {
    (!map.is_empty()).then_some(Value::Object(map))
}

fn non_empty_list(items: Vec<Value>) -> Option<Value> {
    (!items.is_empty()).then_some(Value::Array(items))
}

/// Drop empty mappings at any depth, including mappings that become empty
/// once their children are pruned.
pub fn prune_empty(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), prune_empty(v)))
                .filter(|(_, v)| !matches!(v, Value::Object(m) if m.is_empty()))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(prune_empty).collect()),
        other => other.clone(),
    }
}

/// Result of comparing two parsed CLI selections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineComparison {
    pub compliant: bool,
    pub ordered_compliant: bool,
    pub missing: String,
    pub extra: String,
}

/// Compare two selections line by line.
///
/// Unordered selections are sets, so their `missing`/`extra` text is
/// rendered sorted by lineage rather than in file order.
pub fn compare_lines(actual: &[ConfigLine], intended: &[ConfigLine], ordered: bool) -> LineComparison {
    let ordered_compliant = actual == intended;
    let mut missing_lines = diff_lines(intended, actual);
    let mut extra_lines = diff_lines(actual, intended);
    if !ordered {
        sort_by_lineage(&mut missing_lines);
        sort_by_lineage(&mut extra_lines);
    }
    let missing = render_with_parents(&missing_lines);
    let extra = render_with_parents(&extra_lines);
    let unordered_compliant = missing.is_empty() && extra.is_empty();

    LineComparison {
        compliant: if ordered { ordered_compliant } else { unordered_compliant },
        ordered_compliant,
        missing,
        extra,
    }
}

fn sort_by_lineage(lines: &mut [ConfigLine]) {
    lines.sort_by(|a, b| (&a.parents, &a.config_line).cmp(&(&b.parents, &b.config_line)));
}

/// Unified diff of the whole backup against the whole intended
/// configuration, three lines of context. Empty when they are identical.
pub fn unified_config_diff(backup: &str, intended: &str) -> String {
    let diff = TextDiff::from_lines(backup, intended);
    diff.unified_diff()
        .context_radius(3)
        .header("backup", "intended")
        .to_string()
}

/// Build the outcome for a rule from its two scoped elements.
pub fn assemble(rule: &IndexedRule, actual: ConfigElement, intended: ConfigElement) -> ComplianceOutcome {
    let ordered = rule.ordered;

    let (compliant, missing, extra) = match (&actual, &intended) {
        (ConfigElement::Lines { lines: a, .. }, ConfigElement::Lines { lines: i, .. }) => {
            let cmp = compare_lines(a, i, ordered);
            (cmp.compliant, Value::String(cmp.missing), Value::String(cmp.extra))
        }
        (ConfigElement::Document(a), ConfigElement::Document(i)) => {
            // the flag comes from the documents; pruning only shapes the payload
            let (compliant, diff) = if ordered {
                (a == i, structural_diff(a, i, true))
            } else {
                let (a, i) = (canonicalize_unordered(a), canonicalize_unordered(i));
                (a == i, structural_diff(&a, &i, false))
            };
            (compliant, diff.missing, diff.extra)
        }
        _ => {
            let a = actual.to_value();
            let i = intended.to_value();
            if a == i {
                (true, Value::String(String::new()), Value::String(String::new()))
            } else {
                (false, i, a)
            }
        }
    };

    ComplianceOutcome {
        compliance: compliant,
        compliance_int: u8::from(compliant),
        ordered,
        actual: actual.to_value(),
        intended: intended.to_value(),
        missing,
        extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::{ComplianceFeature, ComplianceRule, ConfigType};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_changed_leaf_split_between_sides() {
        let diff = structural_diff(
            &json!({"foo": {"bar-1": "baz"}}),
            &json!({"foo": {"bar-2": "baz"}}),
            false,
        );
        assert_eq!(diff.missing, json!({"foo": {"bar-2": "baz"}}));
        assert_eq!(diff.extra, json!({"foo": {"bar-1": "baz"}}));
    }

    #[test]
    fn test_value_change_records_old_and_new() {
        let diff = structural_diff(
            &json!({"ntp": {"server": "10.0.0.1", "prefer": true}}),
            &json!({"ntp": {"server": "10.0.0.2", "prefer": true}}),
            false,
        );
        assert_eq!(diff.extra, json!({"ntp": {"server": "10.0.0.1"}}));
        assert_eq!(diff.missing, json!({"ntp": {"server": "10.0.0.2"}}));
    }

    #[test]
    fn test_identical_documents_are_empty() {
        let doc = json!({"a": {"b": [1, 2, 3]}});
        let diff = structural_diff(&doc, &doc, true);
        assert!(diff.is_empty());
        assert_eq!(diff.missing, json!({}));
    }

    #[test]
    fn test_single_leaf_difference_leaves_no_empty_branches() {
        let actual = json!({"a": {"x": 1, "y": {"z": 2}}, "b": {"c": {"d": 1}}});
        let intended = json!({"a": {"x": 1, "y": {"z": 2}}, "b": {"c": {"d": 2}}});
        let diff = structural_diff(&actual, &intended, false);
        assert_eq!(diff.missing, json!({"b": {"c": {"d": 2}}}));
        assert_eq!(diff.extra, json!({"b": {"c": {"d": 1}}}));
    }

    #[test]
    fn test_unordered_lists_are_multisets() {
        let diff = structural_diff(
            &json!({"vlans": [10, 20, 20, 30]}),
            &json!({"vlans": [30, 20, 10, 40]}),
            false,
        );
        assert_eq!(diff.extra, json!({"vlans": [20]}));
        assert_eq!(diff.missing, json!({"vlans": [40]}));
    }

    #[test]
    fn test_ordered_lists_compare_whole() {
        let diff = structural_diff(&json!({"seq": [1, 2]}), &json!({"seq": [2, 1]}), true);
        assert_eq!(diff.extra, json!({"seq": [1, 2]}));
        assert_eq!(diff.missing, json!({"seq": [2, 1]}));
    }

    #[test]
    fn test_prune_removes_nested_empties() {
        assert_eq!(
            prune_empty(&json!({"a": {}, "b": {"c": {}}, "d": 1, "e": [{}]})),
            json!({"d": 1, "e": [{}]})
        );
    }

    fn json_rule(ordered: bool) -> IndexedRule {
        IndexedRule::new(ComplianceRule {
            id: Uuid::new_v4(),
            feature: ComplianceFeature {
                id: Uuid::new_v4(),
                name: "data".to_string(),
                slug: "data".to_string(),
                description: String::new(),
            },
            platform: "cisco_ios".to_string(),
            description: String::new(),
            config_ordered: ordered,
            config_remediation: false,
            match_config: String::new(),
            config_type: ConfigType::Json,
            custom_compliance: false,
        })
        .unwrap()
    }

    #[test]
    fn test_missing_key_with_empty_value_is_pruned() {
        let diff = structural_diff(&json!({"a": 1}), &json!({"a": 1, "b": {}}), false);
        assert!(diff.is_empty());

        for ordered in [false, true] {
            let outcome = assemble(
                &json_rule(ordered),
                ConfigElement::Document(json!({"a": 1, "b": {}})),
                ConfigElement::Document(json!({"a": 1})),
            );
            assert!(!outcome.compliance);
            assert_eq!(outcome.compliance_int, 0);
            assert_eq!(outcome.missing, json!({}));
            assert_eq!(outcome.extra, json!({}));
        }
    }

    #[test]
    fn test_unordered_documents_compliant_when_permuted() {
        let outcome = assemble(
            &json_rule(false),
            ConfigElement::Document(json!({"vlans": [30, 10, 20]})),
            ConfigElement::Document(json!({"vlans": [10, 20, 30]})),
        );
        assert!(outcome.compliance);
        assert!(!assemble(
            &json_rule(true),
            ConfigElement::Document(json!({"vlans": [30, 10, 20]})),
            ConfigElement::Document(json!({"vlans": [10, 20, 30]})),
        )
        .compliance);
    }

    #[test]
    fn test_compare_lines_order() {
        let a = vec![ConfigLine::top_level("ntp server 1"), ConfigLine::top_level("ntp server 2")];
        let b = vec![ConfigLine::top_level("ntp server 2"), ConfigLine::top_level("ntp server 1")];
        let unordered = compare_lines(&a, &b, false);
        assert!(unordered.compliant);
        assert!(!unordered.ordered_compliant);
        assert!(!compare_lines(&a, &b, true).compliant);
        assert!(compare_lines(&a, &a, true).compliant);
    }

    #[test]
    fn test_unified_config_diff() {
        let backup = "hostname r1\nntp server 10.0.0.9\nlogging host 10.1.1.1\n";
        let intended = "hostname r1\nntp server 10.0.0.1\nlogging host 10.1.1.1\n";
        let diff = unified_config_diff(backup, intended);

        assert!(diff.starts_with("--- backup\n+++ intended\n"));
        assert!(diff.contains("\n-ntp server 10.0.0.9\n"));
        assert!(diff.contains("\n+ntp server 10.0.0.1\n"));
        assert!(diff.contains("\n hostname r1\n"));
        assert_eq!(unified_config_diff(backup, backup), "");
    }

    #[test]
    fn test_unordered_extra_is_independent_of_file_order() {
        let intended = vec![ConfigLine::top_level("ntp server 10.0.0.1")];
        let forward = vec![
            ConfigLine::top_level("ntp server 10.0.0.1"),
            ConfigLine::top_level("ntp server 10.0.0.2"),
            ConfigLine::top_level("ntp server 10.0.0.3"),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let a = compare_lines(&forward, &intended, false);
        let b = compare_lines(&backward, &intended, false);
        assert_eq!(a, b);
        assert_eq!(a.extra, "ntp server 10.0.0.2\nntp server 10.0.0.3");
    }

    #[test]
    fn test_unordered_children_grouped_under_parents() {
        let child = |parent: &str, line: &str| ConfigLine {
            config_line: line.to_string(),
            parents: vec![parent.to_string()],
        };
        let actual = vec![
            child("interface Gi2", " shutdown"),
            child("interface Gi1", " shutdown"),
            child("interface Gi2", " mtu 9000"),
        ];
        let cmp = compare_lines(&actual, &[], false);
        assert_eq!(
            cmp.extra,
            "interface Gi1\n shutdown\ninterface Gi2\n mtu 9000\n shutdown"
        );
    }
}
