//! Selector application and relinearization.

use std::collections::HashSet;

use super::lineage::LineageSelector;
use super::tree::{HConfig, HNode, LineWriter};

/// Top-level sections carried into an empty intended selection.
const INJECTED_SECTION: &str = "interface";

/// Text of every node selected by `selectors`, grouped by selector tag in
/// tag order. Selected nodes bring their descendants; a line selected by
/// more than one selector is written once.
pub fn select_text(tree: &HConfig, selectors: &[LineageSelector]) -> String {
    let mut writer = LineWriter::default();
    let mut written: HashSet<Vec<String>> = HashSet::new();

    let mut ordered: Vec<&LineageSelector> = selectors.iter().collect();
    ordered.sort_by(|a, b| a.tag.cmp(&b.tag));

    for selector in ordered {
        let mut path = Vec::new();
        collect(tree.children(), selector, &mut path, &mut writer, &mut written);
    }

    writer.finish()
}

fn collect(
    nodes: &[HNode],
    selector: &LineageSelector,
    path: &mut Vec<String>,
    writer: &mut LineWriter,
    written: &mut HashSet<Vec<String>>,
) {
    for node in nodes {
        path.push(node.text.clone());
        if selector.selects(path) {
            write_subtree(node, path, writer, written);
        } else if selector.may_descend(path) {
            collect(&node.children, selector, path, writer, written);
        }
        path.pop();
    }
}

fn write_subtree(node: &HNode, path: &mut Vec<String>, writer: &mut LineWriter, written: &mut HashSet<Vec<String>>) {
    if written.insert(path.clone()) {
        writer.emit(&path[..path.len() - 1], &node.text);
    }
    for child in &node.children {
        path.push(child.text.clone());
        write_subtree(child, path, writer, written);
        path.pop();
    }
}

/// Top-level `interface` lines of a selection, used as the intended side when
/// the intended selection is empty so remediation negates children rather
/// than whole interfaces.
pub fn injected_parents(running_selection: &str) -> String {
    running_selection
        .lines()
        .filter(|line| !line.starts_with(' ') && line.starts_with(INJECTED_SECTION))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierconfig::lineage::parse_selectors;
    use crate::parser::dialect_for;

    const RUNNING: &str = "hostname r1\ninterface Gi1\n description uplink\n shutdown\n mtu 1500\ninterface Gi2\n description spare\nflow exporter 192.0.0.1\n destination 10.0.0.9\n";

    fn tree(config: &str) -> HConfig {
        HConfig::parse(config, dialect_for("cisco_ios").unwrap())
    }

    #[test]
    fn test_selects_children_under_matching_parents() {
        let selectors = parse_selectors(
            "- match_rules:\n    - startswith: interface\n    - startswith: description\n",
        )
        .unwrap();
        assert_eq!(
            select_text(&tree(RUNNING), &selectors),
            "interface Gi1\n description uplink\ninterface Gi2\n description spare"
        );
    }

    #[test]
    fn test_selected_parent_brings_descendants() {
        let selectors = parse_selectors("- match_rules:\n    - startswith: flow exporter\n").unwrap();
        assert_eq!(
            select_text(&tree(RUNNING), &selectors),
            "flow exporter 192.0.0.1\n destination 10.0.0.9"
        );
    }

    #[test]
    fn test_overlapping_selectors_write_once() {
        let selectors = parse_selectors(
            "- match_rules:\n    - equals: interface Gi1\n- match_rules:\n    - startswith: interface\n    - equals: mtu 1500\n",
        )
        .unwrap();
        let text = select_text(&tree(RUNNING), &selectors);
        assert_eq!(text.matches("mtu 1500").count(), 1);
    }

    #[test]
    fn test_reordered_source_selects_same_text() {
        let reordered = "flow exporter 192.0.0.1\n destination 10.0.0.9\ninterface Gi2\n description spare\nhostname r1\ninterface Gi1\n description uplink\n shutdown\n mtu 1500\n";
        let selectors = parse_selectors(
            "- match_rules:\n    - startswith: interface\n    - startswith: description\n- match_rules:\n    - startswith: flow\n",
        )
        .unwrap();
        let sorted_lines = |text: String| {
            let mut lines: Vec<String> = text.lines().map(String::from).collect();
            lines.sort();
            lines
        };
        assert_eq!(
            sorted_lines(select_text(&tree(RUNNING), &selectors)),
            sorted_lines(select_text(&tree(reordered), &selectors))
        );
    }

    #[test]
    fn test_injected_parents_top_level_interfaces_only() {
        assert_eq!(
            injected_parents("interface Gi1\n description uplink\nflow exporter 1\ninterface Gi2\n"),
            "interface Gi1\ninterface Gi2"
        );
    }
}
