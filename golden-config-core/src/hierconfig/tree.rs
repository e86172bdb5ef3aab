//! Hierarchical configuration tree.

use crate::parser::{parse_config, ConfigLine, Dialect};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HNode {
    pub text: String,
    pub children: Vec<HNode>,
}

impl HNode {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            children: Vec::new(),
        }
    }

    pub fn child(&self, text: &str) -> Option<&HNode> {
        self.children.iter().find(|c| c.text == text)
    }
}

/// Root of a parsed configuration. Children keep first-seen order and are
/// unique by text under a parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HConfig {
    pub root: HNode,
}

impl HConfig {
    pub fn parse(config: &str, dialect: &Dialect) -> Self {
        Self::from_lines(&parse_config(config, dialect))
    }

    pub fn from_lines(lines: &[ConfigLine]) -> Self {
        let mut tree = HConfig::default();
        for line in lines {
            tree.insert(&line.lineage());
        }
        tree
    }

    fn insert(&mut self, lineage: &[String]) {
        let mut node = &mut self.root;
        for text in lineage {
            let idx = match node.children.iter().position(|c| &c.text == text) {
                Some(idx) => idx,
                None => {
                    node.children.push(HNode::new(text));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[idx];
        }
    }

    pub fn children(&self) -> &[HNode] {
        &self.root.children
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Every node with its trimmed lineage, depth-first.
    pub fn walk(&self) -> Vec<(Vec<String>, &HNode)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        walk_into(&self.root.children, &mut path, &mut out);
        out
    }
}

fn walk_into<'a>(nodes: &'a [HNode], path: &mut Vec<String>, out: &mut Vec<(Vec<String>, &'a HNode)>) {
    for node in nodes {
        path.push(node.text.clone());
        out.push((path.clone(), node));
        walk_into(&node.children, path, out);
        path.pop();
    }
}

/// Writes lines one space per depth, repeating parent lines only when the
/// previous line sits under a different lineage.
#[derive(Debug, Default)]
pub(crate) struct LineWriter {
    chain: Vec<String>,
    out: Vec<String>,
}

impl LineWriter {
    pub(crate) fn emit(&mut self, ancestors: &[String], text: &str) {
        let common = self
            .chain
            .iter()
            .zip(ancestors.iter())
            .take_while(|(a, b)| a == b)
            .count();
        for (depth, parent) in ancestors.iter().enumerate().skip(common) {
            self.out.push(indented(depth, parent));
        }
        self.out.push(indented(ancestors.len(), text));

        self.chain = ancestors.to_vec();
        self.chain.push(text.to_string());
    }

    pub(crate) fn finish(self) -> String {
        self.out.join("\n")
    }
}

pub fn indented(depth: usize, text: &str) -> String {
    format!("{}{}", " ".repeat(depth), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::dialect_for;

    #[test]
    fn test_duplicate_parents_merge() {
        let tree = HConfig::parse(
            "interface Gi1\n description a\ninterface Gi1\n mtu 9000\n",
            dialect_for("cisco_ios").unwrap(),
        );
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].children.len(), 2);
    }

    #[test]
    fn test_walk_yields_lineage() {
        let tree = HConfig::parse(
            "router bgp 1\n address-family ipv4\n  network 10.0.0.0\n",
            dialect_for("cisco_ios").unwrap(),
        );
        let walked: Vec<Vec<String>> = tree.walk().into_iter().map(|(p, _)| p).collect();
        assert_eq!(walked.len(), 3);
        assert_eq!(walked[2], vec!["router bgp 1", "address-family ipv4", "network 10.0.0.0"]);
    }

    #[test]
    fn test_writer_repeats_parents_only_on_change() {
        let mut w = LineWriter::default();
        let gi1 = vec!["interface Gi1".to_string()];
        w.emit(&[], "interface Gi1");
        w.emit(&gi1, "description a");
        w.emit(&gi1, "mtu 9000");
        w.emit(&["interface Gi2".to_string()], "shutdown");
        assert_eq!(
            w.finish(),
            "interface Gi1\n description a\n mtu 9000\ninterface Gi2\n shutdown"
        );
    }
}
