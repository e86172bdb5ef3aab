//! Tree remediation.
//!
//! Commands that move a running tree to a generated tree: negations of
//! running-only lines first, then generated-only lines, each written beneath
//! its parents.

use super::tree::{HConfig, HNode, LineWriter};

pub const DEFAULT_NEGATION: &str = "no";

/// Negate a line, or un-negate one that already carries the prefix.
pub fn negate(text: &str, negation: &str) -> String {
    let prefix = format!("{} ", negation);
    match text.strip_prefix(prefix.as_str()) {
        Some(rest) => rest.to_string(),
        None => format!("{}{}", prefix, text),
    }
}

pub fn remediation_text(running: &HConfig, generated: &HConfig, negation: &str) -> String {
    let mut writer = LineWriter::default();
    let mut path = Vec::new();
    negations(&running.root, &generated.root, negation, &mut path, &mut writer);
    additions(&generated.root, &running.root, &mut path, &mut writer);
    writer.finish()
}

fn negations(running: &HNode, generated: &HNode, negation: &str, path: &mut Vec<String>, writer: &mut LineWriter) {
    for node in &running.children {
        match generated.child(&node.text) {
            None => writer.emit(path, &negate(&node.text, negation)),
            Some(counterpart) => {
                path.push(node.text.clone());
                negations(node, counterpart, negation, path, writer);
                path.pop();
            }
        }
    }
}

fn additions(generated: &HNode, running: &HNode, path: &mut Vec<String>, writer: &mut LineWriter) {
    for node in &generated.children {
        match running.child(&node.text) {
            None => write_all(node, path, writer),
            Some(counterpart) => {
                path.push(node.text.clone());
                additions(node, counterpart, path, writer);
                path.pop();
            }
        }
    }
}

fn write_all(node: &HNode, path: &mut Vec<String>, writer: &mut LineWriter) {
    writer.emit(path, &node.text);
    path.push(node.text.clone());
    for child in &node.children {
        write_all(child, path, writer);
    }
    path.pop();
}
