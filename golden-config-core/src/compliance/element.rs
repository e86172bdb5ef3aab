//! Scoped configuration elements.

use serde_json::Value;

use crate::parser::ConfigLine;

/// The slice of a configuration one rule cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigElement {
    /// Selected CLI lines and their rendered text.
    Lines { text: String, lines: Vec<ConfigLine> },
    /// Selected keys of a JSON document.
    Document(Value),
    /// An artifact passed through untouched.
    Raw(String),
}

impl ConfigElement {
    /// The persisted form: text for CLI and raw artifacts, the document
    /// itself for JSON.
    pub fn to_value(&self) -> Value {
        match self {
            ConfigElement::Lines { text, .. } => Value::String(text.clone()),
            ConfigElement::Document(doc) => doc.clone(),
            ConfigElement::Raw(raw) => Value::String(raw.clone()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ConfigElement::Lines { text, .. } => Some(text),
            ConfigElement::Raw(raw) => Some(raw),
            ConfigElement::Document(_) => None,
        }
    }
}
