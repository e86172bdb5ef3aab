//! Lineage selectors.
//!
//! A hierarchical rule's match_config is a YAML list of tag rules:
//!
//! ```yaml
//! # hier_config
//! - match_rules:
//!     - startswith: interface
//!     - startswith: [description, mtu]
//! ```
//!
//! Each entry in `match_rules` constrains one depth of the lineage; a node
//! is selected when every level down to it matches. The selected node brings
//! all of its descendants along.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::normalize::{canonical_json, sha256_hex};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawMatchRule {
    startswith: Option<OneOrMany>,
    endswith: Option<OneOrMany>,
    equals: Option<OneOrMany>,
    contains: Option<OneOrMany>,
    re_search: Option<OneOrMany>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTagRule {
    match_rules: Vec<RawMatchRule>,
}

/// Conditions on one line of a lineage. Each populated condition must hold;
/// within a condition any listed value may match.
#[derive(Debug, Clone, Default)]
pub struct MatchRule {
    pub startswith: Vec<String>,
    pub endswith: Vec<String>,
    pub equals: Vec<String>,
    pub contains: Vec<String>,
    pub re_search: Vec<Regex>,
}

impl MatchRule {
    pub fn matches(&self, text: &str) -> bool {
        (self.startswith.is_empty() || self.startswith.iter().any(|p| text.starts_with(p.as_str())))
            && (self.endswith.is_empty() || self.endswith.iter().any(|p| text.ends_with(p.as_str())))
            && (self.equals.is_empty() || self.equals.iter().any(|p| text == p))
            && (self.contains.is_empty() || self.contains.iter().any(|p| text.contains(p.as_str())))
            && (self.re_search.is_empty() || self.re_search.iter().any(|r| r.is_match(text)))
    }
}

#[derive(Debug, Clone)]
pub struct LineageSelector {
    /// SHA-256 of the entry's canonical JSON; orders output groups.
    pub tag: String,
    pub match_rules: Vec<MatchRule>,
}

impl LineageSelector {
    /// Does `lineage` (root first) satisfy every level of this selector?
    pub fn selects(&self, lineage: &[String]) -> bool {
        lineage.len() == self.match_rules.len()
            && self
                .match_rules
                .iter()
                .zip(lineage)
                .all(|(rule, text)| rule.matches(text))
    }

    /// Could a descendant of `lineage` still be selected?
    pub fn may_descend(&self, lineage: &[String]) -> bool {
        lineage.len() < self.match_rules.len()
            && self
                .match_rules
                .iter()
                .zip(lineage)
                .all(|(rule, text)| rule.matches(text))
    }
}

/// Parse a selector document. The error is a human-readable reason.
pub fn parse_selectors(match_config: &str) -> Result<Vec<LineageSelector>, String> {
    let entries: Vec<Value> = match serde_yaml::from_str::<Option<Vec<Value>>>(match_config) {
        Ok(Some(entries)) => entries,
        Ok(None) => return Err("hier_config match_config contains no tag rules".to_string()),
        Err(e) => return Err(format!("invalid YAML in match_config: {}", e)),
    };
    if entries.is_empty() {
        return Err("hier_config match_config contains no tag rules".to_string());
    }

    let mut selectors = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        let tag = sha256_hex(&canonical_json(&entry));
        let raw: RawTagRule = serde_json::from_value(entry)
            .map_err(|e| format!("tag rule {} is not a match_rules entry: {}", idx, e))?;
        if raw.match_rules.is_empty() {
            return Err(format!("tag rule {} has an empty match_rules list", idx));
        }

        let mut match_rules = Vec::with_capacity(raw.match_rules.len());
        for rule in raw.match_rules {
            let re_search = rule
                .re_search
                .map(OneOrMany::into_vec)
                .unwrap_or_default()
                .iter()
                .map(|p| Regex::new(p).map_err(|e| format!("invalid re_search `{}`: {}", p, e)))
                .collect::<Result<Vec<_>, _>>()?;
            match_rules.push(MatchRule {
                startswith: rule.startswith.map(OneOrMany::into_vec).unwrap_or_default(),
                endswith: rule.endswith.map(OneOrMany::into_vec).unwrap_or_default(),
                equals: rule.equals.map(OneOrMany::into_vec).unwrap_or_default(),
                contains: rule.contains.map(OneOrMany::into_vec).unwrap_or_default(),
                re_search,
            });
        }
        selectors.push(LineageSelector { tag, match_rules });
    }

    selectors.sort_by(|a, b| a.tag.cmp(&b.tag));
    selectors.dedup_by(|a, b| a.tag == b.tag);
    Ok(selectors)
}
