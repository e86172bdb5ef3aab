//! Line parsing.
//!
//! Turns CLI text into `ConfigLine`s, each carrying the chain of parent lines
//! it sits under. Lines keep their original indentation.

use std::iter::Peekable;
use std::str::Lines;

use serde::{Deserialize, Serialize};

use super::dialect::{Dialect, SectionStyle};

/// Lines emitted by `show running-config` that are not configuration.
const NOISE_PREFIXES: &[&str] = &["Building configuration", "Current configuration"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigLine {
    pub config_line: String,
    pub parents: Vec<String>,
}

impl ConfigLine {
    pub fn top_level(config_line: &str) -> Self {
        Self {
            config_line: config_line.to_string(),
            parents: Vec::new(),
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.parents.is_empty()
    }

    /// Parents followed by this line, all trimmed.
    pub fn lineage(&self) -> Vec<String> {
        self.parents
            .iter()
            .map(|p| p.trim().to_string())
            .chain(std::iter::once(self.config_line.trim().to_string()))
            .collect()
    }
}

pub fn parse_config(config: &str, dialect: &Dialect) -> Vec<ConfigLine> {
    match dialect.style {
        SectionStyle::Indented => parse_indented(config, dialect),
        SectionStyle::Braces => parse_braces(config, dialect),
    }
}

fn is_skipped(line: &str, dialect: &Dialect) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || dialect.comment_prefixes.iter().any(|p| trimmed.starts_with(p))
        || NOISE_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        || line == "end"
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn parse_indented(config: &str, dialect: &Dialect) -> Vec<ConfigLine> {
    let mut parsed = Vec::new();
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut lines = config.lines().peekable();

    while let Some(raw) = lines.next() {
        let line = raw.trim_end();
        if is_skipped(line, dialect) {
            continue;
        }

        let indent = indent_of(line);
        while stack.last().map_or(false, |(depth, _)| *depth >= indent) {
            stack.pop();
        }
        let parents: Vec<String> = stack.iter().map(|(_, text)| text.clone()).collect();

        if dialect.banners && indent == 0 && line.starts_with("banner ") {
            parsed.push(ConfigLine {
                config_line: read_banner(line, &mut lines),
                parents,
            });
            continue;
        }

        parsed.push(ConfigLine {
            config_line: line.to_string(),
            parents,
        });
        stack.push((indent, line.to_string()));
    }

    parsed
}

/// Collect a banner block into one line of text.
///
/// The delimiter is the token after `banner <kind>`: `^C` style control
/// sequences or a single character.
fn read_banner(first: &str, lines: &mut Peekable<Lines<'_>>) -> String {
    let mut tokens = first.splitn(3, ' ');
    let body = tokens.nth(2).unwrap_or_default();
    let delimiter: String = if body.starts_with('^') {
        body.chars().take(2).collect()
    } else {
        body.chars().take(1).collect()
    };

    let mut block = vec![first.to_string()];
    if delimiter.is_empty() || body[delimiter.len()..].contains(delimiter.as_str()) {
        return first.to_string();
    }

    for raw in lines.by_ref() {
        let line = raw.trim_end();
        block.push(line.to_string());
        if line.contains(delimiter.as_str()) {
            break;
        }
    }
    block.join("\n")
}

fn parse_braces(config: &str, dialect: &Dialect) -> Vec<ConfigLine> {
    let mut parsed = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    for raw in config.lines() {
        let line = raw.trim();
        if is_skipped(line, dialect) {
            continue;
        }
        if line == "}" {
            stack.pop();
            continue;
        }

        let depth = "    ".repeat(stack.len());
        if let Some(head) = line.strip_suffix('{') {
            let text = format!("{}{}", depth, head.trim_end());
            parsed.push(ConfigLine {
                config_line: text.clone(),
                parents: stack.clone(),
            });
            stack.push(text);
        } else {
            parsed.push(ConfigLine {
                config_line: format!("{}{}", depth, line.trim_end_matches(';')),
                parents: stack.clone(),
            });
        }
    }

    parsed
}
