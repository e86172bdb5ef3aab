//! Backup cleaning.
//!
//! Removes volatile lines (timestamps, counters, banners with build info)
//! and masks secrets in a device backup before it is compared:
//! - `ConfigRemove` patterns delete every matching span
//! - `ConfigReplace` patterns substitute the matching span
//!
//! Patterns are authored for the host's regex engine and run in multi-line
//! mode, so `^`/`$` anchor on line boundaries.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

use crate::error::{ComplianceError, Result};
use crate::log_debug;
use crate::logging::structured::LogContext;
use crate::rules::model::{ConfigRemove, ConfigReplace};

lazy_static! {
    /// Host-style group references: `\1` and `\g<name>`.
    static ref HOST_GROUP_REF: Regex = Regex::new(r"\\(\d+)|\\g<(\w+)>").unwrap();
}

/// Compiled cleaning rules for one platform.
#[derive(Debug, Default)]
pub struct CleaningRules {
    removals: Vec<(String, Regex)>,
    replacements: Vec<(String, Regex, String)>,
}

impl CleaningRules {
    /// Compile the removal and replacement rules registered for `platform`.
    pub fn compile(platform: &str, removes: &[ConfigRemove], replaces: &[ConfigReplace]) -> Result<Self> {
        let mut rules = CleaningRules::default();

        for remove in removes.iter().filter(|r| r.platform == platform) {
            let regex = compile_multiline(platform, &remove.regex)?;
            rules.removals.push((remove.name.clone(), regex));
        }

        for replace in replaces.iter().filter(|r| r.platform == platform) {
            let regex = compile_multiline(platform, &replace.regex)?;
            rules.replacements.push((
                replace.name.clone(),
                regex,
                translate_replacement(&replace.replace),
            ));
        }

        Ok(rules)
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.replacements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.removals.len() + self.replacements.len()
    }
}

/// Cleaning rules for every platform that has any.
pub fn compile_platform_cleaning(
    removes: &[ConfigRemove],
    replaces: &[ConfigReplace],
) -> Result<HashMap<String, CleaningRules>> {
    let mut platforms: Vec<&str> = removes
        .iter()
        .map(|r| r.platform.as_str())
        .chain(replaces.iter().map(|r| r.platform.as_str()))
        .collect();
    platforms.sort_unstable();
    platforms.dedup();

    let mut compiled = HashMap::new();
    for platform in platforms {
        compiled.insert(
            platform.to_string(),
            CleaningRules::compile(platform, removes, replaces)?,
        );
    }
    Ok(compiled)
}

/// Apply removals, then replacements, in declaration order.
pub fn clean_config(config: &str, rules: &CleaningRules, ctx: &LogContext) -> String {
    if rules.is_empty() {
        return config.to_string();
    }

    let mut cleaned = config.to_string();

    for (name, regex) in &rules.removals {
        let hits = regex.find_iter(&cleaned).count();
        if hits > 0 {
            log_debug!(ctx, "CONFIG_LINES_REMOVED", rule = name, matches = hits);
            cleaned = regex.replace_all(&cleaned, "").into_owned();
        }
    }

    for (name, regex, replacement) in &rules.replacements {
        let hits = regex.find_iter(&cleaned).count();
        if hits > 0 {
            log_debug!(ctx, "CONFIG_LINES_REPLACED", rule = name, matches = hits);
            cleaned = regex.replace_all(&cleaned, replacement.as_str()).into_owned();
        }
    }

    cleaned
}

fn compile_multiline(platform: &str, pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|source| ComplianceError::InvalidPattern {
            platform: platform.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

/// Rewrite a host replacement template into `regex` syntax.
fn translate_replacement(template: &str) -> String {
    let escaped = template.replace('$', "$$");
    HOST_GROUP_REF
        .replace_all(&escaped, |caps: &regex::Captures| {
            let group = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            format!("${{{}}}", group)
        })
        .into_owned()
}
