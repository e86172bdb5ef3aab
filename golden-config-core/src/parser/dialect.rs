//! CLI dialects keyed by network driver.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::error::{ComplianceError, ParserFamily, Result};

/// How a dialect expresses hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStyle {
    /// Children are indented beneath their parent line.
    Indented,
    /// Curly-brace blocks, or flat `set` lines.
    Braces,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    pub name: &'static str,
    pub style: SectionStyle,
    pub comment_prefixes: &'static [&'static str],
    /// `banner <kind> <delim>` blocks span lines until the delimiter repeats.
    pub banners: bool,
    /// Tree comparison and remediation are available.
    pub hier_config: bool,
}

const BANG: &[&str] = &["!"];

lazy_static! {
    static ref DIALECTS: HashMap<&'static str, Dialect> = {
        let mut m = HashMap::new();
        for (name, banners, hier_config) in [
            ("cisco_ios", true, true),
            ("cisco_xe", true, true),
            ("cisco_nxos", true, true),
            ("cisco_iosxr", true, true),
            ("arista_eos", true, true),
            ("aruba_aoscx", false, true),
        ] {
            m.insert(
                name,
                Dialect {
                    name,
                    style: SectionStyle::Indented,
                    comment_prefixes: BANG,
                    banners,
                    hier_config,
                },
            );
        }
        m.insert(
            "cisco_asa",
            Dialect {
                name: "cisco_asa",
                style: SectionStyle::Indented,
                comment_prefixes: &["!", ":"],
                banners: false,
                hier_config: false,
            },
        );
        m.insert(
            "juniper_junos",
            Dialect {
                name: "juniper_junos",
                style: SectionStyle::Braces,
                comment_prefixes: &["#", "/*"],
                banners: false,
                hier_config: false,
            },
        );
        m
    };
}

/// Indentation dialect used to re-read text that this crate linearized.
pub static LINEARIZED: Dialect = Dialect {
    name: "linearized",
    style: SectionStyle::Indented,
    comment_prefixes: BANG,
    banners: false,
    hier_config: true,
};

pub fn dialect_for(platform: &str) -> Option<&'static Dialect> {
    DIALECTS.get(platform)
}

pub fn supported_platforms() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = DIALECTS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Section-parser dialect for a device, or `ParserUnsupported`.
pub fn cli_dialect(platform: &str, device: &str) -> Result<&'static Dialect> {
    dialect_for(platform).ok_or_else(|| ComplianceError::ParserUnsupported {
        device: device.to_string(),
        platform: platform.to_string(),
        family: ParserFamily::Cli,
    })
}

/// Dialect for tree comparison and remediation, or `ParserUnsupported`.
pub fn hier_dialect(platform: &str, device: &str) -> Result<&'static Dialect> {
    match dialect_for(platform) {
        Some(dialect) if dialect.hier_config => Ok(dialect),
        _ => Err(ComplianceError::ParserUnsupported {
            device: device.to_string(),
            platform: platform.to_string(),
            family: ParserFamily::HierConfig,
        }),
    }
}
