//! Section selection and line-set differences.

use std::collections::HashSet;

use super::lines::ConfigLine;

/// Keep top-level lines starting with any marker, together with their
/// children.
pub fn section_lines(lines: &[ConfigLine], markers: &[String]) -> Vec<ConfigLine> {
    let mut selected = Vec::new();
    let mut in_section = false;

    for line in lines {
        if line.is_top_level() {
            in_section = markers
                .iter()
                .any(|marker| line.config_line.starts_with(marker.as_str()));
        }
        if in_section {
            selected.push(line.clone());
        }
    }

    selected
}

/// Lines of `compare` that do not appear in `base`, parents included in the
/// identity.
pub fn diff_lines(compare: &[ConfigLine], base: &[ConfigLine]) -> Vec<ConfigLine> {
    let base: HashSet<&ConfigLine> = base.iter().collect();
    let mut seen = HashSet::new();
    compare
        .iter()
        .filter(|line| !base.contains(line) && seen.insert(*line))
        .cloned()
        .collect()
}

/// The lines as they appear in the configuration.
pub fn render_lines(lines: &[ConfigLine]) -> String {
    lines
        .iter()
        .map(|line| line.config_line.as_str())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Render lines with whatever parent lines are needed to place them.
///
/// A parent is written once per run of consecutive children.
pub fn render_with_parents(lines: &[ConfigLine]) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut chain: Vec<&str> = Vec::new();

    for line in lines {
        let common = chain
            .iter()
            .zip(line.parents.iter())
            .take_while(|(a, b)| **a == b.as_str())
            .count();
        for parent in &line.parents[common..] {
            out.push(parent.as_str());
        }
        out.push(line.config_line.as_str());

        chain = line.parents.iter().map(String::as_str).collect();
        chain.push(line.config_line.as_str());
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::dialect::dialect_for;
    use crate::parser::lines::parse_config;

    const RUNNING: &str = "hostname r1\nntp server 10.0.0.1\nntp server 10.0.0.2\ninterface Gi1\n description uplink\n shutdown\ninterface Gi2\n description spare\nrouter bgp 65000\n neighbor 1.1.1.1 remote-as 1\n";

    fn parsed(config: &str) -> Vec<ConfigLine> {
        parse_config(config, dialect_for("cisco_ios").unwrap())
    }

    #[test]
    fn test_section_keeps_children() {
        let lines = parsed(RUNNING);
        let selected = section_lines(&lines, &["interface".to_string()]);
        assert_eq!(
            render_lines(&selected),
            "interface Gi1\n description uplink\n shutdown\ninterface Gi2\n description spare"
        );
    }

    #[test]
    fn test_section_multiple_markers() {
        let lines = parsed(RUNNING);
        let selected = section_lines(&lines, &["ntp".to_string(), "router bgp".to_string()]);
        assert_eq!(
            render_lines(&selected),
            "ntp server 10.0.0.1\nntp server 10.0.0.2\nrouter bgp 65000\n neighbor 1.1.1.1 remote-as 1"
        );
    }

    #[test]
    fn test_diff_renders_parents_once() {
        let actual = parsed("interface Gi1\n description uplink\n");
        let intended = parsed("interface Gi1\n description core\n mtu 9000\ninterface Gi3\n shutdown\n");
        let missing = diff_lines(&intended, &actual);
        assert_eq!(
            render_with_parents(&missing),
            "interface Gi1\n description core\n mtu 9000\ninterface Gi3\n shutdown"
        );
        let extra = diff_lines(&actual, &intended);
        assert_eq!(render_with_parents(&extra), "interface Gi1\n description uplink");
    }

    #[test]
    fn test_same_child_under_different_parent_differs() {
        let actual = parsed("interface Gi1\n shutdown\n");
        let intended = parsed("interface Gi2\n shutdown\n");
        let missing = diff_lines(&intended, &actual);
        assert_eq!(missing.len(), 2);
    }
}
