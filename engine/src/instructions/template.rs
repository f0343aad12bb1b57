//! Required-section validation for instruction template bodies.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a Markdown ATX heading line: `#`..`######` followed by text.
static HEADING_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s*(.+?)\s*$").unwrap());

/// True if `body` contains a heading line whose text matches `title`
/// case-insensitively (spec.md §4.2: "verifies every entry in
/// `requiredSections` appears as a recognizable section header").
pub fn has_section(body: &str, title: &str) -> bool {
    HEADING_LINE
        .captures_iter(body)
        .any(|cap| cap[1].eq_ignore_ascii_case(title))
}

/// Every section in `required` that's missing from `body`, in order.
pub fn missing_sections<'a>(body: &str, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|title| !has_section(body, title))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_heading_regardless_of_level_or_case() {
        let body = "intro\n## role\nbody\n# Task\nmore";
        assert!(has_section(body, "Role"));
        assert!(has_section(body, "task"));
        assert!(!has_section(body, "Output Format"));
    }

    #[test]
    fn missing_sections_lists_only_absent_ones() {
        let body = "# Role\ntext\n# Task\ntext";
        let missing = missing_sections(body, &["Role", "Task", "Output Format"]);
        assert_eq!(missing, vec!["Output Format"]);
    }
}
