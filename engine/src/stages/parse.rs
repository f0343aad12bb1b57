//! Parsers turning raw provider output into each stage's structured
//! `parsedOutput` form (spec.md §4.6 step 6).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::artifact::{DocumentSection, PromptOutput};
use crate::model::story::{Priority, UserStory};

#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    #[error("no recognizable `## <Title>` sections in output")]
    NoSections,
    #[error("no recognizable `### Story: <Title>` blocks in output")]
    NoStories,
}

static SECTION_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^##\s+(.+?)\s*$").unwrap());
static STORY_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^###\s+Story:\s*(.+?)\s*$").unwrap());

/// Splits `raw` into `## Title` / body sections, used for both the
/// Requirements Analysis and Project Planning parsers — their shapes
/// (`RequirementsDocument`, `ProjectPlan`) are structurally identical.
pub fn parse_sections(raw: &str) -> Result<Vec<DocumentSection>, ParseFailure> {
    let matches: Vec<_> = SECTION_HEADING.find_iter(raw).collect();
    if matches.is_empty() {
        return Err(ParseFailure::NoSections);
    }

    let mut sections = Vec::new();
    for (i, m) in matches.iter().enumerate() {
        let title = SECTION_HEADING
            .captures(&raw[m.start()..m.end()])
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        let body_start = m.end();
        let body_end = matches.get(i + 1).map(|n| n.start()).unwrap_or(raw.len());
        let body = raw[body_start..body_end].trim().to_string();
        sections.push(DocumentSection { title, body });
    }
    Ok(sections)
}

/// Parses a section-delimited list of stories; tolerates missing
/// optional fields by defaulting (spec.md §4.6 step 6).
pub fn parse_stories(raw: &str) -> Result<Vec<UserStory>, ParseFailure> {
    let matches: Vec<_> = STORY_HEADING.find_iter(raw).collect();
    if matches.is_empty() {
        return Err(ParseFailure::NoStories);
    }

    let mut stories = Vec::new();
    for (i, m) in matches.iter().enumerate() {
        let title = STORY_HEADING
            .captures(&raw[m.start()..m.end()])
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        let body_start = m.end();
        let body_end = matches.get(i + 1).map(|n| n.start()).unwrap_or(raw.len());
        let block = &raw[body_start..body_end];
        stories.push(parse_story_block(title, block));
    }
    Ok(stories)
}

fn parse_story_block(title: String, block: &str) -> UserStory {
    let description = field_value(block, "Description").unwrap_or_default();
    let priority = field_value(block, "Priority")
        .and_then(|v| v.parse::<Priority>().ok())
        .unwrap_or_default();
    let story_points = field_value(block, "Story Points")
        .or_else(|| field_value(block, "Estimated Complexity"))
        .and_then(|v| v.trim().parse::<i32>().ok())
        .unwrap_or(UserStory::DEFAULT_STORY_POINTS);
    let acceptance_criteria = list_field(block, "Acceptance Criteria");
    let tags = field_value(block, "Tags")
        .map(|v| v.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect())
        .unwrap_or_default();

    UserStory {
        title,
        description,
        acceptance_criteria,
        priority,
        story_points,
        tags,
    }
}

/// Finds a `Field: value` line and returns the trimmed value up to the
/// next field label or end of block.
fn field_value(block: &str, field: &str) -> Option<String> {
    let pattern = format!(r"(?mi)^\s*{}\s*:\s*(.*)$", regex::escape(field));
    let re = Regex::new(&pattern).ok()?;
    re.captures(block).map(|c| c[1].trim().to_string()).filter(|s| !s.is_empty())
}

/// Finds a `Field:` label followed by `- item` bullet lines.
fn list_field(block: &str, field: &str) -> Vec<String> {
    let pattern = format!(r"(?mi)^\s*{}\s*:\s*$", regex::escape(field));
    let Ok(label_re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    let Some(label_match) = label_re.find(block) else {
        return Vec::new();
    };

    let rest = &block[label_match.end()..];
    let bullet = Regex::new(r"(?m)^\s*[-*]\s*(.+?)\s*$").unwrap();
    let mut items = Vec::new();
    for line in rest.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match bullet.captures(line) {
            Some(cap) => items.push(cap[1].to_string()),
            None => break,
        }
    }
    items
}

pub fn parse_prompt(raw: &str) -> PromptOutput {
    PromptOutput {
        text: raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_sections() {
        let raw = "## Overview\nAn online bookstore.\n\n## Scope\nUsers browse and buy books.\n";
        let sections = parse_sections(raw).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Overview");
        assert_eq!(sections[1].body, "Users browse and buy books.");
    }

    #[test]
    fn no_sections_is_a_parse_failure() {
        assert!(matches!(parse_sections("just prose"), Err(ParseFailure::NoSections)));
    }

    #[test]
    fn parses_three_stories_with_defaults() {
        let raw = "\
### Story: User Registration
Description: Users can create an account.
Acceptance Criteria:
- Email is validated
- Password meets policy
Priority: High
Estimated Complexity: 5
Tags: auth, onboarding

### Story: User Login
Description: Users can log in.
Priority: Medium

### Story: Browse Catalog
Description: Users can browse books.
";
        let stories = parse_stories(raw).unwrap();
        assert_eq!(stories.len(), 3);
        assert_eq!(stories[0].title, "User Registration");
        assert_eq!(stories[0].acceptance_criteria.len(), 2);
        assert_eq!(stories[0].priority, Priority::High);
        assert_eq!(stories[0].story_points, 5);
        assert_eq!(stories[0].tags, vec!["auth", "onboarding"]);

        assert_eq!(stories[1].priority, Priority::Medium);
        assert_eq!(stories[1].story_points, UserStory::DEFAULT_STORY_POINTS);
        assert!(stories[1].acceptance_criteria.is_empty());

        assert_eq!(stories[2].title, "Browse Catalog");
    }
}
