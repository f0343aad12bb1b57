use serde::{Deserialize, Serialize};

/// Priority assigned to a generated user story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Critical => write!(f, "Critical"),
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" | "med" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(()),
        }
    }
}

/// A single user story, persisted inside a STORIES artifact's parsed
/// output. Story identity is `(storiesArtifactId, storyIndex)` — there is
/// no independent story id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStory {
    pub title: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
    pub priority: Priority,
    pub story_points: i32,
    pub tags: Vec<String>,
}

impl UserStory {
    /// Story-points default when the generator omits an estimate — the
    /// stories parser tolerates missing optional fields (spec.md §4.6
    /// step 6).
    pub const DEFAULT_STORY_POINTS: i32 = 3;
}
