use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fixed enumeration of instruction template names — one per stage
/// (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionName {
    RequirementsAnalyzer,
    ProjectPlanner,
    StoryGenerator,
    PromptGenerator,
}

impl InstructionName {
    pub fn all() -> &'static [InstructionName] {
        &[
            InstructionName::RequirementsAnalyzer,
            InstructionName::ProjectPlanner,
            InstructionName::StoryGenerator,
            InstructionName::PromptGenerator,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InstructionName::RequirementsAnalyzer => "RequirementsAnalyzer",
            InstructionName::ProjectPlanner => "ProjectPlanner",
            InstructionName::StoryGenerator => "StoryGenerator",
            InstructionName::PromptGenerator => "PromptGenerator",
        }
    }

    /// Section headers a valid template body must contain, matched
    /// case-insensitively against literal `## Title` / `# Title` lines.
    pub fn required_sections(self) -> &'static [&'static str] {
        match self {
            InstructionName::RequirementsAnalyzer => &["Role", "Task", "Output Format"],
            InstructionName::ProjectPlanner => &["Role", "Task", "Output Format"],
            InstructionName::StoryGenerator => &["Role", "Task", "Story Format"],
            InstructionName::PromptGenerator => &["Role", "Task", "Constraints"],
        }
    }
}

impl std::fmt::Display for InstructionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, versioned instruction template — the leading section of an
/// assembled prompt (spec.md Glossary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionTemplate {
    pub name: InstructionName,
    pub version: u32,
    pub body: String,
    pub required_sections: Vec<String>,
    pub last_modified: DateTime<Utc>,
    pub is_valid: bool,
}
