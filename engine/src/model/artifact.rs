use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ids::{ArtifactId, ProjectId, ReviewId};
use crate::model::story::UserStory;

/// One of the four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Req,
    Plan,
    Stories,
    Prompt,
}

impl Stage {
    pub fn ordered() -> &'static [Stage] {
        &[Stage::Req, Stage::Plan, Stage::Stories, Stage::Prompt]
    }

    /// Stage directly upstream of this one, if any.
    pub fn parent_stage(self) -> Option<Stage> {
        match self {
            Stage::Req => None,
            Stage::Plan => Some(Stage::Req),
            Stage::Stories => Some(Stage::Plan),
            Stage::Prompt => Some(Stage::Stories),
        }
    }

    /// Every upstream stage required before this stage can assemble
    /// context, oldest first — spec.md §4.5's required-upstream table.
    pub fn required_upstreams(self) -> &'static [Stage] {
        match self {
            Stage::Req => &[],
            Stage::Plan => &[Stage::Req],
            Stage::Stories => &[Stage::Req, Stage::Plan],
            Stage::Prompt => &[Stage::Req, Stage::Plan, Stage::Stories],
        }
    }

    pub fn instruction_name(self) -> InstructionNameForStage {
        match self {
            Stage::Req => InstructionNameForStage::RequirementsAnalyzer,
            Stage::Plan => InstructionNameForStage::ProjectPlanner,
            Stage::Stories => InstructionNameForStage::StoryGenerator,
            Stage::Prompt => InstructionNameForStage::PromptGenerator,
        }
    }

    pub fn section_header(self) -> &'static str {
        match self {
            Stage::Req => "# Requirements Analysis Content",
            Stage::Plan => "# Project Planning Content",
            Stage::Stories => "# User Stories Content",
            Stage::Prompt => "# Per-Story Prompt Content",
        }
    }
}

/// Re-exported alias so callers can write `Stage::Req.instruction_name()`
/// without importing the instruction module directly.
pub type InstructionNameForStage = crate::model::instruction::InstructionName;

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Req => write!(f, "REQ"),
            Stage::Plan => write!(f, "PLAN"),
            Stage::Stories => write!(f, "STORIES"),
            Stage::Prompt => write!(f, "PROMPT"),
        }
    }
}

/// Lifecycle status of a StageArtifact — spec.md §3 invariant 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Processing,
    PendingReview,
    Approved,
    Rejected,
    Failed,
}

impl ArtifactStatus {
    /// Whether `self -> next` is a legal transition under invariant 1.
    pub fn can_transition_to(self, next: ArtifactStatus) -> bool {
        use ArtifactStatus::*;
        matches!(
            (self, next),
            (Processing, PendingReview)
                | (Processing, Failed)
                | (PendingReview, Approved)
                | (PendingReview, Rejected)
        )
    }

    /// Non-terminal statuses participate in invariant 5's uniqueness
    /// guarantee and invariant 4's reviewId requirement.
    pub fn is_terminal(self) -> bool {
        matches!(self, ArtifactStatus::Approved | ArtifactStatus::Rejected | ArtifactStatus::Failed)
    }

    pub fn requires_review_id(self) -> bool {
        matches!(
            self,
            ArtifactStatus::PendingReview | ArtifactStatus::Approved | ArtifactStatus::Rejected
        )
    }
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactStatus::Processing => write!(f, "Processing"),
            ArtifactStatus::PendingReview => write!(f, "PendingReview"),
            ArtifactStatus::Approved => write!(f, "Approved"),
            ArtifactStatus::Rejected => write!(f, "Rejected"),
            ArtifactStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// One titled section of a REQ or PLAN document — the structural unit
/// both the requirements analyzer and the project planner emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSection {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequirementsDocument {
    pub sections: Vec<DocumentSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectPlan {
    pub sections: Vec<DocumentSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoriesOutput {
    pub stories: Vec<UserStory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutput {
    pub text: String,
}

/// The stage-specific structured form of an artifact's parsed output.
/// Absent while the artifact is Processing or after a parse/provider
/// failure (Failed retains only `raw_output`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ParsedOutput {
    Req(RequirementsDocument),
    Plan(ProjectPlan),
    Stories(StoriesOutput),
    Prompt(PromptOutput),
}

impl ParsedOutput {
    pub fn stage(&self) -> Stage {
        match self {
            ParsedOutput::Req(_) => Stage::Req,
            ParsedOutput::Plan(_) => Stage::Plan,
            ParsedOutput::Stories(_) => Stage::Stories,
            ParsedOutput::Prompt(_) => Stage::Prompt,
        }
    }

    pub fn as_stories(&self) -> Option<&StoriesOutput> {
        match self {
            ParsedOutput::Stories(s) => Some(s),
            _ => None,
        }
    }

    /// Render the upstream-facing prose used by the Context Assembler
    /// (the section body that follows the stable header).
    pub fn render_for_context(&self) -> String {
        match self {
            ParsedOutput::Req(doc) => render_sections(&doc.sections),
            ParsedOutput::Plan(plan) => render_sections(&plan.sections),
            ParsedOutput::Stories(out) => render_stories(&out.stories),
            ParsedOutput::Prompt(p) => p.text.clone(),
        }
    }
}

fn render_sections(sections: &[DocumentSection]) -> String {
    sections
        .iter()
        .map(|s| format!("## {}\n{}", s.title, s.body))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_stories(stories: &[UserStory]) -> String {
    stories
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "## Story {}: {}\n{}\nAcceptance Criteria:\n{}\nPriority: {} | Points: {} | Tags: {}",
                i,
                s.title,
                s.description,
                s.acceptance_criteria
                    .iter()
                    .map(|c| format!("- {c}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
                s.priority,
                s.story_points,
                s.tags.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Stage-specific fields carried only by PROMPT artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptExtras {
    pub story_index: usize,
    pub technical_preferences: HashMap<String, String>,
}

/// A durable record of one stage's input, raw provider output, parsed
/// output, and review status — spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageArtifact {
    pub id: ArtifactId,
    pub project_id: ProjectId,
    pub stage: Stage,
    pub parent_artifact_id: Option<ArtifactId>,
    pub status: ArtifactStatus,
    pub review_id: Option<ReviewId>,
    pub raw_output: Option<String>,
    pub parsed_output: Option<ParsedOutput>,
    /// Populated only for PROMPT artifacts (spec.md §3 PROMPT variant).
    pub prompt_extras: Option<PromptExtras>,
    /// Reason recorded when `status == Failed` (provider error, parse
    /// error, cancellation, instruction-invalid — spec.md §7).
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StageArtifact {
    pub fn new_processing(
        project_id: ProjectId,
        stage: Stage,
        parent_artifact_id: Option<ArtifactId>,
        prompt_extras: Option<PromptExtras>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ArtifactId::new(),
            project_id,
            stage,
            parent_artifact_id,
            status: ArtifactStatus::Processing,
            review_id: None,
            raw_output: None,
            parsed_output: None,
            prompt_extras,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The `(projectId, stage, parentArtifactId, storyIndex?)` group key
    /// used to enforce invariant 5's single-non-terminal-artifact rule.
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            project_id: self.project_id,
            stage: self.stage,
            parent_artifact_id: self.parent_artifact_id,
            story_index: self.prompt_extras.as_ref().map(|p| p.story_index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub project_id: ProjectId,
    pub stage: Stage,
    pub parent_artifact_id: Option<ArtifactId>,
    pub story_index: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_match_invariant_1() {
        assert!(ArtifactStatus::Processing.can_transition_to(ArtifactStatus::PendingReview));
        assert!(ArtifactStatus::Processing.can_transition_to(ArtifactStatus::Failed));
        assert!(ArtifactStatus::PendingReview.can_transition_to(ArtifactStatus::Approved));
        assert!(ArtifactStatus::PendingReview.can_transition_to(ArtifactStatus::Rejected));
        assert!(!ArtifactStatus::Approved.can_transition_to(ArtifactStatus::PendingReview));
        assert!(!ArtifactStatus::Processing.can_transition_to(ArtifactStatus::Approved));
        assert!(!ArtifactStatus::Failed.can_transition_to(ArtifactStatus::PendingReview));
    }

    #[test]
    fn review_id_required_matches_invariant_4() {
        assert!(!ArtifactStatus::Processing.requires_review_id());
        assert!(ArtifactStatus::PendingReview.requires_review_id());
        assert!(ArtifactStatus::Approved.requires_review_id());
        assert!(ArtifactStatus::Rejected.requires_review_id());
        assert!(!ArtifactStatus::Failed.requires_review_id());
    }

    #[test]
    fn required_upstreams_match_table() {
        assert_eq!(Stage::Req.required_upstreams(), &[]);
        assert_eq!(Stage::Plan.required_upstreams(), &[Stage::Req]);
        assert_eq!(Stage::Stories.required_upstreams(), &[Stage::Req, Stage::Plan]);
        assert_eq!(
            Stage::Prompt.required_upstreams(),
            &[Stage::Req, Stage::Plan, Stage::Stories]
        );
    }
}
