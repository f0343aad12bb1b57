//! Context Assembler (C5) — composes instruction body, upstream stage
//! content, caller preferences, and extra hints into one ordered prompt
//! string with a token-budget estimate (spec.md §4.5).

use std::sync::Arc;

use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::ids::ArtifactId;
use crate::instructions::InstructionStore;
use crate::model::artifact::{ArtifactStatus, Stage};
use crate::store::ArtifactStore;

use crate::ids::ProjectId;

/// Extra per-call inputs the caller supplies on top of upstream content.
#[derive(Debug, Clone, Default)]
pub struct ContextInputs {
    /// REQ-only: the free-text project description that seeds the whole
    /// pipeline, since REQ has no upstream artifact to draw from.
    pub project_description: Option<String>,
    pub caller_preferences: Option<String>,
    pub extra_hints: Option<String>,
    /// Required only for PROMPT: which story in the STORIES artifact this
    /// call is generating a prompt for.
    pub story_index: Option<usize>,
    /// PROMPT-only: free-form technology/stack preferences (spec.md §3
    /// PROMPT variant's `technicalPreferences` field).
    pub technical_preferences: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub prompt: String,
    pub token_estimate: usize,
    pub source_artifact_ids: Vec<ArtifactId>,
    pub budget_exceeded: bool,
}

pub struct ContextAssembler {
    artifacts: Arc<ArtifactStore>,
    instructions: Arc<InstructionStore>,
    token_budget: usize,
    token_ceiling: usize,
}

impl ContextAssembler {
    pub fn new(
        artifacts: Arc<ArtifactStore>,
        instructions: Arc<InstructionStore>,
        token_budget: usize,
        token_ceiling: usize,
    ) -> Self {
        Self {
            artifacts,
            instructions,
            token_budget,
            token_ceiling,
        }
    }

    pub fn assemble(
        &self,
        stage: Stage,
        project_id: ProjectId,
        inputs: &ContextInputs,
    ) -> EngineResult<AssembledContext> {
        let mut sections = Vec::new();
        let mut source_ids = Vec::new();

        let template = self
            .instructions
            .get(stage.instruction_name())
            .map_err(|e| EngineError::InstructionInvalid(e.to_string()))?;
        if !template.is_valid {
            return Err(EngineError::InstructionInvalid(format!(
                "{} is missing required sections",
                stage.instruction_name()
            )));
        }
        sections.push(template.body.clone());

        if let Some(description) = &inputs.project_description {
            sections.push(format!("# Project Description\n{description}"));
        }

        for upstream in stage.required_upstreams() {
            let artifact = self
                .artifacts
                .find_approved_upstream(project_id, *upstream)?
                .ok_or_else(|| {
                    EngineError::prerequisite_missing(
                        *upstream,
                        format!("no Approved {upstream} artifact for project {project_id}"),
                    )
                })?;
            if artifact.status != ArtifactStatus::Approved {
                return Err(EngineError::prerequisite_missing(
                    *upstream,
                    "latest upstream artifact is not Approved",
                ));
            }
            let Some(parsed) = artifact.parsed_output.as_ref() else {
                return Err(EngineError::prerequisite_missing(
                    *upstream,
                    "approved upstream artifact has no parsed output",
                ));
            };

            source_ids.push(artifact.id);
            sections.push(format!("{}\n{}", upstream.section_header(), parsed.render_for_context()));

            if *upstream == Stage::Stories {
                if let Some(index) = inputs.story_index {
                    let story = parsed.as_stories().and_then(|s| s.stories.get(index)).ok_or_else(|| {
                        EngineError::OutOfRange {
                            index,
                            len: parsed.as_stories().map(|s| s.stories.len()).unwrap_or(0),
                        }
                    })?;
                    sections.push(format!(
                        "# Target Story\n## {}\n{}",
                        story.title, story.description
                    ));
                }
            }
        }

        if !inputs.technical_preferences.is_empty() {
            let mut prefs: Vec<_> = inputs.technical_preferences.iter().collect();
            prefs.sort_by_key(|(k, _)| k.clone());
            let rendered = prefs
                .into_iter()
                .map(|(k, v)| format!("- {k}: {v}"))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("# Technical Preferences\n{rendered}"));
        }

        if let Some(prefs) = &inputs.caller_preferences {
            sections.push(format!("# Caller Preferences\n{prefs}"));
        }
        if let Some(hints) = &inputs.extra_hints {
            sections.push(format!("# Extra Hints\n{hints}"));
        }

        let prompt = sections.join("\n\n");
        let token_estimate = (prompt.chars().count() as f64 / 4.0).ceil() as usize;

        if token_estimate > self.token_ceiling {
            return Err(EngineError::ArgumentInvalid(format!(
                "assembled context of {token_estimate} tokens exceeds the hard ceiling of {}",
                self.token_ceiling
            )));
        }

        let budget_exceeded = token_estimate > self.token_budget;
        if budget_exceeded {
            warn!(
                stage = %stage,
                token_estimate,
                budget = self.token_budget,
                "assembled context exceeds soft token budget"
            );
        }

        Ok(AssembledContext {
            prompt,
            token_estimate,
            source_artifact_ids: source_ids,
            budget_exceeded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::artifact::{ParsedOutput, RequirementsDocument, DocumentSection};
    use crate::model::project::Project;
    use crate::model::artifact::StageArtifact;
    use crate::store::db::PipelineDb;

    fn assembler() -> (ContextAssembler, Arc<ArtifactStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = PipelineDb::open(dir.path()).unwrap().shared();
        let artifacts = Arc::new(ArtifactStore::new(db));
        let instructions = Arc::new(InstructionStore::in_memory());
        let assembler = ContextAssembler::new(artifacts.clone(), instructions, 100_000, 180_000);
        (assembler, artifacts, dir)
    }

    #[test]
    fn req_stage_needs_no_upstream() {
        let (assembler, artifacts, _dir) = assembler();
        let project = Project::new("P", "d");
        artifacts.create_project(&project).unwrap();

        let ctx = assembler
            .assemble(Stage::Req, project.id, &ContextInputs::default())
            .unwrap();
        assert!(!ctx.prompt.contains("Requirements Analysis Content"));
        assert!(ctx.source_artifact_ids.is_empty());
    }

    #[test]
    fn plan_stage_requires_approved_req() {
        let (assembler, artifacts, _dir) = assembler();
        let project = Project::new("P", "d");
        artifacts.create_project(&project).unwrap();

        let err = assembler
            .assemble(Stage::Plan, project.id, &ContextInputs::default())
            .unwrap_err();
        assert_eq!(err.code(), "PrerequisiteMissing");
    }

    #[test]
    fn plan_stage_includes_approved_req_section() {
        let (assembler, artifacts, _dir) = assembler();
        let project = Project::new("P", "d");
        artifacts.create_project(&project).unwrap();

        let mut artifact = StageArtifact::new_processing(project.id, Stage::Req, None, None);
        artifact.parsed_output = Some(ParsedOutput::Req(RequirementsDocument {
            sections: vec![DocumentSection {
                title: "Overview".to_string(),
                body: "An online bookstore.".to_string(),
            }],
        }));
        let id = artifact.id;
        artifacts.create(artifact).unwrap();
        artifacts
            .update_status(id, ArtifactStatus::PendingReview, Some(crate::ids::ReviewId::new()))
            .unwrap();
        artifacts.update_status(id, ArtifactStatus::Approved, None).unwrap();

        let ctx = assembler
            .assemble(Stage::Plan, project.id, &ContextInputs::default())
            .unwrap();
        assert!(ctx.prompt.contains("# Requirements Analysis Content"));
        assert!(ctx.prompt.contains("An online bookstore."));
        assert_eq!(ctx.source_artifact_ids, vec![id]);
    }
}
