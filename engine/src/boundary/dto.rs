//! Wire-level request/response shapes for the External Boundary Adapter
//! (spec.md §6). Field names are normative — `camelCase` over the wire.

use serde::{Deserialize, Serialize};

use crate::ids::{ArtifactId, ProjectId, ReviewId};
use crate::model::artifact::ArtifactStatus;
use crate::model::review::ReviewDecision;

/// The wire status enumeration (spec.md §6), which adds `NotStarted` for
/// a client that hasn't created an artifact yet — a state the engine
/// itself never returns, since every artifact it knows about already has
/// a concrete `ArtifactStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum WireStatus {
    NotStarted,
    Processing,
    PendingReview,
    Approved,
    Rejected,
    Failed,
}

impl From<ArtifactStatus> for WireStatus {
    fn from(status: ArtifactStatus) -> Self {
        match status {
            ArtifactStatus::Processing => WireStatus::Processing,
            ArtifactStatus::PendingReview => WireStatus::PendingReview,
            ArtifactStatus::Approved => WireStatus::Approved,
            ArtifactStatus::Rejected => WireStatus::Rejected,
            ArtifactStatus::Failed => WireStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequirementsRequest {
    pub project_id: ProjectId,
    pub project_description: String,
    pub additional_context: Option<String>,
    pub constraints: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPlanningRequest {
    pub requirements_analysis_id: ArtifactId,
    pub preferences: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStoriesRequest {
    pub planning_id: ArtifactId,
    pub story_preferences: Option<String>,
    pub complexity_levels: Option<String>,
    pub additional_guidance: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPromptRequest {
    pub story_generation_id: ArtifactId,
    pub story_index: usize,
    pub technical_preferences: Option<std::collections::HashMap<String, String>>,
    pub prompt_style: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequirementsResponse {
    pub analysis_id: ArtifactId,
    pub review_id: ReviewId,
    pub status: WireStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPlanningResponse {
    pub planning_id: ArtifactId,
    pub review_id: ReviewId,
    pub status: WireStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStoriesResponse {
    pub generation_id: ArtifactId,
    pub review_id: ReviewId,
    pub status: WireStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPromptResponse {
    pub prompt_id: ArtifactId,
    pub review_id: ReviewId,
    pub status: WireStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: WireStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideReviewRequest {
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: ReviewId,
    pub artifact_id: ArtifactId,
    pub decision: ReviewDecision,
    pub feedback: Option<String>,
}

/// Stable wire error shape every boundary failure maps into (spec.md §7).
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&crate::error::EngineError> for ErrorResponse {
    fn from(err: &crate::error::EngineError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
