use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ArtifactId, ReviewId};
use crate::model::artifact::Stage;

/// A human verdict on an artifact — the sole mechanism for advancing a
/// stage past PendingReview (spec.md Glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewDecision::Pending => write!(f, "Pending"),
            ReviewDecision::Approved => write!(f, "Approved"),
            ReviewDecision::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub artifact_id: ArtifactId,
    pub stage: Stage,
    pub submitted_at: DateTime<Utc>,
    pub decision: ReviewDecision,
    pub decided_at: Option<DateTime<Utc>>,
    pub feedback: Option<String>,
    /// Digest of the artifact's raw output at submission time, so a
    /// reviewer decision can be tied back to the exact payload reviewed
    /// (spec.md §4.3 `submit(artifactId, stage, payloadDigest)`).
    pub payload_digest: String,
}

impl Review {
    pub fn new_pending(artifact_id: ArtifactId, stage: Stage, payload_digest: String) -> Self {
        Self {
            id: ReviewId::new(),
            artifact_id,
            stage,
            submitted_at: Utc::now(),
            decision: ReviewDecision::Pending,
            decided_at: None,
            feedback: None,
            payload_digest,
        }
    }
}
