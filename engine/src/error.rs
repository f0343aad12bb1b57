//! Boundary-facing error taxonomy — spec.md §7.
//!
//! Every component owns a narrower `thiserror` enum (`StoreError`,
//! `ProviderError`, `InstructionError`, `ContextError`); each converts into
//! `EngineError` at the point it crosses a stage-service call, so the
//! External Boundary Adapter only ever has to map this one enum to a
//! stable wire code.

use thiserror::Error;

use crate::ids::{ArtifactId, ReviewId};
use crate::model::artifact::Stage;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("argument invalid: {0}")]
    ArgumentInvalid(String),

    #[error("prerequisite missing for stage {stage}: {detail}")]
    PrerequisiteMissing { stage: Stage, detail: String },

    #[error("artifact already in progress for this group")]
    AlreadyInProgress,

    #[error("instruction template invalid: {0}")]
    InstructionInvalid(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("provider call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("provider rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("provider auth failure: {0}")]
    AuthFailure(String),

    #[error("provider error: {message}")]
    ProviderError { message: String, transient: bool },

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("provider busy, concurrency cap exceeded")]
    ProviderBusy,

    #[error("failed to parse provider output: {0}")]
    ParseError(String),

    #[error("review {0} is not pending")]
    ReviewConflict(ReviewId),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("operation cancelled: {0}")]
    Cancelled(String),

    #[error("story index out of range: {index} (len {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("internal store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

impl EngineError {
    /// Stable machine-readable code surfaced at the External Boundary
    /// Adapter (spec.md §7's Kind column).
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ArgumentInvalid(_) => "ArgumentInvalid",
            EngineError::PrerequisiteMissing { .. } => "PrerequisiteMissing",
            EngineError::AlreadyInProgress => "AlreadyInProgress",
            EngineError::InstructionInvalid(_) => "InstructionInvalid",
            EngineError::ProviderUnavailable(_) => "ProviderUnavailable",
            EngineError::Timeout(_) => "Timeout",
            EngineError::RateLimited { .. } => "RateLimited",
            EngineError::AuthFailure(_) => "AuthFailure",
            EngineError::ProviderError { .. } => "ProviderError",
            EngineError::TransportError(_) => "TransportError",
            EngineError::ProviderBusy => "ProviderBusy",
            EngineError::ParseError(_) => "ParseError",
            EngineError::ReviewConflict(_) => "ReviewConflict",
            EngineError::NotFound(_) => "NotFound",
            EngineError::Cancelled(_) => "Cancelled",
            EngineError::OutOfRange { .. } => "OutOfRange",
            EngineError::Store(_) => "StoreError",
        }
    }

    pub fn prerequisite_missing(stage: Stage, detail: impl Into<String>) -> Self {
        EngineError::PrerequisiteMissing {
            stage,
            detail: detail.into(),
        }
    }

    pub fn not_found_artifact(id: ArtifactId) -> Self {
        EngineError::NotFound(format!("artifact {id}"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
