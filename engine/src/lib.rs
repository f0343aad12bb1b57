//! AI Project Ideation Orchestration Engine.
//!
//! A four-stage pipeline — Requirements Analysis, Project Planning, User
//! Story Generation, and Per-Story Prompt Generation — each stage calling
//! an external LLM provider and gated by a human review step before its
//! output can feed the next stage.
//!
//! - [`store`] — RocksDB-backed Artifact Store and Review Registry.
//! - [`providers`] — the uniform provider client pool (Claude, LMStudio,
//!   OpenRouter, NanoGpt).
//! - [`instructions`] — per-stage instruction templates.
//! - [`context`] — assembles upstream artifacts + instructions into a
//!   single bounded prompt.
//! - [`stages`] — the four stage services built on one generic driver.
//! - [`coordinator`] — cross-stage progress and readiness queries.
//! - [`boundary`] — the external request/response surface.

#![allow(clippy::uninlined_format_args)]

pub mod boundary;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod ids;
pub mod instructions;
pub mod model;
pub mod providers;
pub mod stages;
pub mod store;

pub use boundary::Engine;
pub use config::{EngineConfig, ProviderConfig, Secret};
pub use coordinator::{PipelineCoordinator, StageProgress};
pub use error::{EngineError, EngineResult};
pub use ids::{ArtifactId, ProjectId, ReviewId};
pub use model::{ArtifactStatus, Priority, Project, Review, ReviewDecision, Stage, StageArtifact, UserStory};
pub use providers::{ProviderCall, ProviderClient, ProviderName, ProviderPool, ProviderResponse};
pub use store::{ArtifactStore, PipelineDb, ReviewRegistry};
