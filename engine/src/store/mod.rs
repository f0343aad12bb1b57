//! Durable persistence substrate (C3 Review Registry + C4 Artifact Store)
//! built on a shared RocksDB handle.

pub mod artifact_store;
pub mod db;
pub mod review_registry;
pub mod schema;

pub use artifact_store::ArtifactStore;
pub use db::{PipelineDb, SharedDb, StoreError, StoreResult};
pub use review_registry::ReviewRegistry;
