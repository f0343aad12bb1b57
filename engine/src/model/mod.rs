//! Core data model: projects, stage artifacts, stories, reviews, and
//! instruction templates — spec.md §3.

pub mod artifact;
pub mod instruction;
pub mod project;
pub mod review;
pub mod story;

pub use artifact::{ArtifactStatus, Stage, StageArtifact};
pub use instruction::{InstructionName, InstructionTemplate};
pub use project::Project;
pub use review::{Review, ReviewDecision};
pub use story::{Priority, UserStory};
