//! Stage Services (C6) — one generic start sequence parameterized by
//! stage, with four thin facades matching spec.md §4.6's illustrated
//! shape (`canStart`, `start`, `getStatus`, `getResult`, and the
//! Stories-only `count`/`getOne`).

pub mod parse;
pub mod planning;
pub mod prompts;
pub mod requirements;
pub mod service;
pub mod stories;

pub use planning::PlanningService;
pub use prompts::PromptService;
pub use requirements::RequirementsService;
pub use service::{StageService, StartOutcome, StartRequest};
pub use stories::StoriesService;
