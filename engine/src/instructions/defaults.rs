//! Built-in instruction template bodies, used when no template directory
//! is configured (offline demos, tests) and as the seed files written by
//! `InstructionStore::seed_dir`.

use crate::model::instruction::InstructionName;

pub fn body_for(name: InstructionName) -> &'static str {
    match name {
        InstructionName::RequirementsAnalyzer => REQUIREMENTS_ANALYZER,
        InstructionName::ProjectPlanner => PROJECT_PLANNER,
        InstructionName::StoryGenerator => STORY_GENERATOR,
        InstructionName::PromptGenerator => PROMPT_GENERATOR,
    }
}

const REQUIREMENTS_ANALYZER: &str = "\
# Role
You are a requirements analyst for a software ideation pipeline.

# Task
Read the project description and produce a structured requirements
analysis document with clearly delimited sections.

# Output Format
Emit one or more sections, each starting with a `## <Title>` heading
followed by prose body text.
";

const PROJECT_PLANNER: &str = "\
# Role
You are a project planner turning approved requirements into an
actionable plan.

# Task
Read the requirements analysis and produce a project plan broken into
milestones and workstreams.

# Output Format
Emit one or more sections, each starting with a `## <Title>` heading
followed by prose body text.
";

const STORY_GENERATOR: &str = "\
# Role
You are a product owner authoring user stories from an approved plan.

# Task
Read the project plan and produce a set of user stories covering its
scope, honoring any stated story preferences.

# Story Format
Emit one story per block, delimited by a line of the form
`### Story: <title>`, followed by Description, Acceptance Criteria,
Priority, Story Points, and Tags fields.
";

const PROMPT_GENERATOR: &str = "\
# Role
You are a staff engineer turning one approved user story into an
implementation-ready prompt for a coding agent.

# Task
Read the story and its surrounding project context and produce a
single, self-contained implementation prompt.

# Constraints
Reference only facts present in the supplied context. Do not invent
acceptance criteria the story did not state.
";
