use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use pipeline_cli::config::{self, CliConfig};
use pipeline_cli::fake_provider;
use ideation_engine::boundary::dto::{
    StartPlanningRequest, StartPromptRequest, StartRequirementsRequest, StartStoriesRequest,
};
use ideation_engine::{ArtifactId, Engine, ProjectId, ProviderName, ProviderPool, ReviewId, Stage};

#[derive(Parser)]
#[command(name = "pipeline-cli", about = "Drives the ideation pipeline end to end")]
struct Cli {
    /// Directory backing the RocksDB artifact/review store.
    #[arg(long, global = true)]
    db_path: Option<String>,

    /// Run every stage against the deterministic offline fake provider
    /// instead of a real endpoint.
    #[arg(long, global = true)]
    offline: Option<bool>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new project.
    CreateProject {
        name: String,
        description: String,
    },
    /// Start Requirements Analysis for a project.
    StartRequirements {
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        additional_context: Option<String>,
        #[arg(long)]
        constraints: Option<String>,
    },
    /// Start Project Planning from an Approved requirements artifact.
    StartPlanning {
        #[arg(long)]
        requirements_id: String,
        #[arg(long)]
        preferences: Option<String>,
    },
    /// Start User Story Generation from an Approved planning artifact.
    StartStories {
        #[arg(long)]
        planning_id: String,
        #[arg(long)]
        story_preferences: Option<String>,
        #[arg(long)]
        complexity_levels: Option<String>,
        #[arg(long)]
        additional_guidance: Option<String>,
    },
    /// Start Per-Story Prompt Generation for one story in an Approved
    /// stories artifact.
    StartPrompt {
        #[arg(long)]
        stories_id: String,
        #[arg(long)]
        story_index: usize,
        #[arg(long)]
        prompt_style: Option<String>,
    },
    /// Print an artifact's current status.
    Status {
        #[arg(long, value_enum)]
        stage: StageArg,
        #[arg(long)]
        id: String,
    },
    /// Print an Approved artifact's parsed result as JSON.
    Result {
        #[arg(long, value_enum)]
        stage: StageArg,
        #[arg(long)]
        id: String,
    },
    /// List reviews awaiting a decision.
    ListReviews,
    /// Approve a pending review.
    Approve {
        #[arg(long)]
        review_id: String,
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Reject a pending review.
    Reject {
        #[arg(long)]
        review_id: String,
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Print the per-stage progress roll-up for a project.
    Progress {
        #[arg(long)]
        project_id: String,
    },
    /// Run spec's literal Bookstore seed scenario end to end against the
    /// offline fake provider, approving every review automatically.
    Demo,
}

#[derive(Clone, clap::ValueEnum)]
enum StageArg {
    Req,
    Plan,
    Stories,
    Prompt,
}

impl From<StageArg> for Stage {
    fn from(value: StageArg) -> Self {
        match value {
            StageArg::Req => Stage::Req,
            StageArg::Plan => Stage::Plan,
            StageArg::Stories => Stage::Stories,
            StageArg::Prompt => Stage::Prompt,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut cli_config = CliConfig::default();
    if let Some(path) = &cli.db_path {
        cli_config.db_path = path.into();
    }
    if let Some(offline) = cli.offline {
        cli_config.offline = offline;
    }

    let engine = build_engine(&cli_config)?;

    match cli.command {
        Command::CreateProject { name, description } => {
            let project = engine.create_project(name, description)?;
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
        Command::StartRequirements {
            project_id,
            description,
            additional_context,
            constraints,
        } => {
            let response = engine
                .start_requirements(StartRequirementsRequest {
                    project_id: ProjectId::parse(&project_id).context("invalid projectId")?,
                    project_description: description,
                    additional_context,
                    constraints,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::StartPlanning {
            requirements_id,
            preferences,
        } => {
            let response = engine
                .start_planning(StartPlanningRequest {
                    requirements_analysis_id: ArtifactId::parse(&requirements_id)
                        .context("invalid requirementsAnalysisId")?,
                    preferences,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::StartStories {
            planning_id,
            story_preferences,
            complexity_levels,
            additional_guidance,
        } => {
            let response = engine
                .start_stories(StartStoriesRequest {
                    planning_id: ArtifactId::parse(&planning_id).context("invalid planningId")?,
                    story_preferences,
                    complexity_levels,
                    additional_guidance,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::StartPrompt {
            stories_id,
            story_index,
            prompt_style,
        } => {
            let response = engine
                .start_prompt(StartPromptRequest {
                    story_generation_id: ArtifactId::parse(&stories_id).context("invalid storyGenerationId")?,
                    story_index,
                    technical_preferences: None,
                    prompt_style,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Status { stage, id } => {
            let artifact_id = ArtifactId::parse(&id).context("invalid artifact id")?;
            let status = engine.status(stage.into(), artifact_id)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Result { stage, id } => {
            let artifact_id = ArtifactId::parse(&id).context("invalid artifact id")?;
            let result = engine.result(stage.into(), artifact_id)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::ListReviews => {
            let reviews = engine.list_pending_reviews()?;
            println!("{}", serde_json::to_string_pretty(&reviews)?);
        }
        Command::Approve { review_id, feedback } => {
            let id = ReviewId::parse(&review_id).context("invalid reviewId")?;
            let review = engine.approve_review(id, feedback)?;
            println!("{}", serde_json::to_string_pretty(&review)?);
        }
        Command::Reject { review_id, feedback } => {
            let id = ReviewId::parse(&review_id).context("invalid reviewId")?;
            let review = engine.reject_review(id, feedback)?;
            println!("{}", serde_json::to_string_pretty(&review)?);
        }
        Command::Progress { project_id } => {
            let id = ProjectId::parse(&project_id).context("invalid projectId")?;
            let progress = engine.progress(id)?;
            for stage in Stage::ordered() {
                let stats = progress.get(stage).cloned().unwrap_or_default();
                println!(
                    "{stage}: total={} approved={} pending={} failed={}",
                    stats.total, stats.approved, stats.pending, stats.failed
                );
            }
        }
        Command::Demo => run_demo(&engine).await?,
    }

    Ok(())
}

fn build_engine(cli_config: &CliConfig) -> Result<Engine> {
    let engine_config = config::engine_config(cli_config);

    if cli_config.offline {
        let mut pool = ProviderPool::new(engine_config.provider_concurrency_cap, engine_config.provider_queue_wait, 2);
        pool.register(
            Arc::new(fake_provider::FakeProvider::new(ProviderName::Claude)),
            engine_config.provider_concurrency_cap,
        );
        return Engine::with_pool(
            &engine_config,
            cli_config.db_path.clone(),
            cli_config.instructions_dir.clone(),
            pool,
        )
        .context("failed to assemble offline engine");
    }

    Engine::new(&engine_config, cli_config.db_path.clone(), cli_config.instructions_dir.clone())
        .context("failed to assemble engine")
}

/// Walk spec.md's literal Bookstore seed scenario end to end: create the
/// project, start each stage against the offline fake provider, and
/// approve every review as soon as it lands.
async fn run_demo(engine: &Engine) -> Result<()> {
    let project = engine.create_project("Bookstore", "Online bookstore")?;
    info!(project_id = %project.id, "created project");

    let req = engine
        .start_requirements(StartRequirementsRequest {
            project_id: project.id,
            project_description: "Online bookstore".to_string(),
            additional_context: None,
            constraints: None,
        })
        .await?;
    engine.approve_review(req.review_id, None)?;
    println!("REQ approved: {}", req.analysis_id);

    let plan = engine
        .start_planning(StartPlanningRequest {
            requirements_analysis_id: req.analysis_id,
            preferences: None,
        })
        .await?;
    engine.approve_review(plan.review_id, None)?;
    println!("PLAN approved: {}", plan.planning_id);

    let stories = engine
        .start_stories(StartStoriesRequest {
            planning_id: plan.planning_id,
            story_preferences: Some("focus on auth".to_string()),
            complexity_levels: None,
            additional_guidance: None,
        })
        .await?;
    engine.approve_review(stories.review_id, None)?;
    let count = engine.stories_count(stories.generation_id)?;
    println!("STORIES approved: {} ({count} stories)", stories.generation_id);

    let prompt = engine
        .start_prompt(StartPromptRequest {
            story_generation_id: stories.generation_id,
            story_index: 1,
            technical_preferences: None,
            prompt_style: None,
        })
        .await?;
    engine.approve_review(prompt.review_id, None)?;
    println!("PROMPT approved: {}", prompt.prompt_id);

    let result = engine.result(Stage::Prompt, prompt.prompt_id)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
