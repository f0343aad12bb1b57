//! CLI-level configuration: where the pipeline's RocksDB store and
//! instruction templates live, and whether to run against the offline
//! fake provider or a real endpoint — following this codebase's existing
//! `SWARM_*`-prefixed env-var precedence convention.

use std::path::PathBuf;
use std::time::Duration;

use ideation_engine::config::{EngineConfig, ProviderConfig, Secret};
use ideation_engine::ProviderName;

/// Top-level CLI configuration, distinct from the engine's own
/// `EngineConfig` (provider wiring, token budgets).
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: PathBuf,
    pub instructions_dir: Option<PathBuf>,
    /// When true, the only registered provider is the in-memory fake —
    /// every stage succeeds deterministically without network access.
    pub offline: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::var("IDEATION_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./ideation-db")),
            instructions_dir: std::env::var("IDEATION_INSTRUCTIONS_DIR").ok().map(PathBuf::from),
            offline: std::env::var("IDEATION_OFFLINE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
        }
    }
}

/// Build the engine's provider/config wiring for this CLI invocation.
///
/// In offline mode every stage is assigned the same `Claude` provider
/// slot (the fake provider is registered under that name by `main.rs`);
/// in online mode each provider pulls its endpoint and credential from
/// `IDEATION_<PROVIDER>_*` environment variables.
pub fn engine_config(cli: &CliConfig) -> EngineConfig {
    let mut config = EngineConfig::default();

    if cli.offline {
        config.providers.insert(
            ProviderName::Claude,
            ProviderConfig::local("http://localhost:0", "fake-offline-model"),
        );
        return config;
    }

    for name in [
        ProviderName::Claude,
        ProviderName::LmStudio,
        ProviderName::OpenRouter,
        ProviderName::NanoGpt,
    ] {
        let prefix = name.as_str().to_ascii_uppercase();
        let Ok(base_url) = std::env::var(format!("IDEATION_{prefix}_BASE_URL")) else {
            continue;
        };
        let credential = std::env::var(format!("IDEATION_{prefix}_API_KEY")).unwrap_or_default();
        let model = std::env::var(format!("IDEATION_{prefix}_MODEL")).unwrap_or_else(|_| "default".into());
        config.providers.insert(
            name,
            ProviderConfig {
                base_url,
                credential: Secret::new(credential),
                model,
                default_timeout: Duration::from_secs(60),
                max_retries: 2,
            },
        );
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_default_registers_claude_slot() {
        let cli = CliConfig {
            db_path: PathBuf::from("/tmp/x"),
            instructions_dir: None,
            offline: true,
        };
        let config = engine_config(&cli);
        assert!(config.providers.contains_key(&ProviderName::Claude));
    }
}
