//! Engine-wide and per-provider configuration — TOML-loadable with
//! environment-variable overrides, following this codebase's existing
//! `SWARM_*` precedence convention (see `ModeModelConfig`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::model::artifact::Stage;
use crate::providers::ProviderName;

/// A credential handle that never prints its value via `Debug`/`Display`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(<redacted>)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub credential: Secret,
    pub model: String,
    #[serde(with = "duration_secs")]
    pub default_timeout: Duration,
    pub max_retries: u32,
}

impl ProviderConfig {
    pub fn local(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credential: Secret::new("local"),
            model: model.into(),
            default_timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub providers: HashMap<ProviderName, ProviderConfig>,
    /// Which registered provider backs each stage's `call(providerName, ...)`
    /// dispatch. The engine never fails over across providers (spec.md
    /// §4.1), so this assignment is explicit rather than inferred.
    pub stage_providers: HashMap<Stage, ProviderName>,
    /// Default per-stage context token budget before a warning is emitted
    /// (spec.md §4.5 step 5).
    pub context_token_budget: usize,
    /// Absolute ceiling above which context assembly hard-fails.
    pub context_token_ceiling: usize,
    /// Per-provider in-flight concurrency cap (spec.md §5).
    pub provider_concurrency_cap: usize,
    /// Bounded wait before a queued call fails `ProviderBusy`.
    #[serde(with = "duration_secs")]
    pub provider_queue_wait: Duration,
    /// Default deadline for `ReviewRegistry::await_decision`.
    #[serde(with = "duration_secs")]
    pub review_await_default: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let stage_providers = Stage::ordered()
            .iter()
            .map(|s| (*s, ProviderName::Claude))
            .collect();
        Self {
            providers: HashMap::new(),
            stage_providers,
            context_token_budget: 100_000,
            context_token_ceiling: 180_000,
            provider_concurrency_cap: 8,
            provider_queue_wait: Duration::from_secs(30),
            review_await_default: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(body: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(body)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let body = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&body)?)
    }

    /// Apply `IDEATION_<PROVIDER>_API_KEY`-style environment overrides on
    /// top of whatever the TOML file specified, matching this codebase's
    /// existing env-override precedence (highest wins).
    pub fn apply_env_overrides(&mut self) {
        for (name, cfg) in self.providers.iter_mut() {
            let env_key = format!("IDEATION_{}_API_KEY", name.as_str().to_ascii_uppercase());
            if let Ok(key) = env::var(&env_key) {
                cfg.credential = Secret::new(key);
            }
            let env_url = format!("IDEATION_{}_BASE_URL", name.as_str().to_ascii_uppercase());
            if let Ok(url) = env::var(&env_url) {
                cfg.base_url = url;
            }
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_budgets() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.context_token_budget, 100_000);
        assert_eq!(cfg.context_token_ceiling, 180_000);
        assert_eq!(cfg.provider_concurrency_cap, 8);
        assert_eq!(cfg.provider_queue_wait, Duration::from_secs(30));
    }

    #[test]
    fn secret_debug_is_redacted() {
        let s = Secret::new("sk-very-secret");
        assert_eq!(format!("{:?}", s), "Secret(<redacted>)");
    }
}
