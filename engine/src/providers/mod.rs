//! Provider Client Pool (C1) — a uniform call interface over N LLM
//! providers with per-provider health, timeouts, bounded retries, and a
//! concurrency cap (spec.md §4.1).

mod claude;
mod lmstudio;
mod nanogpt;
mod openrouter;
pub mod pool;

pub use pool::{ProviderCall, ProviderClient, ProviderHandle, ProviderPool, ProviderResponse};

use serde::{Deserialize, Serialize};

/// The fixed, extensible enumeration of registered provider names
/// (spec.md §4.1: "`Claude, LMStudio, OpenRouter, NanoGpt`, extensible").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderName {
    Claude,
    LmStudio,
    OpenRouter,
    NanoGpt,
}

impl ProviderName {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderName::Claude => "Claude",
            ProviderName::LmStudio => "LMStudio",
            ProviderName::OpenRouter => "OpenRouter",
            ProviderName::NanoGpt => "NanoGpt",
        }
    }
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "claude" => Ok(ProviderName::Claude),
            "lmstudio" => Ok(ProviderName::LmStudio),
            "openrouter" => Ok(ProviderName::OpenRouter),
            "nanogpt" => Ok(ProviderName::NanoGpt),
            other => Err(format!("unknown provider name: {other}")),
        }
    }
}

pub use claude::ClaudeClient;
pub use lmstudio::LmStudioClient;
pub use nanogpt::NanoGptClient;
pub use openrouter::OpenRouterClient;
