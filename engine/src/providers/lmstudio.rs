//! LMStudio client — an OpenAI-compatible local inference endpoint,
//! wired through `rig`'s OpenAI client the same way this codebase builds
//! its local vLLM / llama.cpp agents.

use std::time::Duration;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::providers::openai;

use crate::config::ProviderConfig;
use crate::error::{EngineError, EngineResult};

use super::pool::{ProviderCall, ProviderClient, ProviderResponse};
use super::ProviderName;

pub struct LmStudioClient {
    client: openai::CompletionsClient,
    default_model: String,
}

impl LmStudioClient {
    pub fn new(config: &ProviderConfig) -> EngineResult<Self> {
        let client = openai::CompletionsClient::builder()
            .api_key(config.credential.expose())
            .base_url(&config.base_url)
            .build()
            .map_err(|e| EngineError::ProviderUnavailable(format!("lmstudio client: {e}")))?;

        Ok(Self {
            client,
            default_model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ProviderClient for LmStudioClient {
    fn name(&self) -> ProviderName {
        ProviderName::LmStudio
    }

    async fn call(&self, request: ProviderCall) -> EngineResult<ProviderResponse> {
        let model = request.model_hint.as_deref().unwrap_or(&self.default_model);
        let agent = self
            .client
            .agent(model)
            .temperature(request.temperature.unwrap_or(0.2))
            .build();

        let started = std::time::Instant::now();
        let content = agent
            .prompt(&request.prompt)
            .await
            .map_err(|e| classify_rig_error(&e.to_string()))?;

        Ok(ProviderResponse {
            content,
            tokens_used: None,
            provider_name: ProviderName::LmStudio,
            latency: started.elapsed(),
        })
    }

    async fn is_healthy(&self, deadline: Duration) -> bool {
        let probe = ProviderCall {
            prompt: "ping".to_string(),
            model_hint: None,
            max_tokens: Some(1),
            temperature: Some(0.0),
            deadline,
        };
        tokio::time::timeout(deadline, self.call(probe)).await.is_ok()
    }
}

/// LMStudio, OpenRouter, and NanoGpt all surface failures as opaque
/// `rig::completion::PromptError` strings; route them to the engine's
/// error taxonomy by inspecting the message the way this codebase's
/// `prompt_with_retry` already does for transient-vs-terminal HTTP errors.
pub(super) fn classify_rig_error(err: &str) -> EngineError {
    let lower = err.to_ascii_lowercase();
    if lower.contains("401") || lower.contains("unauthorized") || lower.contains("invalid api key") {
        EngineError::AuthFailure(err.to_string())
    } else if lower.contains("429") {
        EngineError::RateLimited { retry_after_secs: None }
    } else if lower.contains("timed out") || lower.contains("timeout") {
        EngineError::Timeout(Duration::from_secs(0))
    } else if lower.contains("connection")
        || lower.contains("502")
        || lower.contains("503")
        || lower.contains("no message or tool call")
    {
        EngineError::TransportError(err.to_string())
    } else {
        // Only the remaining 5xx-shaped failures (500, 504, ...) are
        // transient; a plain 4xx (400, 404, ...) is terminal (spec.md §7).
        let transient = lower.contains("500")
            || lower.contains("504")
            || lower.contains("internal server error")
            || lower.contains("bad gateway")
            || lower.contains("service unavailable")
            || lower.contains("gateway timeout");
        EngineError::ProviderError { message: err.to_string(), transient }
    }
}
