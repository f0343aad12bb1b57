//! NanoGpt client — another OpenAI-compatible hosted endpoint, kept as
//! its own type so each provider's base URL/model defaults stay distinct
//! even though the wire shape is identical to LMStudio/OpenRouter.

use std::time::Duration;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::providers::openai;

use crate::config::ProviderConfig;
use crate::error::{EngineError, EngineResult};

use super::lmstudio::classify_rig_error;
use super::pool::{ProviderCall, ProviderClient, ProviderResponse};
use super::ProviderName;

pub struct NanoGptClient {
    client: openai::CompletionsClient,
    default_model: String,
}

impl NanoGptClient {
    pub fn new(config: &ProviderConfig) -> EngineResult<Self> {
        let client = openai::CompletionsClient::builder()
            .api_key(config.credential.expose())
            .base_url(&config.base_url)
            .build()
            .map_err(|e| EngineError::ProviderUnavailable(format!("nanogpt client: {e}")))?;

        Ok(Self {
            client,
            default_model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ProviderClient for NanoGptClient {
    fn name(&self) -> ProviderName {
        ProviderName::NanoGpt
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
            provider_name: ProviderName::NanoGpt,
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
