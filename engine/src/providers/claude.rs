//! Anthropic Claude client — a thin `reqwest` wrapper over the Messages
//! API, matching this codebase's existing direct-HTTP provider style
//! rather than routing through the `rig` agent abstraction.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::ProviderConfig;
use crate::error::{EngineError, EngineResult};

use super::pool::{ProviderCall, ProviderClient, ProviderResponse};
use super::ProviderName;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u64 = 4096;

pub struct ClaudeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.credential.expose().to_string(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl ProviderClient for ClaudeClient {
    fn name(&self) -> ProviderName {
        ProviderName::Claude
    }

    async fn call(&self, request: ProviderCall) -> EngineResult<ProviderResponse> {
        let model = request.model_hint.as_deref().unwrap_or(&self.model);
        let body = json!({
            "model": model,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature.unwrap_or(0.2),
            "messages": [{ "role": "user", "content": request.prompt }],
        });

        let started = std::time::Instant::now();
        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::TransportError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(EngineError::AuthFailure(format!("claude: {status}")));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(EngineError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if !status.is_success() {
            let transient = status.is_server_error();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::ProviderError {
                message: format!("claude {status}: {text}"),
                transient,
            });
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::ParseError(e.to_string()))?;

        let content = parsed["content"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let tokens_used = parsed["usage"]["output_tokens"].as_u64();

        Ok(ProviderResponse {
            content,
            tokens_used,
            provider_name: ProviderName::Claude,
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
