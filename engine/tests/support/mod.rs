//! Shared integration-test harness: a scripted `ProviderClient` double and
//! an `Engine` builder wired around a throwaway RocksDB directory.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ideation_engine::{Engine, EngineConfig, EngineResult, ProviderCall, ProviderClient, ProviderName, ProviderPool, ProviderResponse};

/// Returns one scripted response per call, in registration order; once
/// the queue is drained it keeps returning the last response.
pub struct ScriptedProvider {
    name: ProviderName,
    responses: Mutex<VecDeque<String>>,
    delay: Option<Duration>,
    sent_prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            name: ProviderName::Claude,
            responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
            delay: None,
            sent_prompts: Mutex::new(Vec::new()),
        })
    }

    /// A provider that sleeps `delay` before replying — used to exercise
    /// the per-call deadline.
    pub fn with_delay(response: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: ProviderName::Claude,
            responses: Mutex::new(VecDeque::from([response.to_string()])),
            delay: Some(delay),
            sent_prompts: Mutex::new(Vec::new()),
        })
    }

    /// Every assembled prompt this provider was called with, in call order.
    pub fn sent_prompts(&self) -> Vec<String> {
        self.sent_prompts.lock().expect("scripted provider lock poisoned").clone()
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn name(&self) -> ProviderName {
        self.name
    }

    async fn call(&self, request: ProviderCall) -> EngineResult<ProviderResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent_prompts
            .lock()
            .expect("scripted provider lock poisoned")
            .push(request.prompt.clone());
        let mut queue = self.responses.lock().expect("scripted provider lock poisoned");
        let content = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap_or_default()
        };
        Ok(ProviderResponse {
            content,
            tokens_used: Some(1),
            provider_name: self.name,
            latency: Duration::from_millis(0),
        })
    }

    async fn is_healthy(&self, _deadline: Duration) -> bool {
        true
    }
}

/// Assemble an `Engine` over a fresh temp-dir RocksDB store, with
/// `provider` registered under every stage's default provider slot
/// (`EngineConfig::default()` points every stage at `ProviderName::Claude`).
pub fn engine_with_provider(db_path: &std::path::Path, provider: Arc<dyn ProviderClient>) -> Engine {
    let config = EngineConfig::default();
    let mut pool = ProviderPool::new(config.provider_concurrency_cap, config.provider_queue_wait, 0);
    pool.register(provider, config.provider_concurrency_cap);
    Engine::with_pool(&config, db_path, None, pool).expect("engine assembles")
}
