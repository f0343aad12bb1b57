//! The pool itself: a registry of provider clients behind a uniform
//! `call`/`is_healthy` interface, a per-provider concurrency cap with a
//! bounded queue wait, and retry-with-backoff on transient failures
//! (spec.md §4.1, §5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::error::{EngineError, EngineResult};

use super::ProviderName;

/// One dispatch request against a provider.
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub prompt: String,
    pub model_hint: Option<String>,
    pub max_tokens: Option<u64>,
    pub temperature: Option<f64>,
    pub deadline: Duration,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: String,
    pub tokens_used: Option<u64>,
    pub provider_name: ProviderName,
    pub latency: Duration,
}

/// Uniform capability every registered provider exposes
/// (spec.md §4.1: `call(...) -> {content, tokensUsed, providerName, latency} | error`).
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn name(&self) -> ProviderName;

    async fn call(&self, request: ProviderCall) -> EngineResult<ProviderResponse>;

    /// A lightweight health probe. Failures do not auto-evict the
    /// provider; they only inform callers (spec.md §4.1).
    async fn is_healthy(&self, deadline: Duration) -> bool;
}

/// A registered client paired with its concurrency guard and its own
/// retry policy (spec.md §6 "Configuration. Per provider: ... max
/// retries" — retries are a per-provider setting, not a pool-wide one).
pub struct ProviderHandle {
    client: Arc<dyn ProviderClient>,
    semaphore: Arc<Semaphore>,
    max_retries: u32,
}

/// The Provider Client Pool (C1).
pub struct ProviderPool {
    handles: HashMap<ProviderName, ProviderHandle>,
    queue_wait: Duration,
    default_max_retries: u32,
}

impl ProviderPool {
    pub fn new(_default_concurrency_cap: usize, queue_wait: Duration, default_max_retries: u32) -> Self {
        Self {
            handles: HashMap::new(),
            queue_wait,
            default_max_retries,
        }
    }

    /// Register a provider client under the pool's default retry policy —
    /// used by callers with no per-provider `ProviderConfig` to draw from
    /// (the CLI's offline fake provider, test doubles).
    pub fn register(&mut self, client: Arc<dyn ProviderClient>, concurrency_cap: usize) {
        let max_retries = self.default_max_retries;
        self.register_with_retries(client, concurrency_cap, max_retries);
    }

    /// Register a provider client with an explicit retry policy, e.g. a
    /// `ProviderConfig::max_retries` value loaded from config.
    pub fn register_with_retries(&mut self, client: Arc<dyn ProviderClient>, concurrency_cap: usize, max_retries: u32) {
        let handle = ProviderHandle {
            client,
            semaphore: Arc::new(Semaphore::new(concurrency_cap)),
            max_retries,
        };
        self.handles.insert(handle.client.name(), handle);
    }

    /// `call(providerName, ...)` — spec.md §4.1. No automatic failover
    /// across providers; an unregistered name is `ProviderUnavailable`.
    pub async fn call(
        &self,
        provider: ProviderName,
        request: ProviderCall,
    ) -> EngineResult<ProviderResponse> {
        let handle = self
            .handles
            .get(&provider)
            .ok_or_else(|| EngineError::ProviderUnavailable(provider.to_string()))?;

        let permit = tokio::time::timeout(self.queue_wait, handle.semaphore.acquire())
            .await
            .map_err(|_| EngineError::ProviderBusy)?
            .map_err(|_| EngineError::ProviderBusy)?;

        let result = self
            .call_with_retry(handle.client.as_ref(), handle.max_retries, request)
            .await;
        drop(permit);
        result
    }

    async fn call_with_retry(
        &self,
        client: &dyn ProviderClient,
        max_retries: u32,
        request: ProviderCall,
    ) -> EngineResult<ProviderResponse> {
        let mut last_err = None;
        for attempt in 0..=max_retries {
            let deadline = request.deadline;
            let started = std::time::Instant::now();
            let attempt_request = request.clone();

            match tokio::time::timeout(deadline, client.call(attempt_request)).await {
                Ok(Ok(mut response)) => {
                    response.latency = started.elapsed();
                    return Ok(response);
                }
                Ok(Err(err)) => {
                    if !is_transient(&err) || attempt == max_retries {
                        return Err(err);
                    }
                    let backoff = retry_backoff(attempt, &err);
                    warn!(
                        provider = %client.name(),
                        attempt = attempt + 1,
                        max_retries = max_retries,
                        backoff_secs = backoff.as_secs_f64(),
                        error = %err,
                        "transient provider error, retrying"
                    );
                    last_err = Some(err);
                    tokio::time::sleep(backoff).await;
                }
                Err(_elapsed) => return Err(EngineError::Timeout(deadline)),
            }
        }
        Err(last_err.unwrap_or(EngineError::ProviderError {
            message: "retry loop exhausted".to_string(),
            transient: false,
        }))
    }

    pub async fn is_healthy(&self, provider: ProviderName, deadline: Duration) -> bool {
        match self.handles.get(&provider) {
            Some(handle) => handle.client.is_healthy(deadline).await,
            None => false,
        }
    }

    pub fn registered_providers(&self) -> Vec<ProviderName> {
        self.handles.keys().copied().collect()
    }
}

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(4);

/// Exponential backoff starting at 500ms, doubling per attempt, capped at
/// 4s (spec.md §4.1) — except when the provider told us exactly how long
/// to wait via `Retry-After`, which takes precedence over the computed
/// schedule.
fn retry_backoff(attempt: u32, err: &EngineError) -> Duration {
    if let EngineError::RateLimited { retry_after_secs: Some(secs) } = err {
        return Duration::from_secs(*secs);
    }
    INITIAL_BACKOFF
        .checked_mul(1 << attempt)
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF)
}

/// Transient provider failures are retried up to `max_retries` times
/// (spec.md §7): rate limits, transport errors, and 5xx-shaped provider
/// errors. Auth failures, parse errors, and 4xx-shaped provider errors are
/// terminal.
fn is_transient(err: &EngineError) -> bool {
    matches!(
        err,
        EngineError::RateLimited { .. }
            | EngineError::TransportError(_)
            | EngineError::ProviderError { transient: true, .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyClient {
        name: ProviderName,
        fail_times: AtomicU32,
    }

    #[async_trait]
    impl ProviderClient for FlakyClient {
        fn name(&self) -> ProviderName {
            self.name
        }

        async fn call(&self, request: ProviderCall) -> EngineResult<ProviderResponse> {
            if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(EngineError::TransportError("connection reset".to_string()));
            }
            Ok(ProviderResponse {
                content: format!("echo: {}", request.prompt),
                tokens_used: Some(10),
                provider_name: self.name,
                latency: Duration::from_millis(0),
            })
        }

        async fn is_healthy(&self, _deadline: Duration) -> bool {
            true
        }
    }

    fn request() -> ProviderCall {
        ProviderCall {
            prompt: "hello".to_string(),
            model_hint: None,
            max_tokens: None,
            temperature: None,
            deadline: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn unregistered_provider_is_unavailable() {
        let pool = ProviderPool::new(8, Duration::from_secs(1), 2);
        let err = pool.call(ProviderName::Claude, request()).await.unwrap_err();
        assert_eq!(err.code(), "ProviderUnavailable");
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let mut pool = ProviderPool::new(8, Duration::from_secs(1), 3);
        pool.register(
            Arc::new(FlakyClient {
                name: ProviderName::Claude,
                fail_times: AtomicU32::new(2),
            }),
            8,
        );

        let response = pool.call(ProviderName::Claude, request()).await.unwrap();
        assert_eq!(response.content, "echo: hello");
    }

    #[tokio::test]
    async fn concurrency_cap_rejects_excess_queue_wait() {
        let mut pool = ProviderPool::new(1, Duration::from_millis(20), 0);
        pool.register(
            Arc::new(FlakyClient {
                name: ProviderName::Claude,
                fail_times: AtomicU32::new(0),
            }),
            1,
        );

        let handle = pool.handles.get(&ProviderName::Claude).unwrap();
        let _permit = handle.semaphore.acquire().await.unwrap();

        let err = pool.call(ProviderName::Claude, request()).await.unwrap_err();
        assert_eq!(err.code(), "ProviderBusy");
    }

    #[test]
    fn backoff_doubles_from_500ms_and_caps_at_4s() {
        let transport_err = EngineError::TransportError("reset".to_string());
        assert_eq!(retry_backoff(0, &transport_err), Duration::from_millis(500));
        assert_eq!(retry_backoff(1, &transport_err), Duration::from_secs(1));
        assert_eq!(retry_backoff(2, &transport_err), Duration::from_secs(2));
        assert_eq!(retry_backoff(3, &transport_err), Duration::from_secs(4));
        assert_eq!(retry_backoff(6, &transport_err), Duration::from_secs(4));
    }

    #[test]
    fn backoff_honors_retry_after_over_the_computed_schedule() {
        let rate_limited = EngineError::RateLimited { retry_after_secs: Some(17) };
        assert_eq!(retry_backoff(0, &rate_limited), Duration::from_secs(17));
    }

    #[test]
    fn terminal_provider_error_is_not_transient() {
        let err = EngineError::ProviderError {
            message: "claude 400 Bad Request".to_string(),
            transient: false,
        };
        assert!(!is_transient(&err));
    }

    #[test]
    fn server_shaped_provider_error_is_transient() {
        let err = EngineError::ProviderError {
            message: "claude 503 Service Unavailable".to_string(),
            transient: true,
        };
        assert!(is_transient(&err));
    }

    #[tokio::test]
    async fn terminal_4xx_provider_error_is_not_retried() {
        struct TerminalClient;

        #[async_trait]
        impl ProviderClient for TerminalClient {
            fn name(&self) -> ProviderName {
                ProviderName::Claude
            }

            async fn call(&self, _request: ProviderCall) -> EngineResult<ProviderResponse> {
                Err(EngineError::ProviderError {
                    message: "claude 400: bad request".to_string(),
                    transient: false,
                })
            }

            async fn is_healthy(&self, _deadline: Duration) -> bool {
                true
            }
        }

        let mut pool = ProviderPool::new(8, Duration::from_secs(1), 3);
        pool.register(Arc::new(TerminalClient), 8);

        let err = pool.call(ProviderName::Claude, request()).await.unwrap_err();
        assert_eq!(err.code(), "ProviderError");
    }
}
