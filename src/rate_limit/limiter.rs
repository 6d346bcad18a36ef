use crate::config::{RateLimitBackend, RateLimitConfig};
use crate::errors::Result;
use crate::observability::MetricsRecorder;
use crate::redis::{create_client, RedisHitStore};
use crate::rate_limit::sliding_window::{
    HitStore, InMemoryHitStore, RateLimitOptions, RateLimitResult,
};
use std::sync::Arc;

/// Rate limiter shared by every request handler.
///
/// Owns its store; build one per process and hand it to the router state.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn HitStore>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(store: Arc<dyn HitStore>) -> Self {
        Self { store }
    }

    /// Rate limiter backed by process memory and the system clock
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryHitStore::new()))
    }

    /// Build the limiter for the configured backend
    pub async fn connect(config: &RateLimitConfig) -> Result<Self> {
        let limiter = match config.backend {
            RateLimitBackend::Memory => Self::in_memory(),
            RateLimitBackend::Redis => {
                let manager = create_client(&config.redis_url).await?;
                Self::new(Arc::new(RedisHitStore::new(manager)))
            }
        };

        tracing::info!(backend = limiter.backend(), "Rate limiter ready");

        Ok(limiter)
    }

    /// `"{identity}:{scope}"`
    pub fn bucket_key(identity: &str, scope: &str) -> String {
        format!("{}:{}", identity, scope)
    }

    /// Check and record a hit for `identity`.
    ///
    /// `scope` is used when the options carry no key of their own. Store
    /// failures admit the request.
    pub async fn check(
        &self,
        identity: &str,
        scope: &str,
        options: &RateLimitOptions,
    ) -> RateLimitResult {
        let scope = options.key().unwrap_or(scope);
        let key = Self::bucket_key(identity, scope);

        tracing::debug!(
            key = %key,
            limit = %options.limit(),
            window_ms = %options.window_ms(),
            "Checking rate limit"
        );

        let result = match self.store.check_and_record(&key, options).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    backend = self.store.backend(),
                    error = %e,
                    "Rate limit store unavailable, admitting request"
                );
                MetricsRecorder::record_rate_limit_store_error(self.store.backend());
                RateLimitResult::allowed(options.limit())
            }
        };

        MetricsRecorder::record_rate_limit_decision(scope, result.ok);

        result
    }

    /// Get current count for a bucket
    pub async fn count(&self, bucket_key: &str, window_ms: u64) -> Result<usize> {
        self.store.count(bucket_key, window_ms).await
    }

    /// Reset rate limit for a specific bucket
    pub async fn reset(&self, bucket_key: &str) -> Result<()> {
        self.store.reset(bucket_key).await
    }

    /// Buckets held by the store, when it can tell cheaply.
    ///
    /// Sampled at scrape time rather than per check.
    pub fn tracked_keys(&self) -> Option<usize> {
        self.store.tracked_keys()
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }
}
