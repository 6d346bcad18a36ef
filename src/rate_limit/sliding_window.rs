use crate::config::RateLimitPolicyConfig;
use crate::errors::{AppError, Result};
use crate::rate_limit::clock::{Clock, SystemClock};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use std::num::{NonZeroU32, NonZeroU64};
use std::sync::Arc;

/// Per-call limiter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitOptions {
    limit: NonZeroU32,
    window_ms: NonZeroU64,
    key: Option<String>,
}

impl RateLimitOptions {
    /// Both `limit` and `window_ms` must be positive
    pub fn new(limit: u32, window_ms: u64) -> Result<Self> {
        let limit = NonZeroU32::new(limit)
            .ok_or_else(|| AppError::Configuration("Rate limit must be positive".to_string()))?;
        let window_ms = NonZeroU64::new(window_ms).ok_or_else(|| {
            AppError::Configuration("Rate limit window must be positive".to_string())
        })?;

        Ok(Self {
            limit,
            window_ms,
            key: None,
        })
    }

    /// Use a fixed scope instead of the request path
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn limit(&self) -> u32 {
        self.limit.get()
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms.get()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl TryFrom<&RateLimitPolicyConfig> for RateLimitOptions {
    type Error = AppError;

    fn try_from(policy: &RateLimitPolicyConfig) -> Result<Self> {
        let options = Self::new(policy.limit, policy.window_ms)?;
        Ok(match &policy.key {
            Some(key) => options.with_key(key.clone()),
            None => options,
        })
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request is admitted
    pub ok: bool,
    /// Admissions left in the current window, 0 when denied
    pub remaining: u32,
    /// Seconds until the oldest recorded hit expires, only set when denied
    pub retry_after: Option<u64>,
}

impl RateLimitResult {
    pub fn allowed(remaining: u32) -> Self {
        Self {
            ok: true,
            remaining,
            retry_after: None,
        }
    }

    pub fn denied(retry_after: u64) -> Self {
        Self {
            ok: false,
            remaining: 0,
            retry_after: Some(retry_after),
        }
    }
}

/// Seconds until `oldest` leaves the window, never less than 1
pub fn retry_after_secs(window_ms: u64, now_ms: u64, oldest_ms: u64) -> u64 {
    let elapsed = now_ms.saturating_sub(oldest_ms);
    window_ms.saturating_sub(elapsed).div_ceil(1000).max(1)
}

/// Storage for bucket hit timestamps
#[async_trait]
pub trait HitStore: Send + Sync {
    /// Prune, decide, and record an admission atomically for one bucket
    async fn check_and_record(
        &self,
        bucket_key: &str,
        options: &RateLimitOptions,
    ) -> Result<RateLimitResult>;

    /// Hits inside the trailing window, without recording one
    async fn count(&self, bucket_key: &str, window_ms: u64) -> Result<usize>;

    /// Forget every hit for a bucket
    async fn reset(&self, bucket_key: &str) -> Result<()>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// Number of buckets held, when cheap to know
    fn tracked_keys(&self) -> Option<usize> {
        None
    }

    fn backend(&self) -> &'static str;
}

/// Sliding window rate limiter holding buckets in process memory.
///
/// Each bucket's retrieve-filter-append runs under the map's entry lock, so
/// concurrent checks on the same key never interleave. Stale timestamps are
/// dropped only when their key is touched; keys themselves are never evicted.
#[derive(Debug)]
pub struct InMemoryHitStore {
    buckets: DashMap<String, Vec<u64>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryHitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHitStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            clock,
        }
    }

    /// Check if a request is allowed and record it when it is
    pub fn check_and_record_now(
        &self,
        bucket_key: &str,
        options: &RateLimitOptions,
    ) -> RateLimitResult {
        let now = self.clock.now_ms();
        let window_ms = options.window_ms();
        let limit = options.limit();

        let result = match self.buckets.entry(bucket_key.to_string()) {
            Entry::Occupied(mut entry) => {
                let hits = entry.get_mut();
                hits.retain(|&ts| now.saturating_sub(ts) < window_ms);

                if (hits.len() as u64) < u64::from(limit) {
                    hits.push(now);
                    RateLimitResult::allowed(limit - hits.len() as u32)
                } else {
                    let oldest = hits.first().copied().unwrap_or(now);
                    RateLimitResult::denied(retry_after_secs(window_ms, now, oldest))
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(vec![now]);
                RateLimitResult::allowed(limit - 1)
            }
        };

        tracing::debug!(
            key = %bucket_key,
            allowed = %result.ok,
            remaining = %result.remaining,
            "Rate limit check result"
        );

        result
    }

    /// Timestamps currently stored for a bucket, stale ones included
    pub fn stored_hits(&self, bucket_key: &str) -> usize {
        self.buckets
            .get(bucket_key)
            .map(|hits| hits.len())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[async_trait]
impl HitStore for InMemoryHitStore {
    async fn check_and_record(
        &self,
        bucket_key: &str,
        options: &RateLimitOptions,
    ) -> Result<RateLimitResult> {
        Ok(self.check_and_record_now(bucket_key, options))
    }

    async fn count(&self, bucket_key: &str, window_ms: u64) -> Result<usize> {
        let now = self.clock.now_ms();
        Ok(self
            .buckets
            .get(bucket_key)
            .map(|hits| {
                hits.iter()
                    .filter(|&&ts| now.saturating_sub(ts) < window_ms)
                    .count()
            })
            .unwrap_or_default())
    }

    async fn reset(&self, bucket_key: &str) -> Result<()> {
        self.buckets.remove(bucket_key);
        tracing::info!(key = %bucket_key, "Rate limit reset");
        Ok(())
    }

    fn tracked_keys(&self) -> Option<usize> {
        Some(self.buckets.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
