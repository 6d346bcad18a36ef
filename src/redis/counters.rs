// Rate limit buckets stored in Redis sorted sets

use crate::errors::Result;
use crate::rate_limit::clock::{Clock, SystemClock};
use crate::rate_limit::sliding_window::{HitStore, RateLimitOptions, RateLimitResult};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Script};
use std::sync::Arc;
use uuid::Uuid;

const RATE_LIMIT_PREFIX: &str = "ratelimit:";

// Scores are millisecond timestamps. Prune, count, then either admit (ZADD)
// or report the wait until the lowest score leaves the window.
const CHECK_AND_RECORD: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local member = ARGV[4]

redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window_ms)

local current = redis.call('ZCARD', key)
if current < limit then
    redis.call('ZADD', key, now, member)
    redis.call('PEXPIRE', key, window_ms)
    return {1, limit - current - 1}
end

local retry_after = 1
local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
if #oldest > 0 then
    retry_after = math.ceil((window_ms - (now - tonumber(oldest[2]))) / 1000)
    if retry_after < 1 then
        retry_after = 1
    end
end
return {0, retry_after}
"#;

/// Sliding window buckets shared by every instance pointing at one Redis
pub struct RedisHitStore {
    manager: ConnectionManager,
    script: Script,
    clock: Arc<dyn Clock>,
}

impl RedisHitStore {
    pub fn new(manager: ConnectionManager) -> Self {
        Self::with_clock(manager, Arc::new(SystemClock))
    }

    pub fn with_clock(manager: ConnectionManager, clock: Arc<dyn Clock>) -> Self {
        Self {
            manager,
            script: Script::new(CHECK_AND_RECORD),
            clock,
        }
    }

    fn redis_key(bucket_key: &str) -> String {
        format!("{}{}", RATE_LIMIT_PREFIX, bucket_key)
    }
}

#[async_trait]
impl HitStore for RedisHitStore {
    async fn check_and_record(
        &self,
        bucket_key: &str,
        options: &RateLimitOptions,
    ) -> Result<RateLimitResult> {
        let now = self.clock.now_ms();
        // Members must be unique or same-millisecond hits would collapse
        let member = format!("{}-{}", now, Uuid::new_v4());
        let mut conn = self.manager.clone();

        let reply: Vec<i64> = self
            .script
            .key(Self::redis_key(bucket_key))
            .arg(now)
            .arg(options.window_ms())
            .arg(options.limit())
            .arg(member)
            .invoke_async(&mut conn)
            .await?;

        let result = match reply.as_slice() {
            [1, remaining] => RateLimitResult::allowed((*remaining).max(0) as u32),
            [_, retry_after] => RateLimitResult::denied((*retry_after).max(1) as u64),
            _ => {
                return Err(crate::errors::AppError::Internal(format!(
                    "Unexpected rate limit script reply: {:?}",
                    reply
                )))
            }
        };

        tracing::debug!(
            key = %bucket_key,
            allowed = %result.ok,
            remaining = %result.remaining,
            "Rate limit check result"
        );

        Ok(result)
    }

    async fn count(&self, bucket_key: &str, window_ms: u64) -> Result<usize> {
        let now = self.clock.now_ms();
        let mut conn = self.manager.clone();

        // Exclusive lower bound: a hit exactly window_ms old no longer counts
        let count: usize = redis::cmd("ZCOUNT")
            .arg(Self::redis_key(bucket_key))
            .arg(format!("({}", now.saturating_sub(window_ms)))
            .arg("+inf")
            .query_async(&mut conn)
            .await?;

        Ok(count)
    }

    async fn reset(&self, bucket_key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("DEL")
            .arg(Self::redis_key(bucket_key))
            .query_async(&mut conn)
            .await?;

        tracing::info!(key = %bucket_key, "Rate limit reset");

        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        crate::redis::health_check(&mut conn).await
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
