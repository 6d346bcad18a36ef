use crate::rate_limit::RateLimiter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    pub rate_limit_store: ComponentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub status: String,
    pub backend: String,
    pub message: Option<String>,
}

pub struct HealthChecker {
    limiter: RateLimiter,
}

impl HealthChecker {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }

    /// Liveness check - is the service running?
    pub async fn liveness(&self) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks: HealthChecks {
                rate_limit_store: ComponentStatus {
                    status: "unknown".to_string(),
                    backend: self.limiter.backend().to_string(),
                    message: None,
                },
            },
        }
    }

    /// Readiness check - can the service handle requests?
    pub async fn readiness(&self) -> HealthStatus {
        let store_status = self.check_rate_limit_store().await;

        let overall_status = if store_status.status == "ok" {
            "ok"
        } else {
            "degraded"
        };

        HealthStatus {
            status: overall_status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks: HealthChecks {
                rate_limit_store: store_status,
            },
        }
    }

    async fn check_rate_limit_store(&self) -> ComponentStatus {
        let backend = self.limiter.backend().to_string();
        match self.limiter.health_check().await {
            Ok(_) => ComponentStatus {
                status: "ok".to_string(),
                backend,
                message: None,
            },
            Err(e) => ComponentStatus {
                status: "error".to_string(),
                backend,
                message: Some(format!("Rate limit store check failed: {}", e)),
            },
        }
    }
}
