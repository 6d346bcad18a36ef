use crate::errors::{AppError, Result};
use serde::Deserialize;
use std::env;

/// Built-in defaults, layered underneath files and environment variables
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub payments: PaymentsConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub backend: RateLimitBackend,
    #[serde(default)]
    pub redis_url: String,
    pub checkout: RateLimitPolicyConfig,
    pub register: RateLimitPolicyConfig,
}

/// Per-endpoint limiter policy
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitPolicyConfig {
    pub limit: u32,
    pub window_ms: u64,
    /// Scope discriminator; the request path is used when absent
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    pub app_env: String,
    #[serde(default)]
    pub stripe_test_secret_key: String,
    #[serde(default)]
    pub stripe_live_secret_key: String,
    #[serde(default)]
    pub publishable_key_test: Option<String>,
    #[serde(default)]
    pub publishable_key_live: Option<String>,
}

impl PaymentsConfig {
    pub fn is_live(&self) -> bool {
        self.app_env == "production"
    }

    /// "LIVE" or "TEST"
    pub fn mode(&self) -> &'static str {
        if self.is_live() {
            "LIVE"
        } else {
            "TEST"
        }
    }

    pub fn secret_key(&self) -> &str {
        if self.is_live() {
            &self.stripe_live_secret_key
        } else {
            &self.stripe_test_secret_key
        }
    }

    pub fn publishable_key(&self) -> Option<&str> {
        if self.is_live() {
            self.publishable_key_live.as_deref()
        } else {
            self.publishable_key_test.as_deref()
        }
    }

    fn validate(&self) -> Result<()> {
        let key = self.secret_key();
        if key.is_empty() {
            return Err(AppError::Configuration(format!(
                "Missing payment secret key for {} environment",
                self.mode()
            )));
        }

        let prefix = if self.is_live() { "sk_live_" } else { "sk_test_" };
        if !key.starts_with(prefix) {
            return Err(AppError::Configuration(format!(
                "{} environment requires a {} key",
                self.mode(),
                prefix
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::load_with(|name| env::var(name).ok())
    }

    /// Layers the built-in defaults, `config/{APP_ENV}`, `USERDIR__*`
    /// variables, then the deployment variables `APP_ENV`,
    /// `STRIPE_LIVE_SECRET_KEY` and `STRIPE_TEST_SECRET_KEY`.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let app_env = lookup("APP_ENV");
        let environment = app_env.clone().unwrap_or_else(|| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            // Add environment-specific config
            .add_source(
                config::File::with_name(&format!("config/{}", environment)).required(false),
            )
            // e.g., USERDIR__SERVER__PORT=8080
            .add_source(
                config::Environment::with_prefix("USERDIR")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("payments.app_env", app_env)
            .and_then(|builder| {
                builder.set_override_option(
                    "payments.stripe_live_secret_key",
                    lookup("STRIPE_LIVE_SECRET_KEY"),
                )
            })
            .and_then(|builder| {
                builder.set_override_option(
                    "payments.stripe_test_secret_key",
                    lookup("STRIPE_TEST_SECRET_KEY"),
                )
            })
            .and_then(|builder| builder.build())
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Configuration(e.to_string()))
    }

    /// Built-in defaults only, ignoring files and the environment
    pub fn from_defaults() -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| AppError::Configuration(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Configuration("Invalid port number".to_string()));
        }

        for (name, policy) in [
            ("checkout", &self.rate_limit.checkout),
            ("register", &self.rate_limit.register),
        ] {
            if policy.limit == 0 || policy.window_ms == 0 {
                return Err(AppError::Configuration(format!(
                    "Rate limit policy '{}' needs a positive limit and window",
                    name
                )));
            }
        }

        if self.rate_limit.backend == RateLimitBackend::Redis
            && self.rate_limit.redis_url.is_empty()
        {
            return Err(AppError::Configuration(
                "Redis URL is required for the redis rate limit backend".to_string(),
            ));
        }

        self.payments.validate()
    }
}
