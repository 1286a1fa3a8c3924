use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::{
    models::ProviderKind,
    services::{BackoffPolicy, RateLimitConfig, ResolveOptions, ResolverConfig},
};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL; the in-memory cache is used when unset
    pub redis_url: Option<String>,

    /// Comma-separated provider order, highest priority first
    #[serde(default = "default_provider_priority")]
    pub provider_priority: String,

    /// TMDB v3 API key or v4 read access token
    pub tmdb_api_key: Option<String>,

    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Streaming Availability API key (RapidAPI)
    pub streaming_api_key: Option<String>,

    /// Streaming Availability API base URL
    #[serde(default = "default_streaming_api_url")]
    pub streaming_api_url: String,

    pub watchmode_api_key: Option<String>,

    #[serde(default = "default_watchmode_api_url")]
    pub watchmode_api_url: String,

    /// Utelly API key (RapidAPI)
    pub utelly_api_key: Option<String>,

    #[serde(default = "default_utelly_api_url")]
    pub utelly_api_url: String,

    /// Requests allowed per rate-limit window, per provider
    #[serde(default = "default_tmdb_rate_limit")]
    pub tmdb_rate_limit: u32,

    #[serde(default = "default_streaming_availability_rate_limit")]
    pub streaming_availability_rate_limit: u32,

    #[serde(default = "default_watchmode_rate_limit")]
    pub watchmode_rate_limit: u32,

    #[serde(default = "default_utelly_rate_limit")]
    pub utelly_rate_limit: u32,

    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,

    /// Fresh lifetime of a cached record
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,

    /// How long an expired record is kept for fail-soft serving
    #[serde(default = "default_stale_retention_seconds")]
    pub stale_retention_seconds: u64,

    #[serde(default = "default_max_providers")]
    pub max_providers: usize,

    #[serde(default = "default_stop_on_subscription")]
    pub stop_on_subscription: bool,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_limiter_wait_ms")]
    pub max_limiter_wait_ms: u64,

    #[serde(default)]
    pub transient_retries: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_provider_priority() -> String {
    "tmdb,streaming_availability,watchmode,utelly".to_string()
}

fn default_tmdb_api_url() -> String {
    crate::services::providers::tmdb::DEFAULT_TMDB_API_URL.to_string()
}

fn default_streaming_api_url() -> String {
    crate::services::providers::streaming_availability::DEFAULT_STREAMING_API_URL.to_string()
}

fn default_watchmode_api_url() -> String {
    crate::services::providers::watchmode::DEFAULT_WATCHMODE_API_URL.to_string()
}

fn default_utelly_api_url() -> String {
    crate::services::providers::utelly::DEFAULT_UTELLY_API_URL.to_string()
}

fn default_tmdb_rate_limit() -> u32 {
    40
}

fn default_streaming_availability_rate_limit() -> u32 {
    8
}

fn default_watchmode_rate_limit() -> u32 {
    10
}

fn default_utelly_rate_limit() -> u32 {
    5
}

fn default_rate_limit_window_ms() -> u64 {
    1000
}

fn default_cache_ttl_seconds() -> u64 {
    24 * 60 * 60
}

fn default_stale_retention_seconds() -> u64 {
    7 * 24 * 60 * 60
}

fn default_max_providers() -> usize {
    3
}

fn default_stop_on_subscription() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_limiter_wait_ms() -> u64 {
    2_000
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Parses a provider name as used in `PROVIDER_PRIORITY`
fn parse_provider(name: &str) -> Option<ProviderKind> {
    match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "tmdb" => Some(ProviderKind::Tmdb),
        "streaming_availability" | "streaming" => Some(ProviderKind::StreamingAvailability),
        "watchmode" => Some(ProviderKind::Watchmode),
        "utelly" => Some(ProviderKind::Utelly),
        _ => None,
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.provider_priority()?;
        if self.max_providers == 0 {
            anyhow::bail!("MAX_PROVIDERS must be at least 1");
        }
        if self.rate_limit_window_ms == 0 {
            anyhow::bail!("RATE_LIMIT_WINDOW_MS must be positive");
        }
        Ok(())
    }

    /// Provider order with duplicates removed
    pub fn provider_priority(&self) -> anyhow::Result<Vec<ProviderKind>> {
        let mut order = Vec::new();
        for name in self.provider_priority.split(',').filter(|s| !s.trim().is_empty()) {
            let kind = parse_provider(name)
                .ok_or_else(|| anyhow::anyhow!("Unknown provider in PROVIDER_PRIORITY: {}", name))?;
            if !order.contains(&kind) {
                order.push(kind);
            }
        }

        if order.is_empty() {
            anyhow::bail!("PROVIDER_PRIORITY must name at least one provider");
        }
        Ok(order)
    }

    /// API key for a provider, if one is configured and non-blank
    pub fn api_key(&self, provider: ProviderKind) -> Option<&str> {
        let key = match provider {
            ProviderKind::Tmdb => &self.tmdb_api_key,
            ProviderKind::StreamingAvailability => &self.streaming_api_key,
            ProviderKind::Watchmode => &self.watchmode_api_key,
            ProviderKind::Utelly => &self.utelly_api_key,
        };
        key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn api_url(&self, provider: ProviderKind) -> &str {
        match provider {
            ProviderKind::Tmdb => &self.tmdb_api_url,
            ProviderKind::StreamingAvailability => &self.streaming_api_url,
            ProviderKind::Watchmode => &self.watchmode_api_url,
            ProviderKind::Utelly => &self.utelly_api_url,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            window: Duration::from_millis(self.rate_limit_window_ms),
            limits: HashMap::from([
                (ProviderKind::Tmdb, self.tmdb_rate_limit),
                (
                    ProviderKind::StreamingAvailability,
                    self.streaming_availability_rate_limit,
                ),
                (ProviderKind::Watchmode, self.watchmode_rate_limit),
                (ProviderKind::Utelly, self.utelly_rate_limit),
            ]),
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_seconds),
            request_timeout: self.request_timeout(),
            max_limiter_wait: Duration::from_millis(self.max_limiter_wait_ms),
            transient_retries: self.transient_retries,
            backoff: BackoffPolicy::new(
                Duration::from_millis(self.backoff_base_ms),
                Duration::from_millis(self.backoff_max_ms),
            ),
        }
    }

    /// Options applied when a request doesn't override them
    pub fn default_resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            force_refresh: false,
            max_providers: self.max_providers,
            stop_on_subscription: self.stop_on_subscription,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn stale_retention(&self) -> Duration {
        Duration::from_secs(self.stale_retention_seconds)
    }
}
