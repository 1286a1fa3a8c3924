use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamscout_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, AvailabilityCache, CacheBackend, MemoryBackend, RedisBackend},
    models::ProviderKind,
    services::{
        providers::{
            build_http_client, StreamingAvailabilityProvider, TmdbProvider, UtellyProvider,
            WatchmodeProvider,
        },
        Clock, RateLimiter, Resolver, StreamingProvider, SystemClock,
    },
};

/// Builds adapters in priority order, skipping providers without an API key
fn build_providers(
    config: &Config,
    http_client: &reqwest::Client,
) -> anyhow::Result<Vec<Arc<dyn StreamingProvider>>> {
    let mut providers: Vec<Arc<dyn StreamingProvider>> = Vec::new();

    for kind in config.provider_priority()? {
        let Some(api_key) = config.api_key(kind) else {
            tracing::warn!(provider = %kind, "No API key configured, provider disabled");
            continue;
        };
        let api_key = api_key.to_string();
        let api_url = config.api_url(kind).to_string();
        let client = http_client.clone();

        let provider: Arc<dyn StreamingProvider> = match kind {
            ProviderKind::Tmdb => Arc::new(TmdbProvider::new(client, api_key, api_url)),
            ProviderKind::StreamingAvailability => {
                Arc::new(StreamingAvailabilityProvider::new(client, api_key, api_url))
            }
            ProviderKind::Watchmode => Arc::new(WatchmodeProvider::new(client, api_key, api_url)),
            ProviderKind::Utelly => Arc::new(UtellyProvider::new(client, api_key, api_url)),
        };
        providers.push(provider);
    }

    if providers.is_empty() {
        tracing::warn!("No providers enabled; every lookup will return an empty record");
    }
    Ok(providers)
}

fn build_cache_backend(
    config: &Config,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Arc<dyn CacheBackend>> {
    match &config.redis_url {
        Some(redis_url) => {
            let client = create_redis_client(redis_url)?;
            tracing::info!("Using Redis availability cache");
            Ok(Arc::new(RedisBackend::new(client)))
        }
        None => {
            tracing::info!("REDIS_URL not set, using in-memory availability cache");
            Ok(Arc::new(MemoryBackend::new(clock)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamscout_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let http_client = build_http_client(config.request_timeout())?;
    let providers = build_providers(&config, &http_client)?;

    let limiter = Arc::new(RateLimiter::new(config.rate_limit_config(), clock.clone()));
    let backend = build_cache_backend(&config, clock.clone())?;
    let cache = AvailabilityCache::new(backend, clock.clone(), config.stale_retention());

    let resolver = Arc::new(Resolver::new(
        providers,
        limiter,
        cache,
        clock,
        config.resolver_config(),
    ));

    let state = AppState::new(resolver, config.default_resolve_options());
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
