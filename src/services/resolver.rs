/// Multi-provider availability resolver
///
/// A resolve walks `CacheCheck -> ProviderLoop -> Merge -> CacheWrite`. The only
/// state shared between resolves is the cache and the rate limiter; everything
/// else lives on the stack of a single call, so dropping the future abandons
/// in-flight provider calls and discards any partial merge.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    db::{AvailabilityCache, CacheKey},
    error::{AdapterError, ResolveError},
    models::{
        AvailabilityRecord, CanonicalService, MovieQuery, OfferType, ProviderKind, StreamingOffer,
    },
    services::{
        backoff::BackoffPolicy, clock::Clock, providers::StreamingProvider,
        rate_limiter::RateLimiter,
    },
};

/// Per-call resolve options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Skip the cache read (the result is still written back)
    pub force_refresh: bool,
    /// Maximum number of provider calls; skipped providers don't count
    pub max_providers: usize,
    /// Stop querying once any subscription offer has been found
    pub stop_on_subscription: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            force_refresh: false,
            max_providers: 3,
            stop_on_subscription: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub cache_ttl: Duration,
    /// Bound on each provider call; exceeding it counts as a transient failure
    pub request_timeout: Duration,
    /// Longest the resolver will wait on the last remaining provider's budget
    pub max_limiter_wait: Duration,
    /// Same-provider retries after a transient failure
    pub transient_retries: u32,
    pub backoff: BackoffPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            request_timeout: Duration::from_secs(10),
            max_limiter_wait: Duration::from_secs(2),
            transient_retries: 0,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Offers merged across providers, unique by `(service, offer_type)`
#[derive(Debug, Default)]
pub struct MergedOffers {
    offers: Vec<StreamingOffer>,
    seen: HashSet<(CanonicalService, OfferType)>,
    source: Option<ProviderKind>,
}

impl MergedOffers {
    /// Appends offers not already present; earlier (higher-priority) offers win
    pub fn extend(&mut self, provider: ProviderKind, offers: Vec<StreamingOffer>) {
        for offer in offers {
            if self
                .seen
                .insert((offer.service.clone(), offer.offer_type))
            {
                self.source.get_or_insert(provider);
                self.offers.push(offer);
            }
        }
    }

    pub fn has_subscription(&self) -> bool {
        self.offers
            .iter()
            .any(|o| o.offer_type == OfferType::Subscription)
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn into_parts(self) -> (Vec<StreamingOffer>, Option<ProviderKind>) {
        (self.offers, self.source)
    }
}

pub struct Resolver {
    /// In priority order
    providers: Vec<Arc<dyn StreamingProvider>>,
    limiter: Arc<RateLimiter>,
    cache: AvailabilityCache,
    clock: Arc<dyn Clock>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(
        providers: Vec<Arc<dyn StreamingProvider>>,
        limiter: Arc<RateLimiter>,
        cache: AvailabilityCache,
        clock: Arc<dyn Clock>,
        config: ResolverConfig,
    ) -> Self {
        tracing::info!(
            providers = ?providers.iter().map(|p| p.kind()).collect::<Vec<_>>(),
            cache_ttl_secs = config.cache_ttl.as_secs(),
            "Resolver initialized"
        );

        Self {
            providers,
            limiter,
            cache,
            clock,
            config,
        }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn provider_kinds(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    /// Resolves streaming availability for a movie in a region
    ///
    /// Always returns a record for a valid query: provider failures are absorbed,
    /// and when every provider fails the last cached record is served with
    /// `is_stale = true`, or an empty record if nothing was ever cached.
    #[tracing::instrument(
        skip(self, query, options),
        fields(external_id = query.external_id, region = %query.region)
    )]
    pub async fn resolve(
        &self,
        query: &MovieQuery,
        options: &ResolveOptions,
    ) -> Result<AvailabilityRecord, ResolveError> {
        query.validate()?;
        if options.max_providers == 0 {
            return Err(ResolveError::InvalidOptions(
                "max_providers must be at least 1".to_string(),
            ));
        }

        let query = MovieQuery {
            region: query.region_code(),
            ..query.clone()
        };
        let key = CacheKey::for_query(&query);

        if !options.force_refresh {
            if let Some(entry) = self.cache.get(&key).await {
                tracing::debug!(key = %key, "Cache hit");
                return Ok(entry.record);
            }
            tracing::debug!(key = %key, "Cache miss");
        }

        let (merged, successes) = self.query_providers(&query, options).await;

        if successes == 0 {
            return Ok(self.fail_soft(query, &key).await);
        }

        let (offers, source_provider) = merged.into_parts();
        let record = AvailabilityRecord {
            query,
            offers,
            source_provider,
            fetched_at: self.clock.now(),
            is_stale: false,
        };

        self.cache
            .put(&key, record.clone(), self.config.cache_ttl)
            .await;

        tracing::info!(
            key = %key,
            offers = record.offers.len(),
            source_provider = ?record.source_provider,
            successes,
            "Availability resolved"
        );

        Ok(record)
    }

    /// Drops the cached record for the query's movie and region
    pub async fn invalidate(&self, query: &MovieQuery) -> Result<(), ResolveError> {
        query.validate()?;
        let key = CacheKey::for_query(query);
        self.cache.invalidate(&key).await;
        tracing::info!(key = %key, "Availability cache invalidated");
        Ok(())
    }

    /// Walks providers in priority order; returns the merge and the number of successful calls
    async fn query_providers(
        &self,
        query: &MovieQuery,
        options: &ResolveOptions,
    ) -> (MergedOffers, usize) {
        let mut merged = MergedOffers::default();
        let mut calls = 0;
        let mut successes = 0;

        for (index, provider) in self.providers.iter().enumerate() {
            if calls >= options.max_providers {
                tracing::debug!(max_providers = options.max_providers, "Provider call limit reached");
                break;
            }

            let kind = provider.kind();
            let is_last = index + 1 == self.providers.len();

            if !self.acquire(kind, is_last).await {
                tracing::debug!(provider = %kind, "Provider skipped by rate limiter");
                continue;
            }
            calls += 1;

            match self.call_with_retries(provider.as_ref(), query).await {
                Ok(offers) => {
                    successes += 1;
                    tracing::debug!(provider = %kind, offers = offers.len(), "Provider succeeded");
                    merged.extend(kind, offers);

                    if options.stop_on_subscription && merged.has_subscription() {
                        tracing::debug!(provider = %kind, "Subscription offer found, stopping early");
                        break;
                    }
                }
                Err(AdapterError::RateLimited(retry_after)) => {
                    self.limiter.record_rate_limited(kind, retry_after).await;
                }
                Err(e) => {
                    tracing::warn!(provider = %kind, error = %e, "Provider failed, trying next");
                }
            }
        }

        (merged, successes)
    }

    /// Checks the provider's budget, waiting a bounded time if it is the last one left
    async fn acquire(&self, kind: ProviderKind, is_last: bool) -> bool {
        if self.limiter.try_acquire(kind).await {
            return true;
        }
        if !is_last {
            return false;
        }

        let wait = self.limiter.wait_time(kind).await.unwrap_or(Duration::ZERO);
        if wait > self.config.max_limiter_wait {
            tracing::debug!(
                provider = %kind,
                wait_ms = wait.as_millis() as u64,
                "Last provider unavailable beyond wait bound"
            );
            return false;
        }

        tracing::debug!(provider = %kind, wait_ms = wait.as_millis() as u64, "Waiting for last provider");
        self.clock.sleep(wait).await;
        self.limiter.try_acquire(kind).await
    }

    /// Calls a provider, retrying transient failures with backoff when configured
    async fn call_with_retries(
        &self,
        provider: &dyn StreamingProvider,
        query: &MovieQuery,
    ) -> Result<Vec<StreamingOffer>, AdapterError> {
        let kind = provider.kind();
        let mut attempt = 0;

        loop {
            let result = self.call_once(provider, query).await;

            let Err(AdapterError::Transient(cause)) = &result else {
                return result;
            };
            if attempt >= self.config.transient_retries {
                return result;
            }

            let delay = self
                .config
                .backoff
                .next_delay_with_jitter(attempt, &mut rand::rng());
            tracing::warn!(
                provider = %kind,
                attempt,
                delay_ms = delay.as_millis() as u64,
                cause = %cause,
                "Transient provider failure, backing off"
            );
            self.clock.sleep(delay).await;
            attempt += 1;

            if !self.limiter.try_acquire(kind).await {
                return result;
            }
        }
    }

    async fn call_once(
        &self,
        provider: &dyn StreamingProvider,
        query: &MovieQuery,
    ) -> Result<Vec<StreamingOffer>, AdapterError> {
        let timeout = self.config.request_timeout;

        match tokio::time::timeout(timeout, provider.fetch_availability(query)).await {
            Ok(Err(AdapterError::NotFound)) => Ok(Vec::new()),
            Ok(result) => result,
            Err(_) => Err(AdapterError::Transient(format!(
                "{} timed out after {}ms",
                provider.kind(),
                timeout.as_millis()
            ))),
        }
    }

    async fn fail_soft(&self, query: MovieQuery, key: &CacheKey) -> AvailabilityRecord {
        if let Some(entry) = self.cache.get_stale(key).await {
            tracing::warn!(
                key = %key,
                fetched_at = %entry.record.fetched_at,
                "All providers failed, serving stale record"
            );
            return AvailabilityRecord {
                is_stale: true,
                ..entry.record
            };
        }

        tracing::warn!(key = %key, "All providers failed and nothing cached, returning empty record");
        AvailabilityRecord::empty(query, self.clock.now())
    }
}
