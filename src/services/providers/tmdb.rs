/// TMDB watch providers (primary catalog)
///
/// Looks up availability by TMDB movie ID, which is the resolver's external ID,
/// so no search step is needed. TMDB groups providers by monetization type and
/// only offers a region-level watch link, not per-service deep links.
use reqwest::Client as HttpClient;

use crate::{
    error::AdapterError,
    models::{
        provider_types::{TmdbRegionProviders, TmdbWatchProviders},
        MovieQuery, ProviderKind, StreamingOffer,
    },
    services::{
        normalizer::{normalize_offer_type, normalize_service_name},
        providers::{check_status, decode_json, require_external_id, StreamingProvider},
    },
};

pub const DEFAULT_TMDB_API_URL: &str = "https://api.themoviedb.org";

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbProvider {
    pub fn new(http_client: HttpClient, api_key: String, api_url: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// v4 read access tokens are JWTs and go in a bearer header; v3 keys go in the query
    fn uses_bearer_token(&self) -> bool {
        self.api_key.starts_with("eyJ")
    }

    fn convert_region(&self, region: &TmdbRegionProviders) -> Vec<StreamingOffer> {
        let link = region.link.clone().unwrap_or_default();
        let groups = [
            ("flatrate", &region.flatrate),
            ("free", &region.free),
            ("ads", &region.ads),
            ("rent", &region.rent),
            ("buy", &region.buy),
        ];

        let mut offers = Vec::new();
        for (monetization, providers) in groups {
            let Some(offer_type) = normalize_offer_type(monetization) else {
                continue;
            };

            for provider in providers {
                offers.push(StreamingOffer::new(
                    normalize_service_name(&provider.provider_name),
                    offer_type,
                    link.clone(),
                ));
            }
        }
        offers
    }

    fn convert_response(&self, region: &str, response: TmdbWatchProviders) -> Vec<StreamingOffer> {
        response
            .results
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(region))
            .map(|(_, providers)| self.convert_region(providers))
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl StreamingProvider for TmdbProvider {
    async fn fetch_availability(
        &self,
        query: &MovieQuery,
    ) -> Result<Vec<StreamingOffer>, AdapterError> {
        let external_id = require_external_id(query)?;
        let region = query.region_code();

        let url = format!("{}/3/movie/{}/watch/providers", self.api_url, external_id);
        let mut request = self.http_client.get(&url);
        request = if self.uses_bearer_token() {
            request.bearer_auth(&self.api_key)
        } else {
            request.query(&[("api_key", self.api_key.as_str())])
        };

        let response = check_status(self.kind(), request.send().await?).await?;
        let providers: TmdbWatchProviders = decode_json(self.kind(), response).await?;
        let offers = self.convert_response(&region, providers);

        tracing::info!(
            external_id,
            region = %region,
            offers = offers.len(),
            provider = "tmdb",
            "Availability fetched"
        );

        Ok(offers)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Tmdb
    }
}
