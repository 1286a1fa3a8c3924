/// Watchmode API provider
///
/// Watchmode accepts TMDB IDs as `movie-{id}` anywhere a title ID is expected,
/// so availability is a single call to /v1/title/movie-{id}/sources/.
///
/// Unknown titles come back either as a 404 or as a 200 carrying an error
/// object (`{"success": false, "statusCode": 404}`); both map to `NotFound`.
use reqwest::Client as HttpClient;
use serde_json::Value;

use crate::{
    error::AdapterError,
    models::{
        provider_types::WatchmodeSource, MovieQuery, Price, ProviderKind, StreamingOffer,
    },
    services::{
        normalizer::{normalize_offer_type, normalize_service_name},
        providers::{check_status, decode_json, require_external_id, StreamingProvider},
    },
};

pub const DEFAULT_WATCHMODE_API_URL: &str = "https://api.watchmode.com";

#[derive(Clone)]
pub struct WatchmodeProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

/// Watchmode prices carry no currency; infer it from the region for the common cases
fn currency_for_region(region: &str) -> Option<&'static str> {
    match region {
        "US" => Some("USD"),
        "CA" => Some("CAD"),
        "GB" => Some("GBP"),
        "AU" => Some("AUD"),
        "NZ" => Some("NZD"),
        "IN" => Some("INR"),
        "BR" => Some("BRL"),
        "DE" | "FR" | "ES" | "IT" | "NL" | "IE" | "AT" | "BE" | "FI" | "PT" => Some("EUR"),
        _ => None,
    }
}

impl WatchmodeProvider {
    pub fn new(http_client: HttpClient, api_key: String, api_url: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn convert_source(&self, region: &str, source: WatchmodeSource) -> Option<StreamingOffer> {
        if let Some(source_region) = &source.region {
            if !source_region.eq_ignore_ascii_case(region) {
                return None;
            }
        }

        let Some(offer_type) = normalize_offer_type(&source.source_type) else {
            tracing::debug!(
                watchmode_service_id = source.source_id,
                service_name = %source.name,
                source_type = %source.source_type,
                "Skipping unknown Watchmode source type"
            );
            return None;
        };

        let price = source
            .price
            .zip(currency_for_region(region))
            .map(|(amount, currency)| Price {
                amount,
                currency: currency.to_string(),
            });

        Some(StreamingOffer {
            service: normalize_service_name(&source.name),
            offer_type,
            url: source.web_url.unwrap_or_default(),
            quality: source.format,
            price,
        })
    }

    fn convert_response(&self, region: &str, body: Value) -> Result<Vec<StreamingOffer>, AdapterError> {
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let status = body.get("statusCode").and_then(Value::as_u64);
            return match status {
                Some(404) => Err(AdapterError::NotFound),
                Some(429) => Err(AdapterError::RateLimited(super::DEFAULT_RETRY_AFTER_SECS)),
                _ => Err(AdapterError::Transient(format!(
                    "Watchmode returned error payload: {}",
                    body
                ))),
            };
        }

        let sources: Vec<WatchmodeSource> = serde_json::from_value(body).map_err(|e| {
            AdapterError::Malformed(format!("Failed to parse Watchmode response: {}", e))
        })?;

        Ok(sources
            .into_iter()
            .filter_map(|source| self.convert_source(region, source))
            .collect())
    }
}

#[async_trait::async_trait]
impl StreamingProvider for WatchmodeProvider {
    async fn fetch_availability(
        &self,
        query: &MovieQuery,
    ) -> Result<Vec<StreamingOffer>, AdapterError> {
        let external_id = require_external_id(query)?;
        let region = query.region_code();

        let url = format!("{}/v1/title/movie-{}/sources/", self.api_url, external_id);
        let response = self
            .http_client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str()), ("regions", region.as_str())])
            .send()
            .await?;

        let response = check_status(self.kind(), response).await?;
        let body: Value = decode_json(self.kind(), response).await?;
        let offers = self.convert_response(&region, body)?;

        tracing::info!(
            external_id,
            region = %region,
            offers = offers.len(),
            provider = "watchmode",
            "Availability fetched"
        );

        Ok(offers)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Watchmode
    }
}
