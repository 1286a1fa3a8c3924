/// Streaming data provider abstraction
///
/// Every availability source (TMDB, Streaming Availability API, Watchmode, Utelly)
/// implements the same contract, so the resolver can walk them uniformly. Only
/// request building and response parsing differ per provider.
use reqwest::{header::HeaderMap, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    error::AdapterError,
    models::{MovieQuery, ProviderKind, StreamingOffer},
};

pub mod streaming_availability;
pub mod tmdb;
pub mod utelly;
pub mod watchmode;

pub use streaming_availability::StreamingAvailabilityProvider;
pub use tmdb::TmdbProvider;
pub use utelly::UtellyProvider;
pub use watchmode::WatchmodeProvider;

/// Used when a 429 carries no usable hint
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Trait for streaming availability providers
///
/// Implementations make exactly one outbound request per call and never retry;
/// retries and rate limiting belong to the resolver.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait StreamingProvider: Send + Sync {
    /// Fetch normalized offers for the query's movie and region
    ///
    /// `NotFound` means the provider has no data for the title, which callers
    /// treat as an empty result rather than a failure.
    async fn fetch_availability(
        &self,
        query: &MovieQuery,
    ) -> Result<Vec<StreamingOffer>, AdapterError>;

    /// Provider identity for rate limiting and logging
    fn kind(&self) -> ProviderKind;
}

/// Builds the HTTP client shared by all providers
pub fn build_http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(client)
}

/// ID-lookup providers cannot do anything with a non-positive ID
pub(crate) fn require_external_id(query: &MovieQuery) -> Result<i64, AdapterError> {
    if query.external_id <= 0 {
        return Err(AdapterError::Unsupported(format!(
            "external_id must be positive, got {}",
            query.external_id
        )));
    }
    Ok(query.external_id)
}

/// Maps non-success statuses to adapter errors
pub(crate) async fn check_status(
    provider: ProviderKind,
    response: Response,
) -> Result<Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(AdapterError::NotFound),
        StatusCode::TOO_MANY_REQUESTS => {
            Err(AdapterError::RateLimited(retry_after_seconds(response.headers())))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = %provider,
                status = %status,
                body = %body,
                "Provider request failed"
            );
            Err(AdapterError::Transient(format!(
                "{} returned status {}: {}",
                provider, status, body
            )))
        }
    }
}

/// Reads the body and decodes it, mapping bad payloads to `Malformed`
pub(crate) async fn decode_json<T: DeserializeOwned>(
    provider: ProviderKind,
    response: Response,
) -> Result<T, AdapterError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            provider = %provider,
            error = %e,
            response = %text,
            "Failed to deserialize provider response"
        );
        AdapterError::Malformed(format!("Failed to parse {} response: {}", provider, e))
    })
}

/// Seconds to wait according to `Retry-After` or RapidAPI's reset header
pub(crate) fn retry_after_seconds(headers: &HeaderMap) -> u64 {
    ["retry-after", "x-ratelimit-requests-reset"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Host for the `X-RapidAPI-Host` header, taken from the configured base URL
pub(crate) fn rapidapi_host(api_url: &str) -> Option<String> {
    reqwest::Url::parse(api_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("120"));
        assert_eq!(retry_after_seconds(&headers), 120);
    }

    #[test]
    fn test_rapidapi_reset_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-requests-reset", HeaderValue::from_static("42"));
        assert_eq!(retry_after_seconds(&headers), 42);
    }

    #[test]
    fn test_retry_after_http_date_falls_back_to_default() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after_seconds(&headers), DEFAULT_RETRY_AFTER_SECS);
        assert_eq!(retry_after_seconds(&HeaderMap::new()), DEFAULT_RETRY_AFTER_SECS);
    }

    #[test]
    fn test_rapidapi_host() {
        assert_eq!(
            rapidapi_host("https://streaming-availability.p.rapidapi.com"),
            Some("streaming-availability.p.rapidapi.com".to_string())
        );
        assert_eq!(rapidapi_host("not a url"), None);
    }
}
