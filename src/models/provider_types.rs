use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::str::FromStr;

// ============================================================================
// TMDB API Types
// ============================================================================

/// API response from GET /3/movie/{id}/watch/providers
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbWatchProviders {
    #[serde(default)]
    pub results: HashMap<String, TmdbRegionProviders>,
}

/// Watch providers for one region, grouped by monetization type
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbRegionProviders {
    /// TMDB's watch page for the region; TMDB has no per-provider deep links
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<TmdbProvider>,
    #[serde(default)]
    pub rent: Vec<TmdbProvider>,
    #[serde(default)]
    pub buy: Vec<TmdbProvider>,
    #[serde(default)]
    pub free: Vec<TmdbProvider>,
    #[serde(default)]
    pub ads: Vec<TmdbProvider>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbProvider {
    pub provider_id: u64,
    pub provider_name: String,
    #[serde(default)]
    pub display_priority: Option<u32>,
}

// ============================================================================
// Streaming Availability API Types
// ============================================================================

/// API response from GET /shows/movie/{tmdb_id}
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiShowDetails {
    #[serde(default)]
    pub imdb_id: Option<String>,
    /// Keyed by lowercase country code
    #[serde(default)]
    pub streaming_options: HashMap<String, Vec<ApiStreamingOption>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStreamingOption {
    pub service: ApiService,
    #[serde(rename = "type")]
    pub availability_type: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub price: Option<ApiPrice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiService {
    pub id: String,
    pub name: String,
}

/// Price as reported by the API; `amount` is a decimal string (e.g. "3.99")
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPrice {
    pub amount: String,
    pub currency: String,
}

// ============================================================================
// Watchmode API Types
// ============================================================================

/// Watchmode streaming source from GET /v1/title/{id}/sources/
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeSource {
    pub source_id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<Decimal>,
}

/// Watchmode reports prices as numbers, but occasionally as strings or null
///
/// Numbers are read back from their JSON text so `3.99` stays exactly 3.99.
fn lenient_price<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => parse_decimal(&n.to_string()),
        Some(serde_json::Value::String(s)) => parse_decimal(&s),
        _ => None,
    })
}

/// Parses plain ("3.99") or scientific ("1e2") decimal text
pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

// ============================================================================
// Utelly API Types
// ============================================================================

/// API response from GET /lookup
#[derive(Debug, Clone, Deserialize)]
pub struct UtellyLookupResponse {
    #[serde(default)]
    pub results: Vec<UtellyResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UtellyResult {
    pub name: String,
    #[serde(default)]
    pub locations: Vec<UtellyLocation>,
    #[serde(default)]
    pub external_ids: UtellyExternalIds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UtellyLocation {
    pub display_name: String,
    /// Internal name such as "NetflixIVAUS"
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UtellyExternalIds {
    #[serde(default)]
    pub tmdb: Option<UtellyExternalId>,
    #[serde(default)]
    pub imdb: Option<UtellyExternalId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UtellyExternalId {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmdb_watch_providers_deserialization() {
        let json = r#"{
            "id": 603,
            "results": {
                "US": {
                    "link": "https://www.themoviedb.org/movie/603-the-matrix/watch?locale=US",
                    "flatrate": [
                        {"logo_path": "/a.jpg", "provider_id": 8, "provider_name": "Netflix", "display_priority": 0}
                    ],
                    "rent": [
                        {"logo_path": "/b.jpg", "provider_id": 2, "provider_name": "Apple TV", "display_priority": 4}
                    ]
                }
            }
        }"#;

        let parsed: TmdbWatchProviders = serde_json::from_str(json).unwrap();
        let us = parsed.results.get("US").unwrap();
        assert_eq!(us.flatrate.len(), 1);
        assert_eq!(us.flatrate[0].provider_name, "Netflix");
        assert_eq!(us.rent[0].provider_id, 2);
        assert!(us.buy.is_empty());
    }

    #[test]
    fn test_api_show_details_deserialization() {
        let json = r#"{
            "itemType": "show",
            "showType": "movie",
            "imdbId": "tt0133093",
            "tmdbId": "movie/603",
            "streamingOptions": {
                "us": [
                    {
                        "service": {"id": "prime", "name": "Prime Video"},
                        "type": "rent",
                        "link": "https://www.amazon.com/gp/video/detail/B000I9U972",
                        "quality": "hd",
                        "price": {"amount": "3.79", "currency": "USD", "formatted": "3.79 USD"}
                    }
                ]
            }
        }"#;

        let parsed: ApiShowDetails = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.imdb_id, Some("tt0133093".to_string()));
        let options = parsed.streaming_options.get("us").unwrap();
        assert_eq!(options[0].availability_type, "rent");
        assert_eq!(options[0].price.as_ref().unwrap().amount, "3.79");
    }

    #[test]
    fn test_watchmode_source_deserialization() {
        let json = r#"{
            "source_id": 203,
            "name": "Netflix",
            "type": "sub",
            "region": "US",
            "format": "4K",
            "price": null,
            "web_url": "https://www.netflix.com/title/20557937"
        }"#;

        let source: WatchmodeSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.source_id, 203);
        assert_eq!(source.source_type, "sub");
        assert_eq!(source.price, None);
        assert_eq!(source.region, Some("US".to_string()));
    }

    #[test]
    fn test_watchmode_price_accepts_string() {
        let json = r#"{"source_id": 24, "name": "Amazon", "type": "rent", "price": "3.99"}"#;
        let source: WatchmodeSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.price, Some(Decimal::new(399, 2)));
    }

    #[test]
    fn test_watchmode_numeric_price_is_exact() {
        let json = r#"{"source_id": 24, "name": "Amazon", "type": "rent", "price": 3.99}"#;
        let source: WatchmodeSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.price.unwrap().to_string(), "3.99");

        let json = r#"{"source_id": 24, "name": "Amazon", "type": "rent", "price": "n/a"}"#;
        let source: WatchmodeSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.price, None);
    }

    #[test]
    fn test_utelly_lookup_deserialization() {
        let json = r#"{
            "results": [
                {
                    "id": "5d914028302b840050acbe62",
                    "name": "The Matrix",
                    "locations": [
                        {"display_name": "Netflix", "name": "NetflixIVAUS", "url": "https://www.netflix.com/title/20557937"}
                    ],
                    "external_ids": {
                        "tmdb": {"url": "https://www.themoviedb.org/movie/603", "id": "603"},
                        "imdb": {"url": "https://www.imdb.com/title/tt0133093", "id": "tt0133093"}
                    }
                }
            ],
            "term": "the matrix",
            "status_code": 200
        }"#;

        let parsed: UtellyLookupResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].external_ids.tmdb.as_ref().unwrap().id, "603");
        assert_eq!(parsed.results[0].locations[0].display_name, "Netflix");
    }
}
