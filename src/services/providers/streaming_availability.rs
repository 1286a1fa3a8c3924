/// Streaming Availability API provider (via RapidAPI)
///
/// Accepts TMDB IDs directly in the `movie/{id}` form, so a single request per
/// lookup is enough. Options are keyed by lowercase country code.
use reqwest::Client as HttpClient;

use crate::{
    error::AdapterError,
    models::{
        provider_types::{parse_decimal, ApiShowDetails, ApiStreamingOption},
        MovieQuery, Price, ProviderKind, StreamingOffer,
    },
    services::{
        normalizer::{normalize_offer_type, normalize_service_name},
        providers::{
            check_status, decode_json, rapidapi_host, require_external_id, StreamingProvider,
        },
    },
};

pub const DEFAULT_STREAMING_API_URL: &str = "https://streaming-availability.p.rapidapi.com";

#[derive(Clone)]
pub struct StreamingAvailabilityProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl StreamingAvailabilityProvider {
    pub fn new(http_client: HttpClient, api_key: String, api_url: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn convert_option(&self, option: &ApiStreamingOption) -> Option<StreamingOffer> {
        let Some(offer_type) = normalize_offer_type(&option.availability_type) else {
            tracing::debug!(
                availability_type = %option.availability_type,
                service = %option.service.name,
                "Skipping unknown availability type"
            );
            return None;
        };

        let price = option.price.as_ref().and_then(|p| {
            parse_decimal(&p.amount).map(|amount| Price {
                amount,
                currency: p.currency.clone(),
            })
        });

        Some(StreamingOffer {
            service: normalize_service_name(&option.service.name),
            offer_type,
            url: option.link.clone().unwrap_or_default(),
            quality: option.quality.clone(),
            price,
        })
    }

    fn convert_api_response(&self, region: &str, details: ApiShowDetails) -> Vec<StreamingOffer> {
        details
            .streaming_options
            .get(&region.to_ascii_lowercase())
            .map(|options| {
                options
                    .iter()
                    .filter_map(|option| self.convert_option(option))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl StreamingProvider for StreamingAvailabilityProvider {
    async fn fetch_availability(
        &self,
        query: &MovieQuery,
    ) -> Result<Vec<StreamingOffer>, AdapterError> {
        let external_id = require_external_id(query)?;
        let country = query.region_code().to_ascii_lowercase();

        let url = format!("{}/shows/movie/{}", self.api_url, external_id);
        let mut request = self
            .http_client
            .get(&url)
            .header("X-RapidAPI-Key", &self.api_key)
            .query(&[("country", country.as_str())]);
        if let Some(host) = rapidapi_host(&self.api_url) {
            request = request.header("X-RapidAPI-Host", host);
        }

        let response = check_status(self.kind(), request.send().await?).await?;
        let show_details: ApiShowDetails = decode_json(self.kind(), response).await?;
        let offers = self.convert_api_response(&country, show_details);

        tracing::info!(
            external_id,
            region = %country,
            offers = offers.len(),
            provider = "streaming_availability",
            "Availability fetched"
        );

        Ok(offers)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::StreamingAvailability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        provider_types::{ApiPrice, ApiService},
        CanonicalService, OfferType,
    };
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_provider(api_url: &str) -> StreamingAvailabilityProvider {
        StreamingAvailabilityProvider::new(
            reqwest::Client::new(),
            "test_key".to_string(),
            api_url.to_string(),
        )
    }

    fn option(id: &str, name: &str, kind: &str) -> ApiStreamingOption {
        ApiStreamingOption {
            service: ApiService {
                id: id.to_string(),
                name: name.to_string(),
            },
            availability_type: kind.to_string(),
            quality: Some("hd".to_string()),
            link: Some(format!("https://{}.example/title/603", id)),
            price: None,
        }
    }

    #[test]
    fn test_convert_api_response_success() {
        let provider = create_test_provider("http://test.local");

        let mut streaming_options = HashMap::new();
        streaming_options.insert(
            "us".to_string(),
            vec![ApiStreamingOption {
                price: Some(ApiPrice {
                    amount: "3.79".to_string(),
                    currency: "USD".to_string(),
                }),
                ..option("prime", "Prime Video", "rent")
            }],
        );

        let details = ApiShowDetails {
            imdb_id: Some("tt0133093".to_string()),
            streaming_options,
        };

        let offers = provider.convert_api_response("us", details);

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].service, CanonicalService::AmazonPrime);
        assert_eq!(offers[0].offer_type, OfferType::Rent);
        assert_eq!(offers[0].quality, Some("hd".to_string()));
        assert_eq!(
            offers[0].price,
            Some(Price {
                amount: Decimal::new(379, 2),
                currency: "USD".to_string()
            })
        );
    }

    #[test]
    fn test_convert_api_response_filters_availability_types() {
        let provider = create_test_provider("http://test.local");

        let mut streaming_options = HashMap::new();
        streaming_options.insert(
            "us".to_string(),
            vec![
                option("netflix", "Netflix", "subscription"),
                option("apple", "Apple TV", "buy"),
                option("hbo", "Max", "addon"),
                option("cinema", "Cinema", "theatrical"),
            ],
        );

        let details = ApiShowDetails {
            imdb_id: None,
            streaming_options,
        };

        let offers = provider.convert_api_response("us", details);

        assert_eq!(offers.len(), 3);
        assert_eq!(offers[0].offer_type, OfferType::Subscription);
        assert_eq!(offers[1].offer_type, OfferType::Buy);
        assert_eq!(offers[2].service, CanonicalService::Max);
        assert_eq!(offers[2].offer_type, OfferType::Subscription);
    }

    #[test]
    fn test_unparseable_price_is_dropped() {
        let provider = create_test_provider("http://test.local");
        let offer = provider
            .convert_option(&ApiStreamingOption {
                price: Some(ApiPrice {
                    amount: "n/a".to_string(),
                    currency: "USD".to_string(),
                }),
                ..option("apple", "Apple TV", "buy")
            })
            .unwrap();

        assert_eq!(offer.price, None);
    }

    #[tokio::test]
    async fn test_fetch_availability_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shows/movie/603"))
            .and(query_param("country", "us"))
            .and(header("X-RapidAPI-Key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "itemType": "show",
                "showType": "movie",
                "imdbId": "tt0133093",
                "tmdbId": "movie/603",
                "streamingOptions": {
                    "us": [
                        {
                            "service": {"id": "netflix", "name": "Netflix"},
                            "type": "subscription",
                            "link": "https://www.netflix.com/title/20557937",
                            "quality": "uhd"
                        }
                    ],
                    "ca": [
                        {
                            "service": {"id": "crave", "name": "Crave"},
                            "type": "subscription",
                            "link": "https://www.crave.ca/movie/the-matrix"
                        }
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = create_test_provider(&server.uri());
        let offers = provider
            .fetch_availability(&MovieQuery::new(603, "US"))
            .await
            .unwrap();

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].service, CanonicalService::Netflix);
        assert_eq!(offers[0].url, "https://www.netflix.com/title/20557937");
    }

    #[tokio::test]
    async fn test_fetch_availability_rate_limited_uses_rapidapi_reset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("x-ratelimit-requests-reset", "17"),
            )
            .mount(&server)
            .await;

        let provider = create_test_provider(&server.uri());
        let result = provider.fetch_availability(&MovieQuery::new(603, "US")).await;

        assert_eq!(result, Err(AdapterError::RateLimited(17)));
    }

    #[tokio::test]
    async fn test_fetch_availability_unauthorized_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let provider = create_test_provider(&server.uri());
        let result = provider.fetch_availability(&MovieQuery::new(603, "US")).await;

        assert!(matches!(result, Err(AdapterError::Transient(_))));
    }
}
