/// Utelly lookup provider (via RapidAPI), the fallback of last resort
///
/// Utelly only supports searching by title, so the query must carry one. Results
/// are matched back to the movie by TMDB ID when Utelly reports it, otherwise by
/// exact (case-insensitive) name. Lookup results carry no release year, so a name
/// match only counts when it is unique among results without a conflicting TMDB ID.
use reqwest::Client as HttpClient;

use crate::{
    error::AdapterError,
    models::{
        provider_types::{UtellyLookupResponse, UtellyResult},
        CanonicalService, MovieQuery, OfferType, ProviderKind, StreamingOffer,
    },
    services::{
        normalizer::normalize_service_name,
        providers::{check_status, decode_json, rapidapi_host, StreamingProvider},
    },
};

pub const DEFAULT_UTELLY_API_URL: &str =
    "https://utelly-tv-shows-and-movies-availability-v1.p.rapidapi.com";

#[derive(Clone)]
pub struct UtellyProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

/// Utelly locations carry no offer type; infer it from the kind of service
fn infer_offer_type(service: &CanonicalService) -> OfferType {
    match service {
        CanonicalService::AppleTv
        | CanonicalService::GooglePlay
        | CanonicalService::FandangoAtHome
        | CanonicalService::YouTube => OfferType::Buy,
        CanonicalService::Tubi | CanonicalService::PlutoTv => OfferType::Free,
        _ => OfferType::Subscription,
    }
}

impl UtellyProvider {
    pub fn new(http_client: HttpClient, api_key: String, api_url: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn select_result<'a>(
        &self,
        query: &MovieQuery,
        title: &str,
        results: &'a [UtellyResult],
    ) -> Option<&'a UtellyResult> {
        let external_id = query.external_id.to_string();

        if let Some(exact) = results.iter().find(|r| {
            r.external_ids
                .tmdb
                .as_ref()
                .is_some_and(|tmdb| tmdb.id.trim() == external_id)
        }) {
            return Some(exact);
        }

        // A result reporting another TMDB ID is a different film with the same name
        let mut candidates = results.iter().filter(|r| {
            r.external_ids.tmdb.is_none() && r.name.trim().eq_ignore_ascii_case(title)
        });
        let first = candidates.next()?;
        if candidates.next().is_some() {
            tracing::debug!(title = %title, "Ambiguous Utelly name match, skipping");
            return None;
        }
        Some(first)
    }

    fn convert_result(&self, result: &UtellyResult) -> Vec<StreamingOffer> {
        result
            .locations
            .iter()
            .map(|location| {
                let service = normalize_service_name(&location.display_name);
                let offer_type = infer_offer_type(&service);
                StreamingOffer::new(service, offer_type, location.url.clone().unwrap_or_default())
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl StreamingProvider for UtellyProvider {
    async fn fetch_availability(
        &self,
        query: &MovieQuery,
    ) -> Result<Vec<StreamingOffer>, AdapterError> {
        let Some(title) = query.search_title() else {
            return Err(AdapterError::Unsupported(
                "Utelly lookup requires a title".to_string(),
            ));
        };
        let country = query.region_code().to_ascii_lowercase();

        let url = format!("{}/lookup", self.api_url);
        let mut request = self
            .http_client
            .get(&url)
            .header("X-RapidAPI-Key", &self.api_key)
            .query(&[("term", title), ("country", country.as_str())]);
        if let Some(host) = rapidapi_host(&self.api_url) {
            request = request.header("X-RapidAPI-Host", host);
        }

        let response = check_status(self.kind(), request.send().await?).await?;
        let lookup: UtellyLookupResponse = decode_json(self.kind(), response).await?;

        let Some(result) = self.select_result(query, title, &lookup.results) else {
            tracing::debug!(
                title = %title,
                candidates = lookup.results.len(),
                "No Utelly result matched the query"
            );
            return Err(AdapterError::NotFound);
        };
        let offers = self.convert_result(result);

        tracing::info!(
            external_id = query.external_id,
            region = %country,
            offers = offers.len(),
            provider = "utelly",
            "Availability fetched"
        );

        Ok(offers)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Utelly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_provider(api_url: &str) -> UtellyProvider {
        UtellyProvider::new(
            reqwest::Client::new(),
            "test_key".to_string(),
            api_url.to_string(),
        )
    }

    fn lookup_body() -> serde_json::Value {
        json!({
            "results": [
                {
                    "id": "a",
                    "name": "The Matrix Reloaded",
                    "locations": [
                        {"display_name": "Max", "name": "HBOMaxIVAUS", "url": "https://play.max.com/reloaded"}
                    ],
                    "external_ids": {"tmdb": {"url": "https://www.themoviedb.org/movie/604", "id": "604"}}
                },
                {
                    "id": "b",
                    "name": "The Matrix",
                    "locations": [
                        {"display_name": "Netflix", "name": "NetflixIVAUS", "url": "https://www.netflix.com/title/20557937"},
                        {"display_name": "iTunes", "name": "iTunesIVAUS", "url": "https://itunes.apple.com/us/movie/the-matrix/id271469518"}
                    ],
                    "external_ids": {"tmdb": {"url": "https://www.themoviedb.org/movie/603", "id": "603"}}
                }
            ],
            "term": "the matrix",
            "status_code": 200
        })
    }

    #[test]
    fn test_infer_offer_type() {
        assert_eq!(infer_offer_type(&CanonicalService::Netflix), OfferType::Subscription);
        assert_eq!(infer_offer_type(&CanonicalService::AppleTv), OfferType::Buy);
        assert_eq!(infer_offer_type(&CanonicalService::Tubi), OfferType::Free);
    }

    #[test]
    fn test_select_result_prefers_tmdb_id_then_name() {
        let provider = create_test_provider("http://test.local");
        let lookup: UtellyLookupResponse = serde_json::from_value(lookup_body()).unwrap();

        let query = MovieQuery::new(603, "US").with_title("matrix");
        let selected = provider.select_result(&query, "matrix", &lookup.results).unwrap();
        assert_eq!(selected.name, "The Matrix");

        // Same name but Utelly reports a different TMDB film
        let query = MovieQuery::new(1, "US").with_title("the matrix reloaded");
        assert!(provider
            .select_result(&query, "the matrix reloaded", &lookup.results)
            .is_none());

        let query = MovieQuery::new(1, "US").with_title("Inception");
        assert!(provider.select_result(&query, "Inception", &lookup.results).is_none());
    }

    fn dune_body(first_tmdb_id: Option<&str>) -> serde_json::Value {
        let first_ids = match first_tmdb_id {
            Some(id) => json!({"tmdb": {"id": id}}),
            None => json!({}),
        };
        json!({
            "results": [
                {
                    "name": "Dune",
                    "locations": [
                        {"display_name": "Peacock", "url": "https://www.peacocktv.com/watch/dune-1984"}
                    ],
                    "external_ids": first_ids
                },
                {
                    "name": "Dune",
                    "locations": [
                        {"display_name": "Max", "url": "https://play.max.com/dune-2021"}
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_same_name_results_without_ids_are_ambiguous() {
        let provider = create_test_provider("http://test.local");
        let lookup: UtellyLookupResponse = serde_json::from_value(dune_body(None)).unwrap();
        let query = MovieQuery::new(438631, "US")
            .with_title("Dune")
            .with_release_year(2021);

        assert!(provider.select_result(&query, "Dune", &lookup.results).is_none());
    }

    #[test]
    fn test_same_name_result_with_other_tmdb_id_is_skipped() {
        let provider = create_test_provider("http://test.local");
        let lookup: UtellyLookupResponse =
            serde_json::from_value(dune_body(Some("841"))).unwrap();
        let query = MovieQuery::new(438631, "US")
            .with_title("Dune")
            .with_release_year(2021);

        let selected = provider.select_result(&query, "Dune", &lookup.results).unwrap();
        assert_eq!(
            selected.locations[0].url.as_deref(),
            Some("https://play.max.com/dune-2021")
        );
    }

    #[tokio::test]
    async fn test_fetch_availability_ambiguous_remake_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lookup"))
            .and(query_param("term", "Dune"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dune_body(None)))
            .expect(1)
            .mount(&server)
            .await;

        let provider = create_test_provider(&server.uri());
        let query = MovieQuery::new(438631, "US")
            .with_title("Dune")
            .with_release_year(2021);

        assert_eq!(
            provider.fetch_availability(&query).await,
            Err(AdapterError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_fetch_availability_requires_title() {
        let provider = create_test_provider("http://test.local");
        let result = provider.fetch_availability(&MovieQuery::new(603, "US")).await;

        assert!(matches!(result, Err(AdapterError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_fetch_availability_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lookup"))
            .and(query_param("term", "The Matrix"))
            .and(query_param("country", "us"))
            .and(header("X-RapidAPI-Key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(lookup_body()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = create_test_provider(&server.uri());
        let query = MovieQuery::new(603, "US").with_title("The Matrix");
        let offers = provider.fetch_availability(&query).await.unwrap();

        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].service, CanonicalService::Netflix);
        assert_eq!(offers[0].offer_type, OfferType::Subscription);
        assert_eq!(offers[1].service, CanonicalService::AppleTv);
        assert_eq!(offers[1].offer_type, OfferType::Buy);
    }

    #[tokio::test]
    async fn test_fetch_availability_no_match_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let provider = create_test_provider(&server.uri());
        let query = MovieQuery::new(603, "US").with_title("The Matrix");

        assert_eq!(
            provider.fetch_availability(&query).await,
            Err(AdapterError::NotFound)
        );
    }
}
