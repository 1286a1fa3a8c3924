use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::ResolveError;

pub mod provider_types;
pub mod streaming_service;

pub use streaming_service::{CanonicalService, OfferType};

/// Availability lookup for a single movie in a single region
///
/// `external_id` is the TMDB movie ID, which every ID-lookup provider accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieQuery {
    pub external_id: i64,
    pub title: Option<String>,
    pub release_year: Option<i32>,
    /// ISO-3166 alpha-2 country code
    pub region: String,
}

impl MovieQuery {
    pub fn new(external_id: i64, region: impl Into<String>) -> Self {
        Self {
            external_id,
            title: None,
            release_year: None,
            region: region.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_release_year(mut self, year: i32) -> Self {
        self.release_year = Some(year);
        self
    }

    /// Checks the query is usable by the resolver
    pub fn validate(&self) -> Result<(), ResolveError> {
        if self.external_id <= 0 {
            return Err(ResolveError::InvalidQuery(format!(
                "external_id must be positive, got {}",
                self.external_id
            )));
        }

        let region = self.region.trim();
        if region.len() != 2 || !region.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ResolveError::InvalidQuery(format!(
                "region must be an ISO-3166 alpha-2 code, got {:?}",
                self.region
            )));
        }

        Ok(())
    }

    /// Upper-case region code, used for cache keys and provider requests
    pub fn region_code(&self) -> String {
        self.region.trim().to_ascii_uppercase()
    }

    /// Title with surrounding whitespace removed; blank titles count as absent
    pub fn search_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Upstream data source, listed here in the default priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// TMDB watch providers (primary catalog)
    Tmdb,
    /// RapidAPI Streaming Availability (aggregator)
    StreamingAvailability,
    /// Watchmode sources (aggregator)
    Watchmode,
    /// Utelly title lookup (fallback)
    Utelly,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Tmdb,
        ProviderKind::StreamingAvailability,
        ProviderKind::Watchmode,
        ProviderKind::Utelly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Tmdb => "tmdb",
            ProviderKind::StreamingAvailability => "streaming_availability",
            ProviderKind::Watchmode => "watchmode",
            ProviderKind::Utelly => "utelly",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exact decimal price; `amount` serializes as a string such as "3.99"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount: Decimal,
    pub currency: String,
}

/// One way to watch a title on one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingOffer {
    pub service: CanonicalService,
    pub offer_type: OfferType,
    pub url: String,
    pub quality: Option<String>,
    pub price: Option<Price>,
}

impl StreamingOffer {
    pub fn new(service: CanonicalService, offer_type: OfferType, url: impl Into<String>) -> Self {
        Self {
            service,
            offer_type,
            url: url.into(),
            quality: None,
            price: None,
        }
    }
}

/// Unified availability for a query, as returned by the resolver
///
/// Records are never mutated after being returned; a refresh produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub query: MovieQuery,
    /// Unique by `(service, offer_type)`, in provider priority order
    pub offers: Vec<StreamingOffer>,
    /// Highest-priority provider that contributed an offer; `None` when `offers` is empty
    pub source_provider: Option<ProviderKind>,
    pub fetched_at: DateTime<Utc>,
    pub is_stale: bool,
}

impl AvailabilityRecord {
    /// Record for a query with no known availability
    pub fn empty(query: MovieQuery, fetched_at: DateTime<Utc>) -> Self {
        Self {
            query,
            offers: Vec::new(),
            source_provider: None,
            fetched_at,
            is_stale: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_valid_query() {
        let query = MovieQuery::new(603, "us").with_title("The Matrix");
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_id() {
        assert!(matches!(
            MovieQuery::new(0, "US").validate(),
            Err(ResolveError::InvalidQuery(_))
        ));
        assert!(matches!(
            MovieQuery::new(-42, "US").validate(),
            Err(ResolveError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_region() {
        for region in ["", "USA", "U1", "  "] {
            assert!(
                MovieQuery::new(603, region).validate().is_err(),
                "region {:?} should be rejected",
                region
            );
        }
    }

    #[test]
    fn test_region_code_is_uppercased() {
        assert_eq!(MovieQuery::new(603, " gb ").region_code(), "GB");
    }

    #[test]
    fn test_blank_title_is_absent() {
        let query = MovieQuery::new(603, "US").with_title("   ");
        assert_eq!(query.search_title(), None);

        let query = MovieQuery::new(603, "US").with_title(" The Matrix ");
        assert_eq!(query.search_title(), Some("The Matrix"));
    }

    #[test]
    fn test_provider_kind_serde() {
        let json = serde_json::to_string(&ProviderKind::StreamingAvailability).unwrap();
        assert_eq!(json, r#""streaming_availability""#);

        let kind: ProviderKind = serde_json::from_str(r#""tmdb""#).unwrap();
        assert_eq!(kind, ProviderKind::Tmdb);
    }

    #[test]
    fn test_price_amount_is_exact() {
        let price = Price {
            amount: Decimal::new(379, 2),
            currency: "USD".to_string(),
        };

        let json = serde_json::to_value(&price).unwrap();
        assert_eq!(json["amount"], "3.79");

        let parsed: Price = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, price);
        assert_eq!(parsed.amount.to_string(), "3.79");
    }

    #[test]
    fn test_empty_record_has_no_source() {
        let record = AvailabilityRecord::empty(MovieQuery::new(603, "US"), Utc::now());
        assert!(record.offers.is_empty());
        assert_eq!(record.source_provider, None);
        assert!(!record.is_stale);
    }
}
