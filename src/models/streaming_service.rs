use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::services::normalizer::normalize_service_name;

/// Canonical streaming service, independent of any provider's vocabulary
///
/// Serialized as its slug (e.g. `"netflix"`, `"disney_plus"`). Deserialization goes
/// through the normalizer, so any alias a provider uses is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum CanonicalService {
    Netflix,
    AmazonPrime,
    Hulu,
    DisneyPlus,
    Max,
    AppleTvPlus,
    /// Apple's store (rent/buy), formerly iTunes
    AppleTv,
    Peacock,
    ParamountPlus,
    Starz,
    Showtime,
    AmcPlus,
    Mubi,
    Crunchyroll,
    Tubi,
    PlutoTv,
    /// Formerly Vudu
    FandangoAtHome,
    GooglePlay,
    YouTube,
    /// Service not in the alias table; holds the trimmed, lowercased raw name
    Other(String),
}

impl CanonicalService {
    /// Slug for this service. Feeding it back through the normalizer yields `self`.
    pub fn as_str(&self) -> &str {
        match self {
            CanonicalService::Netflix => "netflix",
            CanonicalService::AmazonPrime => "amazon_prime",
            CanonicalService::Hulu => "hulu",
            CanonicalService::DisneyPlus => "disney_plus",
            CanonicalService::Max => "max",
            CanonicalService::AppleTvPlus => "apple_tv_plus",
            CanonicalService::AppleTv => "apple_tv",
            CanonicalService::Peacock => "peacock",
            CanonicalService::ParamountPlus => "paramount_plus",
            CanonicalService::Starz => "starz",
            CanonicalService::Showtime => "showtime",
            CanonicalService::AmcPlus => "amc_plus",
            CanonicalService::Mubi => "mubi",
            CanonicalService::Crunchyroll => "crunchyroll",
            CanonicalService::Tubi => "tubi",
            CanonicalService::PlutoTv => "pluto_tv",
            CanonicalService::FandangoAtHome => "fandango_at_home",
            CanonicalService::GooglePlay => "google_play",
            CanonicalService::YouTube => "youtube",
            CanonicalService::Other(raw) => raw,
        }
    }
}

impl Display for CanonicalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<CanonicalService> for String {
    fn from(service: CanonicalService) -> Self {
        service.as_str().to_string()
    }
}

impl From<String> for CanonicalService {
    fn from(raw: String) -> Self {
        normalize_service_name(&raw)
    }
}

/// How a title is offered on a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferType {
    Subscription,
    Rent,
    Buy,
    Free,
}

impl Display for OfferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OfferType::Subscription => "subscription",
            OfferType::Rent => "rent",
            OfferType::Buy => "buy",
            OfferType::Free => "free",
        };
        write!(f, "{}", s)
    }
}
