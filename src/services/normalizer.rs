/// Provider vocabulary normalization
///
/// Every adapter funnels service names and offer types through these functions so
/// offers from different providers can be compared and deduplicated.
use crate::models::{CanonicalService, OfferType};

/// Maps a raw provider service name to its canonical service
///
/// Matching is case-insensitive and ignores surrounding whitespace. Unknown names
/// become `CanonicalService::Other` holding the trimmed, lowercased input, so new
/// services pass through instead of being dropped. The slug of every canonical
/// service is itself an alias, which makes `normalize(normalize(x).as_str())`
/// equal to `normalize(x)`.
pub fn normalize_service_name(raw: &str) -> CanonicalService {
    let key = raw.trim().to_lowercase();
    lookup_alias(&key).unwrap_or(CanonicalService::Other(key))
}

fn lookup_alias(key: &str) -> Option<CanonicalService> {
    let service = match key {
        "netflix" | "netflix basic with ads" | "netflix standard with ads" | "netflix kids" => {
            CanonicalService::Netflix
        }
        "amazon_prime"
        | "amazon prime"
        | "amazon prime video"
        | "amazon prime video with ads"
        | "prime video"
        | "prime"
        | "amazon video"
        | "amazon instant video"
        | "amazon" => CanonicalService::AmazonPrime,
        "hulu" => CanonicalService::Hulu,
        "disney_plus" | "disney+" | "disney plus" | "disney" => CanonicalService::DisneyPlus,
        "max" | "hbo max" | "hbomax" | "hbo" | "max amazon channel" => CanonicalService::Max,
        "apple_tv_plus" | "apple tv+" | "apple tv plus" | "appletvplus" => {
            CanonicalService::AppleTvPlus
        }
        "apple_tv" | "apple tv" | "apple tv store" | "apple itunes" | "itunes" | "apple" => {
            CanonicalService::AppleTv
        }
        "peacock" | "peacock premium" | "peacock premium plus" => CanonicalService::Peacock,
        "paramount_plus" | "paramount+" | "paramount plus" | "paramount+ with showtime"
        | "paramount" => CanonicalService::ParamountPlus,
        "starz" => CanonicalService::Starz,
        "showtime" => CanonicalService::Showtime,
        "amc_plus" | "amc+" | "amc plus" => CanonicalService::AmcPlus,
        "mubi" => CanonicalService::Mubi,
        "crunchyroll" => CanonicalService::Crunchyroll,
        "tubi" | "tubi tv" => CanonicalService::Tubi,
        "pluto_tv" | "pluto tv" | "pluto" => CanonicalService::PlutoTv,
        "fandango_at_home" | "fandango at home" | "vudu" | "fandangonow" => {
            CanonicalService::FandangoAtHome
        }
        "google_play" | "google play" | "google play movies" | "google play movies & tv" => {
            CanonicalService::GooglePlay
        }
        "youtube" | "youtube premium" | "youtube movies" => CanonicalService::YouTube,
        _ => return None,
    };
    Some(service)
}

/// Maps a raw provider offer type to the canonical offer type
///
/// Add-on channels count as subscriptions and ad-supported tiers count as free.
/// Returns `None` for vocabulary we don't understand; adapters drop those entries.
pub fn normalize_offer_type(raw: &str) -> Option<OfferType> {
    match raw.trim().to_lowercase().as_str() {
        "subscription" | "sub" | "flatrate" | "addon" | "tve" => Some(OfferType::Subscription),
        "rent" | "rental" => Some(OfferType::Rent),
        "buy" | "purchase" => Some(OfferType::Buy),
        "free" | "ads" => Some(OfferType::Free),
        _ => None,
    }
}
