use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::{AvailabilityRecord, MovieQuery, ProviderKind},
    services::{rate_limiter::ProviderBudgetSnapshot, ResolveOptions},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    #[serde(default = "default_region")]
    pub region: String,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub force_refresh: Option<bool>,
    pub max_providers: Option<usize>,
    pub stop_on_subscription: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RegionParams {
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    "US".to_string()
}

impl AvailabilityParams {
    fn query(&self, external_id: i64) -> MovieQuery {
        let mut query = MovieQuery::new(external_id, self.region.clone());
        if let Some(title) = &self.title {
            query = query.with_title(title.clone());
        }
        if let Some(year) = self.year {
            query = query.with_release_year(year);
        }
        query
    }

    fn options(&self, defaults: ResolveOptions) -> ResolveOptions {
        ResolveOptions {
            force_refresh: self.force_refresh.unwrap_or(defaults.force_refresh),
            max_providers: self.max_providers.unwrap_or(defaults.max_providers),
            stop_on_subscription: self
                .stop_on_subscription
                .unwrap_or(defaults.stop_on_subscription),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BudgetsResponse {
    pub providers: Vec<ProviderKind>,
    pub budgets: Vec<ProviderBudgetSnapshot>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Resolve availability for a movie by TMDB ID
pub async fn get_availability(
    State(state): State<AppState>,
    Path(external_id): Path<i64>,
    Query(params): Query<AvailabilityParams>,
) -> AppResult<Json<AvailabilityRecord>> {
    let query = params.query(external_id);
    let options = params.options(state.default_options);

    let record = state.resolver.resolve(&query, &options).await?;
    Ok(Json(record))
}

/// Drop the cached record for a movie and region
pub async fn invalidate_availability(
    State(state): State<AppState>,
    Path(external_id): Path<i64>,
    Query(params): Query<RegionParams>,
) -> AppResult<StatusCode> {
    let query = MovieQuery::new(external_id, params.region);
    state.resolver.invalidate(&query).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current rate-limit budgets of the configured providers
pub async fn provider_budgets(State(state): State<AppState>) -> Json<BudgetsResponse> {
    let budgets = state.resolver.rate_limiter().snapshot().await;
    Json(BudgetsResponse {
        providers: state.resolver.provider_kinds(),
        budgets,
    })
}
