//! # Request Handlers
//!
//! One handler per tour route. Handlers only translate between HTTP and
//! [`TourService`]; every rule lives in the service.

use axum::extract::{OriginalUri, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use super::errors::{ApiError, ApiResult};
use super::extract::{ApiJson, ApiQuery};
use super::response::Envelope;
use super::server::AppState;
use crate::query::QueryString;

/// Forced by the top-5-cheap alias
pub const TOP_TOURS_LIMIT: &str = "5";
pub const TOP_TOURS_SORT: &str = "-ratingsAverage,price";
pub const TOP_TOURS_FIELDS: &str = "name,price,ratingsAverage,summary,difficulty";

/// Overrides `limit`, `sort` and `fields` for the top-5-cheap listing.
pub fn alias_top_tours(query: QueryString) -> QueryString {
    query
        .with("limit", TOP_TOURS_LIMIT)
        .with("sort", TOP_TOURS_SORT)
        .with("fields", TOP_TOURS_FIELDS)
}

/// GET /api/v1/tours
pub async fn list_tours(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery,
) -> ApiResult<Envelope<Value>> {
    let tours = state.tours.list(&query)?;
    Ok(Envelope::list("tours", tours))
}

/// GET /api/v1/tours/top-5-cheap
pub async fn top_tours(state: State<AppState>, ApiQuery(query): ApiQuery) -> ApiResult<Envelope<Value>> {
    list_tours(state, ApiQuery(alias_top_tours(query))).await
}

/// GET /api/v1/tours/tour-stats
pub async fn tour_stats(State(state): State<AppState>) -> ApiResult<Envelope<Value>> {
    let stats = state.tours.stats()?;
    Ok(Envelope::named("stats", stats))
}

/// GET /api/v1/tours/monthly-plan/{year}
pub async fn monthly_plan(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let plan = state.tours.monthly_plan(&year)?;
    let total = plan.len();
    Ok(Envelope::named("plan", plan).with_total(total))
}

/// GET /api/v1/tours/{id}
pub async fn get_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Value>> {
    let tour = state.tours.get(&id)?;
    Ok(Envelope::named("tour", tour))
}

/// POST /api/v1/tours
pub async fn create_tour(
    State(state): State<AppState>,
    ApiJson(body): ApiJson,
) -> ApiResult<(StatusCode, Envelope<Value>)> {
    let tour = state.tours.create(&body)?;
    Ok((StatusCode::CREATED, Envelope::named("tour", tour)))
}

/// PATCH /api/v1/tours/{id}
pub async fn update_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson,
) -> ApiResult<Envelope<Value>> {
    let tour = state.tours.update(&id, &patch)?;
    Ok(Envelope::named("tour", tour))
}

/// DELETE /api/v1/tours/{id}
pub async fn delete_tour(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.tours.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Anything no route or static file answered
pub async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::not_found(format!("Can't find {} on this server", uri))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_overrides_caller_values() {
        let query = QueryString::parse("limit=50&sort=name&difficulty=easy").unwrap();
        let aliased = alias_top_tours(query);

        assert_eq!(aliased.scalar("limit").unwrap(), "5");
        assert_eq!(aliased.scalar("sort").unwrap(), TOP_TOURS_SORT);
        assert_eq!(aliased.scalar("fields").unwrap(), TOP_TOURS_FIELDS);
        assert_eq!(aliased.scalar("difficulty").unwrap(), "easy");
    }
}
