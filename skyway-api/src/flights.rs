use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use skyway_catalog::FlightDetails;
use skyway_core::model::Airport;
use skyway_store::Availability;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub from: String,
    pub to: String,
    pub date: NaiveDate,
}

/// Public, unauthenticated reads.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/search", get(search_flights))
        .route("/v1/flights/{id}", get(get_flight))
        .route("/v1/flights/{id}/availability", get(get_availability))
        .route("/v1/airports", get(list_airports))
        .route("/v1/airports/{id}", get(get_airport))
}

async fn list_airports(State(state): State<AppState>) -> Result<Json<Vec<Airport>>, AppError> {
    Ok(Json(state.catalog.list_active_airports().await?))
}

async fn get_airport(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Airport>, AppError> {
    Ok(Json(state.catalog.get_active_airport(id).await?))
}

async fn search_flights(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<FlightDetails>>, AppError> {
    let flights = state
        .catalog
        .search_flights(&query.from, &query.to, query.date)
        .await?;
    Ok(Json(flights))
}

async fn get_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightDetails>, AppError> {
    Ok(Json(state.catalog.flight_details(id).await?))
}

async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Availability>, AppError> {
    if let Some(hit) = state.cached_availability(id).await {
        return Ok(Json(hit));
    }
    // version first: a commit landing after it makes the seed a no-op
    let version = state.availability_version(id).await;
    let flight = state.catalog.get_flight(id).await?;
    let availability = Availability::from(&flight);
    if let Some(version) = version {
        state.seed_availability(id, availability, version).await;
    }
    Ok(Json(availability))
}
