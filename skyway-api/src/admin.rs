use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use skyway_booking::{BookingView, TicketSummary};
use skyway_catalog::{
    AircraftInput, AirportInput, FlightInput, MaintenanceInput, PricingInput, SeatInput,
};
use skyway_core::model::{
    Aircraft, AircraftMaintenance, Airport, Flight, FlightPricing, FlightStatus, ParseEnumError,
    Seat,
};
use skyway_core::Caller;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FlightStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteMaintenanceRequest {
    pub cost: Option<Decimal>,
}

type Created<T> = (StatusCode, Json<T>);

pub fn routes() -> Router<AppState> {
    Router::new()
        // Airports
        .route("/v1/admin/airports", get(list_airports).post(create_airport))
        .route(
            "/v1/admin/airports/{id}",
            get(get_airport).put(update_airport).delete(delete_airport),
        )
        // Aircraft and seat maps
        .route("/v1/admin/aircraft", get(list_aircraft).post(create_aircraft))
        .route(
            "/v1/admin/aircraft/{id}",
            get(get_aircraft).put(update_aircraft).delete(delete_aircraft),
        )
        .route("/v1/admin/aircraft/{id}/seats", get(list_seats).post(create_seat))
        .route("/v1/admin/aircraft/{id}/seats/generate", post(generate_seats))
        .route("/v1/admin/aircraft/{id}/maintenance", get(list_maintenance))
        .route("/v1/admin/seats/{id}", put(update_seat).delete(delete_seat))
        // Flights
        .route("/v1/admin/flights", get(list_flights).post(create_flight))
        .route("/v1/admin/flights/{id}", put(update_flight).delete(delete_flight))
        .route("/v1/admin/flights/{id}/status", put(update_flight_status))
        .route("/v1/admin/flights/{id}/pricing", get(list_pricing))
        .route("/v1/admin/flights/{id}/bookings", get(list_flight_bookings))
        // Pricing
        .route("/v1/admin/pricing", get(list_all_pricing).post(create_pricing))
        .route("/v1/admin/pricing/{id}/deactivate", post(deactivate_pricing))
        // Maintenance
        .route(
            "/v1/admin/maintenance",
            get(list_all_maintenance).post(start_maintenance),
        )
        .route("/v1/admin/maintenance/{id}/complete", post(complete_maintenance))
        // Tickets
        .route("/v1/admin/tickets/{id}/assign-seat", post(assign_seat))
}

// ============================================================================
// Airports
// ============================================================================

async fn list_airports(State(state): State<AppState>) -> Result<Json<Vec<Airport>>, AppError> {
    Ok(Json(state.catalog.list_airports().await?))
}

async fn create_airport(
    State(state): State<AppState>,
    Json(input): Json<AirportInput>,
) -> Result<Created<Airport>, AppError> {
    let airport = state.catalog.create_airport(input).await?;
    Ok((StatusCode::CREATED, Json(airport)))
}

async fn get_airport(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Airport>, AppError> {
    Ok(Json(state.catalog.get_airport(id).await?))
}

async fn update_airport(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<AirportInput>,
) -> Result<Json<Airport>, AppError> {
    Ok(Json(state.catalog.update_airport(id, input).await?))
}

async fn delete_airport(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_airport(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Aircraft
// ============================================================================

async fn list_aircraft(State(state): State<AppState>) -> Result<Json<Vec<Aircraft>>, AppError> {
    Ok(Json(state.catalog.list_aircraft().await?))
}

async fn create_aircraft(
    State(state): State<AppState>,
    Json(input): Json<AircraftInput>,
) -> Result<Created<Aircraft>, AppError> {
    let aircraft = state.catalog.create_aircraft(input).await?;
    Ok((StatusCode::CREATED, Json(aircraft)))
}

async fn get_aircraft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Aircraft>, AppError> {
    Ok(Json(state.catalog.get_aircraft(id).await?))
}

async fn update_aircraft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<AircraftInput>,
) -> Result<Json<Aircraft>, AppError> {
    Ok(Json(state.catalog.update_aircraft(id, input).await?))
}

async fn delete_aircraft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_aircraft(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Seat>>, AppError> {
    Ok(Json(state.catalog.list_seats(id).await?))
}

async fn create_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<SeatInput>,
) -> Result<Created<Seat>, AppError> {
    let seat = state.catalog.create_seat(id, input).await?;
    Ok((StatusCode::CREATED, Json(seat)))
}

async fn generate_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Created<Vec<Seat>>, AppError> {
    let seats = state.catalog.generate_seats(id).await?;
    Ok((StatusCode::CREATED, Json(seats)))
}

async fn update_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<SeatInput>,
) -> Result<Json<Seat>, AppError> {
    Ok(Json(state.catalog.update_seat(id, input).await?))
}

async fn delete_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_seat(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Flights & Pricing
// ============================================================================

async fn list_flights(State(state): State<AppState>) -> Result<Json<Vec<Flight>>, AppError> {
    Ok(Json(state.catalog.list_flights().await?))
}

async fn create_flight(
    State(state): State<AppState>,
    Json(input): Json<FlightInput>,
) -> Result<Created<Flight>, AppError> {
    let flight = state.catalog.create_flight(input).await?;
    Ok((StatusCode::CREATED, Json(flight)))
}

async fn update_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<FlightInput>,
) -> Result<Json<Flight>, AppError> {
    let flight = state.catalog.update_flight(id, input).await?;
    // an aircraft swap re-derives the counters
    state.invalidate_availability(id).await;
    Ok(Json(flight))
}

async fn delete_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_flight(id).await?;
    state.invalidate_availability(id).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_flight_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FlightStatusRequest>,
) -> Result<Json<Flight>, AppError> {
    let status: FlightStatus = req
        .status
        .parse()
        .map_err(|e: ParseEnumError| AppError::Domain(e.into()))?;
    Ok(Json(state.catalog.update_flight_status(id, status).await?))
}

async fn list_pricing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<FlightPricing>>, AppError> {
    state.catalog.get_flight(id).await?;
    Ok(Json(state.catalog.list_pricing(id).await?))
}

async fn list_all_pricing(
    State(state): State<AppState>,
) -> Result<Json<Vec<FlightPricing>>, AppError> {
    Ok(Json(state.catalog.list_all_pricing().await?))
}

async fn create_pricing(
    State(state): State<AppState>,
    Json(input): Json<PricingInput>,
) -> Result<Created<FlightPricing>, AppError> {
    let pricing = state.catalog.create_pricing(input).await?;
    Ok((StatusCode::CREATED, Json(pricing)))
}

async fn deactivate_pricing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightPricing>, AppError> {
    Ok(Json(state.catalog.deactivate_pricing(id).await?))
}

async fn list_flight_bookings(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let views = state
        .bookings
        .list_bookings_for_flight(id, &caller.grant())
        .await?;
    Ok(Json(views))
}

// ============================================================================
// Maintenance
// ============================================================================

async fn list_maintenance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AircraftMaintenance>>, AppError> {
    Ok(Json(state.catalog.list_maintenance(id).await?))
}

async fn list_all_maintenance(
    State(state): State<AppState>,
) -> Result<Json<Vec<AircraftMaintenance>>, AppError> {
    Ok(Json(state.catalog.list_all_maintenance().await?))
}

async fn start_maintenance(
    State(state): State<AppState>,
    Json(input): Json<MaintenanceInput>,
) -> Result<Created<AircraftMaintenance>, AppError> {
    let record = state.catalog.start_maintenance(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn complete_maintenance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<CompleteMaintenanceRequest>>,
) -> Result<Json<AircraftMaintenance>, AppError> {
    let cost = body.and_then(|Json(req)| req.cost);
    Ok(Json(state.catalog.complete_maintenance(id, cost).await?))
}

// ============================================================================
// Tickets
// ============================================================================

async fn assign_seat(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketSummary>, AppError> {
    let ticket = state.bookings.auto_assign_seat(id, &caller.grant()).await?;
    Ok(Json(ticket))
}
