use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use skyway_booking::{BookingView, CancellationReceipt, CreateBookingRequest};
use skyway_core::Caller;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/mine", get(list_my_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    let flight_id = req.flight_id;
    match state.bookings.create_booking(&caller.grant(), req).await {
        Ok(view) => {
            state.metrics.bookings_confirmed.inc();
            state.invalidate_availability(flight_id).await;
            info!(user = %caller.user_id, reference = %view.booking_reference, "Booking created via API");
            Ok((StatusCode::CREATED, Json(view)))
        }
        Err(e) => {
            let err = AppError::from(e);
            state.metrics.reject(&err);
            Err(err)
        }
    }
}

async fn list_my_bookings(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let views = state.bookings.list_bookings_for_user(&caller.grant()).await?;
    Ok(Json(views))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    let view = state.bookings.get_booking(id, &caller.grant()).await?;
    Ok(Json(view))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancellationReceipt>, AppError> {
    let receipt = state.bookings.cancel_booking(id, &caller.grant()).await?;
    state.metrics.bookings_cancelled.inc();
    state.invalidate_availability(receipt.flight_id).await;
    Ok(Json(receipt))
}
