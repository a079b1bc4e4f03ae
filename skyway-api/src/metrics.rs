use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::AppError;
use crate::state::AppState;

pub struct Metrics {
    registry: Registry,
    pub bookings_confirmed: IntCounter,
    pub bookings_cancelled: IntCounter,
    /// Labelled by error code, so oversell pressure shows up as CAPACITY_EXCEEDED.
    pub bookings_rejected: IntCounterVec,
    pub http_requests: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("skyway".to_string()), None)?;

        let bookings_confirmed =
            IntCounter::new("bookings_confirmed_total", "Bookings committed")?;
        let bookings_cancelled =
            IntCounter::new("bookings_cancelled_total", "Bookings cancelled")?;
        let bookings_rejected = IntCounterVec::new(
            Opts::new("bookings_rejected_total", "Booking requests that failed"),
            &["code"],
        )?;
        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests served"),
            &["method", "status"],
        )?;

        registry.register(Box::new(bookings_confirmed.clone()))?;
        registry.register(Box::new(bookings_cancelled.clone()))?;
        registry.register(Box::new(bookings_rejected.clone()))?;
        registry.register(Box::new(http_requests.clone()))?;

        Ok(Self {
            registry,
            bookings_confirmed,
            bookings_cancelled,
            bookings_rejected,
            http_requests,
        })
    }

    pub fn reject(&self, err: &AppError) {
        self.bookings_rejected.with_label_values(&[err.code()]).inc();
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::Anyhow(e.into()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let response = next.run(req).await;
    state
        .metrics
        .http_requests
        .with_label_values(&[method.as_str(), response.status().as_str()])
        .inc();
    response
}
