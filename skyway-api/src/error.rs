use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skyway_core::BookingError;

#[derive(Debug)]
pub enum AppError {
    /// Missing, malformed or expired bearer token.
    AuthenticationError(String),
    AuthorizationError(String),
    Domain(BookingError),
    Anyhow(anyhow::Error),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::AuthenticationError(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AppError::AuthorizationError(_) => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
            AppError::Domain(err) => {
                let status = match err {
                    BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
                    BookingError::CapacityExceeded { .. } => StatusCode::CONFLICT,
                    BookingError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    BookingError::Unauthorized(_) => StatusCode::FORBIDDEN,
                    BookingError::Conflict(_) => StatusCode::CONFLICT,
                    BookingError::Validation(_) => StatusCode::BAD_REQUEST,
                    BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code())
            }
            AppError::Anyhow(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }

    /// Machine-readable code, also used as a metrics label.
    pub fn code(&self) -> &'static str {
        self.status_and_code().1
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error_message = match self {
            AppError::AuthenticationError(msg) | AppError::AuthorizationError(msg) => msg,
            AppError::Domain(BookingError::Storage(msg)) => {
                tracing::error!("Storage failure: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::Domain(err) => err.to_string(),
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                "Internal Server Error".to_string()
            }
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        Self::Domain(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyway_core::ConflictKind;

    #[test]
    fn capacity_and_seat_conflicts_share_status_but_not_code() {
        let capacity = AppError::from(BookingError::CapacityExceeded {
            requested: 3,
            available: 1,
        });
        let seat = AppError::from(BookingError::Conflict(ConflictKind::SeatTaken("4C".into())));

        assert_eq!(capacity.status_and_code().0, StatusCode::CONFLICT);
        assert_eq!(seat.status_and_code().0, StatusCode::CONFLICT);
        assert_ne!(capacity.code(), seat.code());
    }

    #[test]
    fn invalid_state_is_unprocessable() {
        let err = AppError::from(BookingError::InvalidState("already cancelled".into()));
        assert_eq!(err.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
