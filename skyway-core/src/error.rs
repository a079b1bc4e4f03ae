use crate::model::SeatClass;
use crate::reference::ReferenceKind;

/// Every failure the booking core and the catalog can report.
///
/// `NotFound`, `InvalidState` and `Unauthorized` are terminal for the caller.
/// `CapacityExceeded` is kept apart from `Conflict` so a client can decide to
/// retry against fresh availability.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Insufficient capacity: requested {requested}, available {available}")]
    CapacityExceeded { requested: i32, available: i32 },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictKind {
    #[error("could not issue a unique {0}")]
    Reference(ReferenceKind),

    #[error("seat {0} is already taken on this flight")]
    SeatTaken(String),

    #[error("no {0} seat left to assign")]
    NoSeatAvailable(SeatClass),

    #[error("duplicate value for {0}")]
    Duplicate(String),
}

impl BookingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code, exposed to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::NotFound { .. } => "NOT_FOUND",
            BookingError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            BookingError::InvalidState(_) => "INVALID_STATE",
            BookingError::Unauthorized(_) => "UNAUTHORIZED",
            BookingError::Conflict(_) => "CONFLICT",
            BookingError::Validation(_) => "VALIDATION",
            BookingError::Storage(_) => "STORAGE",
        }
    }
}

pub type CoreResult<T> = Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_and_conflict_have_distinct_codes() {
        let capacity = BookingError::CapacityExceeded {
            requested: 2,
            available: 1,
        };
        let conflict = BookingError::Conflict(ConflictKind::SeatTaken("1A".into()));
        assert_ne!(capacity.code(), conflict.code());
        assert_eq!(
            capacity.to_string(),
            "Insufficient capacity: requested 2, available 1"
        );
    }
}
