/// Raised when a stored or submitted status string is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl From<ParseEnumError> for crate::BookingError {
    fn from(err: ParseEnumError) -> Self {
        crate::BookingError::Validation(err.to_string())
    }
}

/// Status enums are persisted as their SCREAMING_SNAKE_CASE names.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::model::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::model::ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use string_enum;

pub mod catalog;
pub mod flight;
pub mod booking;

pub use catalog::{
    Aircraft, AircraftMaintenance, Airport, FlightPricing, MaintenanceStatus, MaintenanceType,
    Seat, SeatClass, DEFAULT_FREE_BAGGAGE_KG,
};
pub use flight::{Flight, FlightStatus, SeatDemand};
pub use booking::{
    Baggage, BaggageStatus, BaggageType, Booking, BookingRecord, BookingStatus, Payment,
    PaymentMethod, PaymentStatus, Ticket, TicketRecord, TicketStatus,
};
