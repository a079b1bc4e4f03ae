use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub flight_id: Uuid,
    pub user_id: String,
    pub passenger_count: i32,
    pub total_amount: Decimal,
    pub available_seats: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub flight_id: Uuid,
    pub released_seats: i32,
    pub available_seats: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatAssignedEvent {
    pub ticket_id: Uuid,
    pub flight_id: Uuid,
    pub seat_number: String,
    pub timestamp: i64,
}

/// Envelope used by publishers: topic, partition key and JSON payload.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    BookingConfirmed(BookingConfirmedEvent),
    BookingCancelled(BookingCancelledEvent),
    SeatAssigned(SeatAssignedEvent),
}

impl DomainEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::BookingConfirmed(_) => "booking.confirmed",
            DomainEvent::BookingCancelled(_) => "booking.cancelled",
            DomainEvent::SeatAssigned(_) => "ticket.seat_assigned",
        }
    }

    /// Events for the same flight share a key so they stay ordered per partition.
    pub fn key(&self) -> String {
        match self {
            DomainEvent::BookingConfirmed(e) => e.flight_id.to_string(),
            DomainEvent::BookingCancelled(e) => e.flight_id.to_string(),
            DomainEvent::SeatAssigned(e) => e.flight_id.to_string(),
        }
    }

    pub fn payload(&self) -> Result<String, serde_json::Error> {
        match self {
            DomainEvent::BookingConfirmed(e) => serde_json::to_string(e),
            DomainEvent::BookingCancelled(e) => serde_json::to_string(e),
            DomainEvent::SeatAssigned(e) => serde_json::to_string(e),
        }
    }
}
