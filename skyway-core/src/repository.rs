use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::access::Grant;
use crate::error::CoreResult;
use crate::model::{
    Aircraft, AircraftMaintenance, Airport, BookingRecord, Flight, FlightPricing, FlightStatus,
    Seat, SeatDemand, Ticket,
};
use crate::reference::ReferenceLookup;

/// Admin-managed reference data.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_airport(&self, airport: &Airport) -> CoreResult<()>;
    async fn get_airport(&self, id: Uuid) -> CoreResult<Option<Airport>>;
    async fn get_airport_by_code(&self, code: &str) -> CoreResult<Option<Airport>>;
    async fn list_airports(&self) -> CoreResult<Vec<Airport>>;
    async fn update_airport(&self, airport: &Airport) -> CoreResult<()>;
    async fn delete_airport(&self, id: Uuid) -> CoreResult<()>;

    async fn create_aircraft(&self, aircraft: &Aircraft) -> CoreResult<()>;
    async fn get_aircraft(&self, id: Uuid) -> CoreResult<Option<Aircraft>>;
    async fn list_aircraft(&self) -> CoreResult<Vec<Aircraft>>;
    /// Cabin sizes are frozen while any flight uses the aircraft, since the
    /// flights' seat counters were derived from them.
    async fn update_aircraft(&self, aircraft: &Aircraft) -> CoreResult<()>;
    async fn delete_aircraft(&self, id: Uuid) -> CoreResult<()>;

    /// Inserts all seats or none.
    async fn create_seats(&self, seats: &[Seat]) -> CoreResult<()>;
    async fn get_seat(&self, id: Uuid) -> CoreResult<Option<Seat>>;
    async fn list_seats(&self, aircraft_id: Uuid) -> CoreResult<Vec<Seat>>;
    async fn update_seat(&self, seat: &Seat) -> CoreResult<()>;
    async fn delete_seat(&self, id: Uuid) -> CoreResult<()>;

    async fn create_pricing(&self, pricing: &FlightPricing) -> CoreResult<()>;
    async fn list_pricing(&self, flight_id: Uuid) -> CoreResult<Vec<FlightPricing>>;
    async fn list_all_pricing(&self) -> CoreResult<Vec<FlightPricing>>;
    /// The only mutation a pricing record ever sees.
    async fn deactivate_pricing(&self, id: Uuid) -> CoreResult<FlightPricing>;

    /// Records the maintenance and flags the aircraft in one unit.
    async fn start_maintenance(&self, record: &AircraftMaintenance) -> CoreResult<()>;
    async fn list_maintenance(&self, aircraft_id: Uuid) -> CoreResult<Vec<AircraftMaintenance>>;
    async fn list_all_maintenance(&self) -> CoreResult<Vec<AircraftMaintenance>>;
    /// Closes the record and clears the aircraft flag in one unit.
    async fn complete_maintenance(
        &self,
        id: Uuid,
        end_date: DateTime<Utc>,
        cost: Option<Decimal>,
    ) -> CoreResult<AircraftMaintenance>;
}

#[async_trait]
pub trait FlightRepository: Send + Sync {
    /// Refused when the counters no longer fit the aircraft as stored.
    async fn create_flight(&self, flight: &Flight) -> CoreResult<()>;
    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<Flight>>;
    async fn list_flights(&self) -> CoreResult<Vec<Flight>>;
    /// Rewrites number, route, aircraft and times under the flight's lock.
    /// Status is left alone; counters follow `Flight::reassign`.
    async fn update_flight(&self, flight: &Flight) -> CoreResult<Flight>;
    async fn update_flight_status(&self, id: Uuid, status: FlightStatus) -> CoreResult<Flight>;
    /// Refused while any booking references the flight.
    async fn delete_flight(&self, id: Uuid) -> CoreResult<()>;
    /// Non-cancelled flights departing on `date` (UTC), ordered by departure.
    async fn search_flights(
        &self,
        departure_airport_id: Uuid,
        arrival_airport_id: Uuid,
        date: NaiveDate,
    ) -> CoreResult<Vec<Flight>>;
}

/// Outcome of a committed cancellation.
#[derive(Debug, Clone)]
pub struct Cancellation {
    pub record: BookingRecord,
    pub flight: Flight,
    pub released: SeatDemand,
}

/// Outcome of a committed seat assignment.
#[derive(Debug, Clone)]
pub struct SeatAssignment {
    pub ticket: Ticket,
    pub flight_id: Uuid,
}

/// Booking persistence. Every write here is one atomic unit that runs under
/// the flight's exclusive lock; implementations must re-check capacity and
/// state inside that lock, not trust what the caller saw earlier.
#[async_trait]
pub trait BookingStore: ReferenceLookup {
    /// Reserves the record's seats on its flight and persists the booking with
    /// its tickets, baggage and payments. Returns the flight as updated.
    async fn commit_booking(&self, record: &BookingRecord) -> CoreResult<Flight>;

    /// Cancels the booking if `grant` permits it and it is not already
    /// cancelled, releasing its seats.
    async fn commit_cancellation(&self, booking_id: Uuid, grant: &Grant) -> CoreResult<Cancellation>;

    /// Gives an unseated active ticket the first free seat of its class.
    async fn assign_seat(&self, ticket_id: Uuid) -> CoreResult<SeatAssignment>;

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<BookingRecord>>;
    async fn list_bookings_for_user(&self, user_id: &str) -> CoreResult<Vec<BookingRecord>>;
    async fn list_bookings_for_flight(&self, flight_id: Uuid) -> CoreResult<Vec<BookingRecord>>;
}
