use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use skyway_core::model::{
    Aircraft, AircraftMaintenance, Airport, BookingRecord, BookingStatus, Flight, FlightPricing,
    FlightStatus, MaintenanceStatus, Seat, TicketStatus,
};
use skyway_core::reference::{ReferenceKind, ReferenceLookup};
use skyway_core::repository::{
    BookingStore, CatalogRepository, Cancellation, FlightRepository, SeatAssignment,
};
use skyway_core::{BookingError, ConflictKind, CoreResult, Grant};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    airports: HashMap<Uuid, Airport>,
    aircraft: HashMap<Uuid, Aircraft>,
    seats: HashMap<Uuid, Seat>,
    pricing: HashMap<Uuid, FlightPricing>,
    maintenance: HashMap<Uuid, AircraftMaintenance>,
    flights: HashMap<Uuid, Flight>,
    bookings: HashMap<Uuid, BookingRecord>,
}

impl State {
    fn seats_of(&self, aircraft_id: Uuid) -> Vec<Seat> {
        self.seats
            .values()
            .filter(|s| s.aircraft_id == aircraft_id)
            .cloned()
            .collect()
    }

    fn occupied_seats(&self, flight_id: Uuid) -> HashSet<String> {
        self.bookings
            .values()
            .filter(|r| r.booking.flight_id == flight_id)
            .flat_map(|r| r.tickets.iter())
            .filter(|t| t.ticket.status == TicketStatus::Active)
            .filter_map(|t| t.ticket.seat_number.clone())
            .collect()
    }

    fn reference_taken(&self, kind: ReferenceKind, value: &str) -> bool {
        let records = self.bookings.values();
        match kind {
            ReferenceKind::BookingReference => records
                .into_iter()
                .any(|r| r.booking.reference == value),
            ReferenceKind::TicketNumber => records
                .flat_map(|r| r.tickets.iter())
                .any(|t| t.ticket.ticket_number == value),
            ReferenceKind::BaggageTag => records
                .flat_map(|r| r.baggage())
                .any(|b| b.baggage_tag == value),
            ReferenceKind::TransactionId => records
                .flat_map(|r| r.payments.iter())
                .any(|p| p.transaction_id == value),
        }
    }

    /// Mirrors the unique constraints of the Postgres schema.
    fn check_unique_references(&self, record: &BookingRecord) -> CoreResult<()> {
        let mut values = vec![(ReferenceKind::BookingReference, record.booking.reference.as_str())];
        for t in &record.tickets {
            values.push((ReferenceKind::TicketNumber, t.ticket.ticket_number.as_str()));
            for bag in &t.baggage {
                values.push((ReferenceKind::BaggageTag, bag.baggage_tag.as_str()));
            }
        }
        for p in &record.payments {
            values.push((ReferenceKind::TransactionId, p.transaction_id.as_str()));
        }
        let mut seen = HashSet::new();
        for (kind, value) in values {
            if !seen.insert((kind, value)) || self.reference_taken(kind, value) {
                return Err(BookingError::Conflict(ConflictKind::Reference(kind)));
            }
        }
        Ok(())
    }

    fn aircraft_for(&self, flight: &Flight) -> CoreResult<Aircraft> {
        self.aircraft
            .get(&flight.aircraft_id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("aircraft", flight.aircraft_id))
    }
}

/// Process-local store implementing every repository trait.
///
/// One mutex guards all state, so each operation is trivially atomic and
/// serialized; this is the in-memory counterpart of the per-flight row lock.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate(what: impl Into<String>) -> BookingError {
    BookingError::Conflict(ConflictKind::Duplicate(what.into()))
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn create_airport(&self, airport: &Airport) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state.airports.values().any(|a| a.code == airport.code) {
            return Err(duplicate(format!("airport code {}", airport.code)));
        }
        state.airports.insert(airport.id, airport.clone());
        Ok(())
    }

    async fn get_airport(&self, id: Uuid) -> CoreResult<Option<Airport>> {
        Ok(self.state.lock().await.airports.get(&id).cloned())
    }

    async fn get_airport_by_code(&self, code: &str) -> CoreResult<Option<Airport>> {
        let state = self.state.lock().await;
        Ok(state.airports.values().find(|a| a.code == code).cloned())
    }

    async fn list_airports(&self) -> CoreResult<Vec<Airport>> {
        let mut airports: Vec<Airport> = self.state.lock().await.airports.values().cloned().collect();
        airports.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(airports)
    }

    async fn update_airport(&self, airport: &Airport) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state
            .airports
            .values()
            .any(|a| a.code == airport.code && a.id != airport.id)
        {
            return Err(duplicate(format!("airport code {}", airport.code)));
        }
        let slot = state
            .airports
            .get_mut(&airport.id)
            .ok_or_else(|| BookingError::not_found("airport", airport.id))?;
        *slot = airport.clone();
        Ok(())
    }

    async fn delete_airport(&self, id: Uuid) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state
            .flights
            .values()
            .any(|f| f.departure_airport_id == id || f.arrival_airport_id == id)
        {
            return Err(BookingError::InvalidState(
                "airport is still used by flights".to_string(),
            ));
        }
        state
            .airports
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BookingError::not_found("airport", id))
    }

    async fn create_aircraft(&self, aircraft: &Aircraft) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state
            .aircraft
            .values()
            .any(|a| a.registration_number == aircraft.registration_number)
        {
            return Err(duplicate(format!(
                "registration {}",
                aircraft.registration_number
            )));
        }
        state.aircraft.insert(aircraft.id, aircraft.clone());
        Ok(())
    }

    async fn get_aircraft(&self, id: Uuid) -> CoreResult<Option<Aircraft>> {
        Ok(self.state.lock().await.aircraft.get(&id).cloned())
    }

    async fn list_aircraft(&self) -> CoreResult<Vec<Aircraft>> {
        let mut aircraft: Vec<Aircraft> = self.state.lock().await.aircraft.values().cloned().collect();
        aircraft.sort_by(|a, b| a.registration_number.cmp(&b.registration_number));
        Ok(aircraft)
    }

    async fn update_aircraft(&self, aircraft: &Aircraft) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let current = state
            .aircraft
            .get(&aircraft.id)
            .ok_or_else(|| BookingError::not_found("aircraft", aircraft.id))?;
        if !current.same_cabins(aircraft)
            && state.flights.values().any(|f| f.aircraft_id == aircraft.id)
        {
            return Err(BookingError::InvalidState(format!(
                "aircraft {} has scheduled flights; cabin sizes cannot change",
                current.registration_number
            )));
        }
        let Some(slot) = state.aircraft.get_mut(&aircraft.id) else {
            return Err(BookingError::not_found("aircraft", aircraft.id));
        };
        let under_maintenance = slot.under_maintenance;
        *slot = aircraft.clone();
        // only maintenance records move this flag
        slot.under_maintenance = under_maintenance;
        Ok(())
    }

    async fn delete_aircraft(&self, id: Uuid) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state.flights.values().any(|f| f.aircraft_id == id) {
            return Err(BookingError::InvalidState(
                "aircraft is still assigned to flights".to_string(),
            ));
        }
        state
            .aircraft
            .remove(&id)
            .ok_or_else(|| BookingError::not_found("aircraft", id))?;
        state.seats.retain(|_, s| s.aircraft_id != id);
        state.maintenance.retain(|_, m| m.aircraft_id != id);
        Ok(())
    }

    async fn create_seats(&self, seats: &[Seat]) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let mut taken: HashSet<(Uuid, String)> = state
            .seats
            .values()
            .map(|s| (s.aircraft_id, s.seat_number.clone()))
            .collect();
        for seat in seats {
            if !state.aircraft.contains_key(&seat.aircraft_id) {
                return Err(BookingError::not_found("aircraft", seat.aircraft_id));
            }
            if !taken.insert((seat.aircraft_id, seat.seat_number.clone())) {
                return Err(duplicate(format!("seat {}", seat.seat_number)));
            }
        }
        for seat in seats {
            state.seats.insert(seat.id, seat.clone());
        }
        Ok(())
    }

    async fn get_seat(&self, id: Uuid) -> CoreResult<Option<Seat>> {
        Ok(self.state.lock().await.seats.get(&id).cloned())
    }

    async fn list_seats(&self, aircraft_id: Uuid) -> CoreResult<Vec<Seat>> {
        Ok(self.state.lock().await.seats_of(aircraft_id))
    }

    async fn update_seat(&self, seat: &Seat) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let slot = state
            .seats
            .get_mut(&seat.id)
            .ok_or_else(|| BookingError::not_found("seat", seat.id))?;
        *slot = seat.clone();
        Ok(())
    }

    async fn delete_seat(&self, id: Uuid) -> CoreResult<()> {
        self.state
            .lock()
            .await
            .seats
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BookingError::not_found("seat", id))
    }

    async fn create_pricing(&self, pricing: &FlightPricing) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.flights.contains_key(&pricing.flight_id) {
            return Err(BookingError::not_found("flight", pricing.flight_id));
        }
        state.pricing.insert(pricing.id, pricing.clone());
        Ok(())
    }

    async fn list_pricing(&self, flight_id: Uuid) -> CoreResult<Vec<FlightPricing>> {
        let state = self.state.lock().await;
        let mut records: Vec<FlightPricing> = state
            .pricing
            .values()
            .filter(|p| p.flight_id == flight_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.effective_from.cmp(&a.effective_from));
        Ok(records)
    }

    async fn list_all_pricing(&self) -> CoreResult<Vec<FlightPricing>> {
        let mut records: Vec<FlightPricing> =
            self.state.lock().await.pricing.values().cloned().collect();
        records.sort_by(|a, b| b.effective_from.cmp(&a.effective_from));
        Ok(records)
    }

    async fn deactivate_pricing(&self, id: Uuid) -> CoreResult<FlightPricing> {
        let mut state = self.state.lock().await;
        let pricing = state
            .pricing
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("pricing", id))?;
        pricing.active = false;
        Ok(pricing.clone())
    }

    async fn start_maintenance(&self, record: &AircraftMaintenance) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        let aircraft = state
            .aircraft
            .get_mut(&record.aircraft_id)
            .ok_or_else(|| BookingError::not_found("aircraft", record.aircraft_id))?;
        if aircraft.under_maintenance {
            return Err(BookingError::InvalidState(format!(
                "aircraft {} is already under maintenance",
                aircraft.registration_number
            )));
        }
        aircraft.under_maintenance = true;
        state.maintenance.insert(record.id, record.clone());
        Ok(())
    }

    async fn list_maintenance(&self, aircraft_id: Uuid) -> CoreResult<Vec<AircraftMaintenance>> {
        let state = self.state.lock().await;
        let mut records: Vec<AircraftMaintenance> = state
            .maintenance
            .values()
            .filter(|m| m.aircraft_id == aircraft_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(records)
    }

    async fn list_all_maintenance(&self) -> CoreResult<Vec<AircraftMaintenance>> {
        let mut records: Vec<AircraftMaintenance> =
            self.state.lock().await.maintenance.values().cloned().collect();
        records.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(records)
    }

    async fn complete_maintenance(
        &self,
        id: Uuid,
        end_date: DateTime<Utc>,
        cost: Option<Decimal>,
    ) -> CoreResult<AircraftMaintenance> {
        let mut state = self.state.lock().await;
        let record = state
            .maintenance
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("maintenance", id))?;
        if record.status != MaintenanceStatus::InProgress {
            return Err(BookingError::InvalidState(format!(
                "maintenance {} is {}",
                id, record.status
            )));
        }
        record.status = MaintenanceStatus::Completed;
        record.end_date = Some(end_date);
        if cost.is_some() {
            record.cost = cost;
        }
        let record = record.clone();
        if let Some(aircraft) = state.aircraft.get_mut(&record.aircraft_id) {
            aircraft.under_maintenance = false;
        }
        Ok(record)
    }
}

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn create_flight(&self, flight: &Flight) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state
            .flights
            .values()
            .any(|f| f.flight_number == flight.flight_number)
        {
            return Err(duplicate(format!("flight number {}", flight.flight_number)));
        }
        let aircraft = state.aircraft_for(flight)?;
        if !flight.fits(&aircraft) {
            return Err(BookingError::InvalidState(format!(
                "aircraft {} changed while flight {} was being scheduled",
                aircraft.registration_number, flight.flight_number
            )));
        }
        state.flights.insert(flight.id, flight.clone());
        Ok(())
    }

    async fn update_flight(&self, update: &Flight) -> CoreResult<Flight> {
        let mut state = self.state.lock().await;
        if state
            .flights
            .values()
            .any(|f| f.flight_number == update.flight_number && f.id != update.id)
        {
            return Err(duplicate(format!("flight number {}", update.flight_number)));
        }
        let mut flight = state
            .flights
            .get(&update.id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("flight", update.id))?;
        let current = state.aircraft_for(&flight)?;
        let next = state
            .aircraft
            .get(&update.aircraft_id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("aircraft", update.aircraft_id))?;

        flight.reassign(&current, &next)?;
        flight.flight_number = update.flight_number.clone();
        flight.departure_airport_id = update.departure_airport_id;
        flight.arrival_airport_id = update.arrival_airport_id;
        flight.departure_time = update.departure_time;
        flight.arrival_time = update.arrival_time;

        state.flights.insert(flight.id, flight.clone());
        Ok(flight)
    }

    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<Flight>> {
        Ok(self.state.lock().await.flights.get(&id).cloned())
    }

    async fn list_flights(&self) -> CoreResult<Vec<Flight>> {
        let mut flights: Vec<Flight> = self.state.lock().await.flights.values().cloned().collect();
        flights.sort_by_key(|f| f.departure_time);
        Ok(flights)
    }

    async fn update_flight_status(&self, id: Uuid, status: FlightStatus) -> CoreResult<Flight> {
        let mut state = self.state.lock().await;
        let flight = state
            .flights
            .get_mut(&id)
            .ok_or_else(|| BookingError::not_found("flight", id))?;
        flight.status = status;
        Ok(flight.clone())
    }

    async fn delete_flight(&self, id: Uuid) -> CoreResult<()> {
        let mut state = self.state.lock().await;
        if state.bookings.values().any(|r| r.booking.flight_id == id) {
            return Err(BookingError::InvalidState(
                "flight has bookings".to_string(),
            ));
        }
        state
            .flights
            .remove(&id)
            .ok_or_else(|| BookingError::not_found("flight", id))?;
        state.pricing.retain(|_, p| p.flight_id != id);
        Ok(())
    }

    async fn search_flights(
        &self,
        departure_airport_id: Uuid,
        arrival_airport_id: Uuid,
        date: NaiveDate,
    ) -> CoreResult<Vec<Flight>> {
        let state = self.state.lock().await;
        let mut flights: Vec<Flight> = state
            .flights
            .values()
            .filter(|f| {
                f.departure_airport_id == departure_airport_id
                    && f.arrival_airport_id == arrival_airport_id
                    && f.departure_time.date_naive() == date
                    && f.status != FlightStatus::Cancelled
            })
            .cloned()
            .collect();
        flights.sort_by_key(|f| f.departure_time);
        Ok(flights)
    }
}

#[async_trait]
impl ReferenceLookup for MemoryStore {
    async fn reference_exists(&self, kind: ReferenceKind, value: &str) -> CoreResult<bool> {
        Ok(self.state.lock().await.reference_taken(kind, value))
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn commit_booking(&self, record: &BookingRecord) -> CoreResult<Flight> {
        let mut state = self.state.lock().await;

        let mut flight = state
            .flights
            .get(&record.booking.flight_id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("flight", record.booking.flight_id))?;
        // every check runs on a copy; nothing is written until all pass
        flight.reserve(&record.seat_demand())?;
        if record.requested_seats().next().is_some() {
            let seats = state.seats_of(flight.aircraft_id);
            let occupied = state.occupied_seats(flight.id);
            record.check_seats(&seats, &occupied)?;
        }
        state.check_unique_references(record)?;

        state.flights.insert(flight.id, flight.clone());
        state.bookings.insert(record.booking.id, record.clone());
        Ok(flight)
    }

    async fn commit_cancellation(&self, booking_id: Uuid, grant: &Grant) -> CoreResult<Cancellation> {
        let mut state = self.state.lock().await;

        let mut record = state
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("booking", booking_id))?;
        grant.ensure_permits(&record.booking.user_id)?;
        if record.booking.status == BookingStatus::Cancelled {
            return Err(BookingError::InvalidState(format!(
                "booking {} is already cancelled",
                record.booking.reference
            )));
        }

        let mut flight = state
            .flights
            .get(&record.booking.flight_id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("flight", record.booking.flight_id))?;
        let aircraft = state.aircraft_for(&flight)?;

        let released = record.cancel();
        flight.release(&released, &aircraft);

        state.flights.insert(flight.id, flight.clone());
        state.bookings.insert(booking_id, record.clone());
        Ok(Cancellation {
            record,
            flight,
            released,
        })
    }

    async fn assign_seat(&self, ticket_id: Uuid) -> CoreResult<SeatAssignment> {
        let mut state = self.state.lock().await;

        let (booking_id, index) = state
            .bookings
            .values()
            .find_map(|r| {
                r.tickets
                    .iter()
                    .position(|t| t.ticket.id == ticket_id)
                    .map(|i| (r.booking.id, i))
            })
            .ok_or_else(|| BookingError::not_found("ticket", ticket_id))?;

        let flight_id = state.bookings[&booking_id].booking.flight_id;
        let flight = state
            .flights
            .get(&flight_id)
            .cloned()
            .ok_or_else(|| BookingError::not_found("flight", flight_id))?;
        let seats = state.seats_of(flight.aircraft_id);
        let occupied = state.occupied_seats(flight_id);

        let mut ticket = state.bookings[&booking_id].tickets[index].ticket.clone();
        ticket.auto_assign(&seats, &occupied)?;

        if let Some(record) = state.bookings.get_mut(&booking_id) {
            record.tickets[index].ticket = ticket.clone();
        }
        Ok(SeatAssignment { ticket, flight_id })
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<BookingRecord>> {
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn list_bookings_for_user(&self, user_id: &str) -> CoreResult<Vec<BookingRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<BookingRecord> = state
            .bookings
            .values()
            .filter(|r| r.booking.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.booking.booking_date.cmp(&a.booking.booking_date));
        Ok(records)
    }

    async fn list_bookings_for_flight(&self, flight_id: Uuid) -> CoreResult<Vec<BookingRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<BookingRecord> = state
            .bookings
            .values()
            .filter(|r| r.booking.flight_id == flight_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.booking.booking_date.cmp(&a.booking.booking_date));
        Ok(records)
    }
}
