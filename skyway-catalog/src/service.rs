use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use skyway_core::model::{
    Aircraft, AircraftMaintenance, Airport, Flight, FlightPricing, FlightStatus, MaintenanceStatus,
    MaintenanceType, Seat, SeatClass, DEFAULT_FREE_BAGGAGE_KG,
};
use skyway_core::repository::{CatalogRepository, FlightRepository};
use skyway_core::{BookingError, ConflictKind, CoreResult};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::layout::generate_layout;
use crate::pricing::select_active;

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirportInput {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub address: Option<String>,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AircraftInput {
    pub registration_number: String,
    pub model: String,
    pub manufacturer: String,
    pub total_seats: i32,
    pub economy_seats: i32,
    pub business_seats: i32,
    pub year_of_manufacture: i32,
    #[serde(default = "yes")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeatInput {
    pub seat_number: String,
    pub seat_class: SeatClass,
    #[serde(default = "yes")]
    pub is_available: bool,
    #[serde(default)]
    pub is_window_seat: bool,
    #[serde(default)]
    pub is_aisle_seat: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingInput {
    pub flight_id: Uuid,
    pub economy_price: Decimal,
    pub business_price: Decimal,
    pub baggage_price_per_kg: Decimal,
    pub free_baggage_kg: Option<i32>,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlightInput {
    pub flight_number: String,
    pub departure_airport_id: Uuid,
    pub arrival_airport_id: Uuid,
    pub aircraft_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceInput {
    pub aircraft_id: Uuid,
    pub start_date: Option<DateTime<Utc>>,
    pub maintenance_type: MaintenanceType,
    pub description: Option<String>,
    pub performed_by: Option<String>,
    pub cost: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlightDetails {
    #[serde(flatten)]
    pub flight: Flight,
    pub departure_airport: Airport,
    pub arrival_airport: Airport,
    pub aircraft: Aircraft,
    pub economy_price: Option<Decimal>,
    pub business_price: Option<Decimal>,
}

/// Admin operations over airports, aircraft, seats, pricing, flights and
/// maintenance. Validation lives here; the repositories only persist.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    flights: Arc<dyn FlightRepository>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, flights: Arc<dyn FlightRepository>) -> Self {
        Self { catalog, flights }
    }

    // --- airports ---

    pub async fn create_airport(&self, input: AirportInput) -> CoreResult<Airport> {
        let airport = Airport {
            id: Uuid::new_v4(),
            code: normalize_airport_code(&input.code)?,
            name: required("name", input.name)?,
            city: required("city", input.city)?,
            country: required("country", input.country)?,
            address: input.address,
            active: input.active,
        };
        self.catalog.create_airport(&airport).await?;
        info!(code = %airport.code, "Airport created");
        Ok(airport)
    }

    pub async fn get_airport(&self, id: Uuid) -> CoreResult<Airport> {
        self.catalog
            .get_airport(id)
            .await?
            .ok_or_else(|| BookingError::not_found("airport", id))
    }

    pub async fn list_airports(&self) -> CoreResult<Vec<Airport>> {
        self.catalog.list_airports().await
    }

    /// Public listing: only airports open for scheduling.
    pub async fn list_active_airports(&self) -> CoreResult<Vec<Airport>> {
        let mut airports = self.catalog.list_airports().await?;
        airports.retain(|a| a.active);
        Ok(airports)
    }

    /// Inactive airports read as missing to the public.
    pub async fn get_active_airport(&self, id: Uuid) -> CoreResult<Airport> {
        self.catalog
            .get_airport(id)
            .await?
            .filter(|a| a.active)
            .ok_or_else(|| BookingError::not_found("airport", id))
    }

    pub async fn update_airport(&self, id: Uuid, input: AirportInput) -> CoreResult<Airport> {
        let mut airport = self.get_airport(id).await?;
        airport.code = normalize_airport_code(&input.code)?;
        airport.name = required("name", input.name)?;
        airport.city = required("city", input.city)?;
        airport.country = required("country", input.country)?;
        airport.address = input.address;
        airport.active = input.active;
        self.catalog.update_airport(&airport).await?;
        Ok(airport)
    }

    pub async fn delete_airport(&self, id: Uuid) -> CoreResult<()> {
        self.get_airport(id).await?;
        self.catalog.delete_airport(id).await
    }

    // --- aircraft ---

    pub async fn create_aircraft(&self, input: AircraftInput) -> CoreResult<Aircraft> {
        let aircraft = Aircraft {
            id: Uuid::new_v4(),
            registration_number: required("registration_number", input.registration_number)?,
            model: required("model", input.model)?,
            manufacturer: required("manufacturer", input.manufacturer)?,
            total_seats: input.total_seats,
            economy_seats: input.economy_seats,
            business_seats: input.business_seats,
            year_of_manufacture: input.year_of_manufacture,
            active: input.active,
            under_maintenance: false,
        };
        aircraft.validate()?;
        self.catalog.create_aircraft(&aircraft).await?;
        info!(registration = %aircraft.registration_number, "Aircraft created");
        Ok(aircraft)
    }

    pub async fn get_aircraft(&self, id: Uuid) -> CoreResult<Aircraft> {
        self.catalog
            .get_aircraft(id)
            .await?
            .ok_or_else(|| BookingError::not_found("aircraft", id))
    }

    pub async fn list_aircraft(&self) -> CoreResult<Vec<Aircraft>> {
        self.catalog.list_aircraft().await
    }

    /// Cabin sizes may only change while no flight uses the aircraft.
    pub async fn update_aircraft(&self, id: Uuid, input: AircraftInput) -> CoreResult<Aircraft> {
        let mut aircraft = self.get_aircraft(id).await?;
        aircraft.registration_number = required("registration_number", input.registration_number)?;
        aircraft.model = required("model", input.model)?;
        aircraft.manufacturer = required("manufacturer", input.manufacturer)?;
        aircraft.total_seats = input.total_seats;
        aircraft.economy_seats = input.economy_seats;
        aircraft.business_seats = input.business_seats;
        aircraft.year_of_manufacture = input.year_of_manufacture;
        aircraft.active = input.active;
        aircraft.validate()?;
        self.catalog.update_aircraft(&aircraft).await?;
        Ok(aircraft)
    }

    pub async fn delete_aircraft(&self, id: Uuid) -> CoreResult<()> {
        self.get_aircraft(id).await?;
        self.catalog.delete_aircraft(id).await
    }

    // --- seats ---

    pub async fn create_seat(&self, aircraft_id: Uuid, input: SeatInput) -> CoreResult<Seat> {
        self.get_aircraft(aircraft_id).await?;
        let seat_number = required("seat_number", input.seat_number)?.to_ascii_uppercase();
        let existing = self.catalog.list_seats(aircraft_id).await?;
        if existing.iter().any(|s| s.seat_number == seat_number) {
            return Err(BookingError::Conflict(ConflictKind::Duplicate(format!(
                "seat {}",
                seat_number
            ))));
        }
        let seat = Seat {
            id: Uuid::new_v4(),
            aircraft_id,
            seat_number,
            seat_class: input.seat_class,
            is_available: input.is_available,
            is_window_seat: input.is_window_seat,
            is_aisle_seat: input.is_aisle_seat,
        };
        self.catalog.create_seats(std::slice::from_ref(&seat)).await?;
        Ok(seat)
    }

    pub async fn list_seats(&self, aircraft_id: Uuid) -> CoreResult<Vec<Seat>> {
        self.get_aircraft(aircraft_id).await?;
        let mut seats = self.catalog.list_seats(aircraft_id).await?;
        seats.sort_by_key(|s| s.position());
        Ok(seats)
    }

    /// Class and flags are editable; the seat number and aircraft are not.
    pub async fn update_seat(&self, id: Uuid, input: SeatInput) -> CoreResult<Seat> {
        let mut seat = self
            .catalog
            .get_seat(id)
            .await?
            .ok_or_else(|| BookingError::not_found("seat", id))?;
        seat.seat_class = input.seat_class;
        seat.is_available = input.is_available;
        seat.is_window_seat = input.is_window_seat;
        seat.is_aisle_seat = input.is_aisle_seat;
        self.catalog.update_seat(&seat).await?;
        Ok(seat)
    }

    pub async fn delete_seat(&self, id: Uuid) -> CoreResult<()> {
        self.catalog
            .get_seat(id)
            .await?
            .ok_or_else(|| BookingError::not_found("seat", id))?;
        self.catalog.delete_seat(id).await
    }

    /// Creates the default seat map. Refused once the aircraft has any seats.
    pub async fn generate_seats(&self, aircraft_id: Uuid) -> CoreResult<Vec<Seat>> {
        let aircraft = self.get_aircraft(aircraft_id).await?;
        if !self.catalog.list_seats(aircraft_id).await?.is_empty() {
            return Err(BookingError::InvalidState(format!(
                "aircraft {} already has seats",
                aircraft.registration_number
            )));
        }
        let seats = generate_layout(&aircraft);
        self.catalog.create_seats(&seats).await?;
        info!(
            registration = %aircraft.registration_number,
            count = seats.len(),
            "Seat map generated"
        );
        Ok(seats)
    }

    // --- pricing ---

    pub async fn create_pricing(&self, input: PricingInput) -> CoreResult<FlightPricing> {
        self.get_flight(input.flight_id).await?;
        let now = Utc::now();
        let pricing = FlightPricing {
            id: Uuid::new_v4(),
            flight_id: input.flight_id,
            economy_price: input.economy_price,
            business_price: input.business_price,
            baggage_price_per_kg: input.baggage_price_per_kg,
            free_baggage_kg: input.free_baggage_kg.unwrap_or(DEFAULT_FREE_BAGGAGE_KG),
            effective_from: input.effective_from.unwrap_or(now),
            effective_to: input.effective_to,
            active: true,
            created_at: now,
        };
        pricing.validate()?;
        self.catalog.create_pricing(&pricing).await?;
        info!(flight_id = %pricing.flight_id, pricing_id = %pricing.id, "Pricing created");
        Ok(pricing)
    }

    pub async fn list_pricing(&self, flight_id: Uuid) -> CoreResult<Vec<FlightPricing>> {
        self.catalog.list_pricing(flight_id).await
    }

    pub async fn list_all_pricing(&self) -> CoreResult<Vec<FlightPricing>> {
        self.catalog.list_all_pricing().await
    }

    pub async fn deactivate_pricing(&self, id: Uuid) -> CoreResult<FlightPricing> {
        let pricing = self.catalog.deactivate_pricing(id).await?;
        info!(pricing_id = %id, "Pricing deactivated");
        Ok(pricing)
    }

    pub async fn active_pricing(
        &self,
        flight_id: Uuid,
        at: DateTime<Utc>,
    ) -> CoreResult<Option<FlightPricing>> {
        let records = self.catalog.list_pricing(flight_id).await?;
        Ok(select_active(&records, at).cloned())
    }

    // --- flights ---

    pub async fn create_flight(&self, input: FlightInput) -> CoreResult<Flight> {
        let flight_number = self.check_schedule(&input).await?;
        let aircraft = self.operable_aircraft(input.aircraft_id).await?;

        let flight = Flight::schedule(
            flight_number,
            input.departure_airport_id,
            input.arrival_airport_id,
            &aircraft,
            input.departure_time,
            input.arrival_time,
        );
        self.flights.create_flight(&flight).await?;
        info!(flight_number = %flight.flight_number, seats = flight.available_seats, "Flight scheduled");
        Ok(flight)
    }

    /// Reschedules a flight. A different aircraft is accepted only while no
    /// seat has been sold; the store re-derives the counters under the lock.
    pub async fn update_flight(&self, id: Uuid, input: FlightInput) -> CoreResult<Flight> {
        let existing = self.get_flight(id).await?;
        let flight_number = self.check_schedule(&input).await?;
        if input.aircraft_id != existing.aircraft_id {
            self.operable_aircraft(input.aircraft_id).await?;
        }

        let update = Flight {
            flight_number,
            departure_airport_id: input.departure_airport_id,
            arrival_airport_id: input.arrival_airport_id,
            aircraft_id: input.aircraft_id,
            departure_time: input.departure_time,
            arrival_time: input.arrival_time,
            ..existing
        };
        let flight = self.flights.update_flight(&update).await?;
        info!(flight_number = %flight.flight_number, "Flight rescheduled");
        Ok(flight)
    }

    /// Shared by create and update: returns the normalised flight number.
    async fn check_schedule(&self, input: &FlightInput) -> CoreResult<String> {
        let flight_number =
            required("flight_number", input.flight_number.clone())?.to_ascii_uppercase();
        if input.departure_airport_id == input.arrival_airport_id {
            return Err(BookingError::Validation(
                "departure and arrival airports must differ".to_string(),
            ));
        }
        if input.arrival_time <= input.departure_time {
            return Err(BookingError::Validation(
                "arrival time must be after departure time".to_string(),
            ));
        }
        self.get_airport(input.departure_airport_id).await?;
        self.get_airport(input.arrival_airport_id).await?;
        Ok(flight_number)
    }

    async fn operable_aircraft(&self, id: Uuid) -> CoreResult<Aircraft> {
        let aircraft = self.get_aircraft(id).await?;
        if aircraft.under_maintenance {
            return Err(BookingError::InvalidState(format!(
                "aircraft {} is under maintenance",
                aircraft.registration_number
            )));
        }
        if !aircraft.active {
            return Err(BookingError::InvalidState(format!(
                "aircraft {} is not active",
                aircraft.registration_number
            )));
        }
        Ok(aircraft)
    }

    pub async fn get_flight(&self, id: Uuid) -> CoreResult<Flight> {
        self.flights
            .get_flight(id)
            .await?
            .ok_or_else(|| BookingError::not_found("flight", id))
    }

    pub async fn list_flights(&self) -> CoreResult<Vec<Flight>> {
        self.flights.list_flights().await
    }

    pub async fn update_flight_status(&self, id: Uuid, status: FlightStatus) -> CoreResult<Flight> {
        let flight = self.flights.update_flight_status(id, status).await?;
        info!(flight_number = %flight.flight_number, %status, "Flight status changed");
        Ok(flight)
    }

    pub async fn delete_flight(&self, id: Uuid) -> CoreResult<()> {
        self.get_flight(id).await?;
        self.flights.delete_flight(id).await
    }

    /// Flight with its airports, aircraft and the prices in force right now.
    pub async fn flight_details(&self, id: Uuid) -> CoreResult<FlightDetails> {
        let flight = self.get_flight(id).await?;
        self.details_for(flight).await
    }

    /// Unknown airport codes simply match nothing.
    pub async fn search_flights(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> CoreResult<Vec<FlightDetails>> {
        let from = self.catalog.get_airport_by_code(&from.trim().to_ascii_uppercase()).await?;
        let to = self.catalog.get_airport_by_code(&to.trim().to_ascii_uppercase()).await?;
        let (Some(from), Some(to)) = (from, to) else {
            return Ok(Vec::new());
        };

        let flights = self.flights.search_flights(from.id, to.id, date).await?;
        let mut results = Vec::with_capacity(flights.len());
        for flight in flights {
            results.push(self.details_for(flight).await?);
        }
        Ok(results)
    }

    async fn details_for(&self, flight: Flight) -> CoreResult<FlightDetails> {
        let departure_airport = self.get_airport(flight.departure_airport_id).await?;
        let arrival_airport = self.get_airport(flight.arrival_airport_id).await?;
        let aircraft = self.get_aircraft(flight.aircraft_id).await?;
        let pricing = self.active_pricing(flight.id, Utc::now()).await?;
        Ok(FlightDetails {
            economy_price: pricing.as_ref().map(|p| p.economy_price),
            business_price: pricing.as_ref().map(|p| p.business_price),
            flight,
            departure_airport,
            arrival_airport,
            aircraft,
        })
    }

    // --- maintenance ---

    pub async fn start_maintenance(&self, input: MaintenanceInput) -> CoreResult<AircraftMaintenance> {
        let aircraft = self.get_aircraft(input.aircraft_id).await?;
        if aircraft.under_maintenance {
            return Err(BookingError::InvalidState(format!(
                "aircraft {} is already under maintenance",
                aircraft.registration_number
            )));
        }
        if input.cost.is_some_and(|c| c.is_sign_negative()) {
            return Err(BookingError::Validation("cost must not be negative".to_string()));
        }
        let record = AircraftMaintenance {
            id: Uuid::new_v4(),
            aircraft_id: aircraft.id,
            start_date: input.start_date.unwrap_or_else(Utc::now),
            end_date: None,
            maintenance_type: input.maintenance_type,
            description: input.description,
            status: MaintenanceStatus::InProgress,
            performed_by: input.performed_by,
            cost: input.cost,
        };
        self.catalog.start_maintenance(&record).await?;
        info!(
            registration = %aircraft.registration_number,
            kind = %record.maintenance_type,
            "Maintenance started"
        );
        Ok(record)
    }

    pub async fn list_maintenance(&self, aircraft_id: Uuid) -> CoreResult<Vec<AircraftMaintenance>> {
        self.get_aircraft(aircraft_id).await?;
        self.catalog.list_maintenance(aircraft_id).await
    }

    pub async fn list_all_maintenance(&self) -> CoreResult<Vec<AircraftMaintenance>> {
        self.catalog.list_all_maintenance().await
    }

    pub async fn complete_maintenance(
        &self,
        id: Uuid,
        cost: Option<Decimal>,
    ) -> CoreResult<AircraftMaintenance> {
        let record = self.catalog.complete_maintenance(id, Utc::now(), cost).await?;
        info!(maintenance_id = %id, "Maintenance completed");
        Ok(record)
    }
}

fn normalize_airport_code(code: &str) -> CoreResult<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(BookingError::Validation(format!(
            "airport code must be three letters, got '{}'",
            code
        )));
    }
    Ok(code)
}

fn required(field: &str, value: String) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BookingError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
