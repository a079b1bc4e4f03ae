#![allow(dead_code)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use skyway_booking::{BookingEngine, CreateBookingRequest, PassengerRequest};
use skyway_catalog::{AircraftInput, AirportInput, CatalogService, FlightInput, PricingInput};
use skyway_core::model::{Aircraft, Flight};
use skyway_core::{Caller, Grant, Role};
use skyway_shared::Masked;
use skyway_store::{LogPublisher, MemoryStore};
use std::sync::Arc;

pub struct Fixture {
    pub store: MemoryStore,
    pub catalog: CatalogService,
    pub engine: BookingEngine,
    pub aircraft: Aircraft,
    pub flight: Flight,
}

/// Two airports, one aircraft with the given cabins, one scheduled flight
/// priced at 500 / 1500 with 12.50 per excess kg over 15 kg.
pub async fn fixture(economy: i32, business: i32, with_seat_map: bool) -> Fixture {
    let store = MemoryStore::new();
    let catalog = CatalogService::new(Arc::new(store.clone()), Arc::new(store.clone()));
    let engine = BookingEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(LogPublisher),
    );

    let ist = catalog.create_airport(airport("IST", "Istanbul")).await.unwrap();
    let esb = catalog.create_airport(airport("ESB", "Ankara")).await.unwrap();
    let aircraft = catalog
        .create_aircraft(AircraftInput {
            registration_number: "TC-SKY".to_string(),
            model: "A320neo".to_string(),
            manufacturer: "Airbus".to_string(),
            total_seats: economy + business,
            economy_seats: economy,
            business_seats: business,
            year_of_manufacture: 2021,
            active: true,
        })
        .await
        .unwrap();
    if with_seat_map {
        catalog.generate_seats(aircraft.id).await.unwrap();
    }

    let departure = Utc::now() + Duration::days(7);
    let flight = catalog
        .create_flight(FlightInput {
            flight_number: "SK101".to_string(),
            departure_airport_id: ist.id,
            arrival_airport_id: esb.id,
            aircraft_id: aircraft.id,
            departure_time: departure,
            arrival_time: departure + Duration::minutes(70),
        })
        .await
        .unwrap();
    catalog
        .create_pricing(PricingInput {
            flight_id: flight.id,
            economy_price: dec!(500.00),
            business_price: dec!(1500.00),
            baggage_price_per_kg: dec!(12.50),
            free_baggage_kg: Some(15),
            effective_from: Some(Utc::now() - Duration::days(1)),
            effective_to: None,
        })
        .await
        .unwrap();

    Fixture {
        store,
        catalog,
        engine,
        aircraft,
        flight,
    }
}

fn airport(code: &str, city: &str) -> AirportInput {
    AirportInput {
        code: code.to_string(),
        name: format!("{} Airport", city),
        city: city.to_string(),
        country: "Turkey".to_string(),
        address: None,
        active: true,
    }
}

pub fn customer(id: &str) -> Grant {
    Caller::new(id, Role::Customer).grant()
}

pub fn admin() -> Grant {
    Caller::new("ops-admin", Role::Admin).grant()
}

pub fn passenger(class: &str, seat: Option<&str>, bag_kg: Option<Decimal>) -> PassengerRequest {
    PassengerRequest {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        passport_number: Masked("U12345678".to_string()),
        seat_number: seat.map(str::to_string),
        seat_class: class.to_string(),
        baggage_weight_kg: bag_kg,
    }
}

pub fn request(flight: &Flight, passengers: Vec<PassengerRequest>) -> CreateBookingRequest {
    CreateBookingRequest {
        flight_id: flight.id,
        passengers,
        payment_method: "CREDIT_CARD".to_string(),
    }
}

impl Fixture {
    pub async fn current_flight(&self) -> Flight {
        self.catalog.get_flight(self.flight.id).await.unwrap()
    }
}
