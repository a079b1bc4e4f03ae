use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use skyway_catalog::{
    AircraftInput, AirportInput, CatalogService, FlightInput, MaintenanceInput, PricingInput,
    SeatInput,
};
use skyway_core::model::{
    Aircraft, Airport, FlightStatus, MaintenanceStatus, MaintenanceType, SeatClass,
};
use skyway_core::{BookingError, ConflictKind};
use skyway_store::MemoryStore;
use std::sync::Arc;
use uuid::Uuid;

fn service() -> CatalogService {
    let store = MemoryStore::new();
    CatalogService::new(Arc::new(store.clone()), Arc::new(store))
}

fn airport_input(code: &str) -> AirportInput {
    AirportInput {
        code: code.to_string(),
        name: format!("{} International", code),
        city: "City".to_string(),
        country: "Country".to_string(),
        address: None,
        active: true,
    }
}

fn aircraft_input(registration: &str, economy: i32, business: i32) -> AircraftInput {
    AircraftInput {
        registration_number: registration.to_string(),
        model: "737-800".to_string(),
        manufacturer: "Boeing".to_string(),
        total_seats: economy + business,
        economy_seats: economy,
        business_seats: business,
        year_of_manufacture: 2015,
        active: true,
    }
}

async fn route(catalog: &CatalogService) -> (Airport, Airport, Aircraft) {
    let from = catalog.create_airport(airport_input("ist")).await.unwrap();
    let to = catalog.create_airport(airport_input("AYT")).await.unwrap();
    let aircraft = catalog
        .create_aircraft(aircraft_input("TC-JFV", 12, 4))
        .await
        .unwrap();
    (from, to, aircraft)
}

fn flight_input(number: &str, from: &Airport, to: &Airport, aircraft: &Aircraft) -> FlightInput {
    let departure = Utc.with_ymd_and_hms(2030, 5, 1, 9, 30, 0).unwrap();
    FlightInput {
        flight_number: number.to_string(),
        departure_airport_id: from.id,
        arrival_airport_id: to.id,
        aircraft_id: aircraft.id,
        departure_time: departure,
        arrival_time: departure + Duration::minutes(85),
    }
}

#[tokio::test]
async fn airport_codes_are_normalized_and_unique() {
    let catalog = service();
    let airport = catalog.create_airport(airport_input(" ist ")).await.unwrap();
    assert_eq!(airport.code, "IST");

    let err = catalog.create_airport(airport_input("IST")).await.unwrap_err();
    assert!(matches!(err, BookingError::Conflict(ConflictKind::Duplicate(_))));

    let err = catalog.create_airport(airport_input("IS1")).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn aircraft_cabins_must_add_up() {
    let catalog = service();
    let mut input = aircraft_input("TC-BAD", 10, 2);
    input.total_seats = 20;
    let err = catalog.create_aircraft(input).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn new_flight_starts_with_full_cabins() {
    let catalog = service();
    let (from, to, aircraft) = route(&catalog).await;

    let flight = catalog
        .create_flight(flight_input("sk204", &from, &to, &aircraft))
        .await
        .unwrap();
    assert_eq!(flight.flight_number, "SK204");
    assert_eq!(flight.status, FlightStatus::Scheduled);
    assert_eq!(flight.available_seats, 16);
    assert_eq!(flight.available_economy_seats, 12);
    assert_eq!(flight.available_business_seats, 4);
}

#[tokio::test]
async fn flight_schedule_is_validated() {
    let catalog = service();
    let (from, to, aircraft) = route(&catalog).await;

    let err = catalog
        .create_flight(flight_input("SK1", &from, &from, &aircraft))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    let mut backwards = flight_input("SK2", &from, &to, &aircraft);
    backwards.arrival_time = backwards.departure_time - Duration::hours(1);
    let err = catalog.create_flight(backwards).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn aircraft_in_maintenance_cannot_be_scheduled_until_completed() {
    let catalog = service();
    let (from, to, aircraft) = route(&catalog).await;

    let record = catalog
        .start_maintenance(MaintenanceInput {
            aircraft_id: aircraft.id,
            start_date: None,
            maintenance_type: MaintenanceType::Routine,
            description: Some("A-check".to_string()),
            performed_by: None,
            cost: None,
        })
        .await
        .unwrap();
    assert_eq!(record.status, MaintenanceStatus::InProgress);
    assert!(catalog.get_aircraft(aircraft.id).await.unwrap().under_maintenance);

    let err = catalog
        .create_flight(flight_input("SK3", &from, &to, &aircraft))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidState(_)));

    let done = catalog
        .complete_maintenance(record.id, Some(dec!(12500.00)))
        .await
        .unwrap();
    assert_eq!(done.status, MaintenanceStatus::Completed);
    assert_eq!(done.cost, Some(dec!(12500.00)));
    assert!(done.end_date.is_some());

    catalog
        .create_flight(flight_input("SK3", &from, &to, &aircraft))
        .await
        .unwrap();
    assert_eq!(catalog.list_maintenance(aircraft.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn generated_seat_map_matches_cabins_once() {
    let catalog = service();
    let (_, _, aircraft) = route(&catalog).await;

    let seats = catalog.generate_seats(aircraft.id).await.unwrap();
    assert_eq!(seats.len(), 16);
    assert_eq!(
        seats.iter().filter(|s| s.seat_class == SeatClass::Business).count(),
        4
    );

    let err = catalog.generate_seats(aircraft.id).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidState(_)));
}

#[tokio::test]
async fn manual_seats_reject_duplicate_numbers() {
    let catalog = service();
    let (_, _, aircraft) = route(&catalog).await;
    let seat = SeatInput {
        seat_number: "12c".to_string(),
        seat_class: SeatClass::Economy,
        is_available: true,
        is_window_seat: false,
        is_aisle_seat: true,
    };

    let created = catalog.create_seat(aircraft.id, seat.clone()).await.unwrap();
    assert_eq!(created.seat_number, "12C");
    let err = catalog.create_seat(aircraft.id, seat).await.unwrap_err();
    assert!(matches!(err, BookingError::Conflict(ConflictKind::Duplicate(_))));
}

#[tokio::test]
async fn search_matches_route_and_day_and_skips_cancelled() {
    let catalog = service();
    let (from, to, aircraft) = route(&catalog).await;
    let morning = catalog
        .create_flight(flight_input("SK10", &from, &to, &aircraft))
        .await
        .unwrap();
    let cancelled = catalog
        .create_flight(flight_input("SK11", &from, &to, &aircraft))
        .await
        .unwrap();
    catalog
        .update_flight_status(cancelled.id, FlightStatus::Cancelled)
        .await
        .unwrap();
    catalog
        .create_pricing(PricingInput {
            flight_id: morning.id,
            economy_price: dec!(89.99),
            business_price: dec!(249.00),
            baggage_price_per_kg: dec!(8.00),
            free_baggage_kg: None,
            effective_from: Some(Utc::now() - Duration::hours(1)),
            effective_to: None,
        })
        .await
        .unwrap();

    let day = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
    let results = catalog.search_flights("ist", "AYT", day).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].flight.id, morning.id);
    assert_eq!(results[0].economy_price, Some(dec!(89.99)));
    assert_eq!(results[0].departure_airport.code, "IST");

    let next_day = day.succ_opt().unwrap();
    assert!(catalog.search_flights("IST", "AYT", next_day).await.unwrap().is_empty());
    assert!(catalog.search_flights("XXX", "AYT", day).await.unwrap().is_empty());
}

#[tokio::test]
async fn pricing_defaults_and_deactivation() {
    let catalog = service();
    let (from, to, aircraft) = route(&catalog).await;
    let flight = catalog
        .create_flight(flight_input("SK20", &from, &to, &aircraft))
        .await
        .unwrap();

    let pricing = catalog
        .create_pricing(PricingInput {
            flight_id: flight.id,
            economy_price: dec!(100),
            business_price: dec!(300),
            baggage_price_per_kg: dec!(5),
            free_baggage_kg: None,
            effective_from: None,
            effective_to: None,
        })
        .await
        .unwrap();
    assert_eq!(pricing.free_baggage_kg, 15);
    assert!(catalog
        .active_pricing(flight.id, Utc::now())
        .await
        .unwrap()
        .is_some());

    catalog.deactivate_pricing(pricing.id).await.unwrap();
    assert!(catalog
        .active_pricing(flight.id, Utc::now())
        .await
        .unwrap()
        .is_none());
    let details = catalog.flight_details(flight.id).await.unwrap();
    assert_eq!(details.economy_price, None);
}

#[tokio::test]
async fn negative_prices_are_rejected() {
    let catalog = service();
    let (from, to, aircraft) = route(&catalog).await;
    let flight = catalog
        .create_flight(flight_input("SK30", &from, &to, &aircraft))
        .await
        .unwrap();

    let err = catalog
        .create_pricing(PricingInput {
            flight_id: flight.id,
            economy_price: dec!(-1),
            business_price: dec!(300),
            baggage_price_per_kg: dec!(5),
            free_baggage_kg: None,
            effective_from: None,
            effective_to: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn referenced_airport_cannot_be_deleted() {
    let catalog = service();
    let (from, to, aircraft) = route(&catalog).await;
    let flight = catalog
        .create_flight(flight_input("SK40", &from, &to, &aircraft))
        .await
        .unwrap();

    let err = catalog.delete_airport(from.id).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidState(_)));

    catalog.delete_flight(flight.id).await.unwrap();
    catalog.delete_airport(from.id).await.unwrap();
    let err = catalog.get_airport(from.id).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFound { .. }));
}

#[tokio::test]
async fn cabin_sizes_are_frozen_while_flights_use_the_aircraft() {
    let catalog = service();
    let (from, to, aircraft) = route(&catalog).await;
    let flight = catalog
        .create_flight(flight_input("SK50", &from, &to, &aircraft))
        .await
        .unwrap();

    let err = catalog
        .update_aircraft(aircraft.id, aircraft_input("TC-JFV", 2, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidState(_)));
    assert_eq!(catalog.get_aircraft(aircraft.id).await.unwrap().total_seats, 16);

    // same cabins, new paperwork
    let mut renamed = aircraft_input("TC-JFV", 12, 4);
    renamed.model = "737 MAX 8".to_string();
    let updated = catalog.update_aircraft(aircraft.id, renamed).await.unwrap();
    assert_eq!(updated.model, "737 MAX 8");

    catalog.delete_flight(flight.id).await.unwrap();
    let resized = catalog
        .update_aircraft(aircraft.id, aircraft_input("TC-JFV", 2, 0))
        .await
        .unwrap();
    assert_eq!(resized.total_seats, 2);
}

#[tokio::test]
async fn flights_can_be_rescheduled() {
    let catalog = service();
    let (from, to, aircraft) = route(&catalog).await;
    let flight = catalog
        .create_flight(flight_input("SK60", &from, &to, &aircraft))
        .await
        .unwrap();
    catalog
        .update_flight_status(flight.id, FlightStatus::Delayed)
        .await
        .unwrap();

    let mut input = flight_input("sk61", &to, &from, &aircraft);
    input.departure_time = flight.departure_time + Duration::hours(3);
    input.arrival_time = flight.arrival_time + Duration::hours(3);
    let moved = catalog.update_flight(flight.id, input).await.unwrap();

    assert_eq!(moved.flight_number, "SK61");
    assert_eq!(moved.departure_airport_id, to.id);
    assert_eq!(moved.departure_time, flight.departure_time + Duration::hours(3));
    assert_eq!(moved.status, FlightStatus::Delayed);
    assert_eq!(moved.available_seats, 16);

    let mut backwards = flight_input("SK61", &to, &from, &aircraft);
    backwards.arrival_time = backwards.departure_time;
    let err = catalog.update_flight(flight.id, backwards).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    let err = catalog
        .update_flight(Uuid::new_v4(), flight_input("SK62", &from, &to, &aircraft))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound { .. }));
}

#[tokio::test]
async fn unsold_flight_takes_the_new_aircraft_cabins() {
    let catalog = service();
    let (from, to, aircraft) = route(&catalog).await;
    let regional = catalog
        .create_aircraft(aircraft_input("TC-RJA", 6, 2))
        .await
        .unwrap();
    let flight = catalog
        .create_flight(flight_input("SK70", &from, &to, &aircraft))
        .await
        .unwrap();

    let moved = catalog
        .update_flight(flight.id, flight_input("SK70", &from, &to, &regional))
        .await
        .unwrap();
    assert_eq!(moved.aircraft_id, regional.id);
    assert_eq!(moved.available_seats, 8);
    assert_eq!(moved.available_economy_seats, 6);
    assert_eq!(moved.available_business_seats, 2);
}

#[tokio::test]
async fn public_airport_reads_hide_inactive_airports() {
    let catalog = service();
    let (from, _, _) = route(&catalog).await;
    let mut closed = airport_input("SAW");
    closed.active = false;
    let closed = catalog.create_airport(closed).await.unwrap();

    let codes: Vec<String> = catalog
        .list_active_airports()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.code)
        .collect();
    assert_eq!(codes, vec!["AYT", "IST"]);
    assert_eq!(catalog.list_airports().await.unwrap().len(), 3);

    assert_eq!(catalog.get_active_airport(from.id).await.unwrap().code, "IST");
    let err = catalog.get_active_airport(closed.id).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFound { .. }));
}

#[tokio::test]
async fn pricing_and_maintenance_list_across_the_fleet() {
    let catalog = service();
    let (from, to, aircraft) = route(&catalog).await;
    let spare = catalog
        .create_aircraft(aircraft_input("TC-JFW", 12, 4))
        .await
        .unwrap();

    for number in ["SK80", "SK81"] {
        let flight = catalog
            .create_flight(flight_input(number, &from, &to, &aircraft))
            .await
            .unwrap();
        catalog
            .create_pricing(PricingInput {
                flight_id: flight.id,
                economy_price: dec!(120),
                business_price: dec!(360),
                baggage_price_per_kg: dec!(8),
                free_baggage_kg: Some(20),
                effective_from: None,
                effective_to: None,
            })
            .await
            .unwrap();
    }
    assert_eq!(catalog.list_all_pricing().await.unwrap().len(), 2);

    for id in [aircraft.id, spare.id] {
        catalog
            .start_maintenance(MaintenanceInput {
                aircraft_id: id,
                start_date: None,
                maintenance_type: MaintenanceType::Scheduled,
                description: None,
                performed_by: Some("Line crew".to_string()),
                cost: None,
            })
            .await
            .unwrap();
    }
    let records = catalog.list_all_maintenance().await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().any(|m| m.aircraft_id == spare.id));
}
