mod common;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use skyway_booking::BookingEngine;
use skyway_core::access::Grant;
use skyway_core::model::{
    Aircraft, AircraftMaintenance, Airport, BookingRecord, Flight, FlightPricing, Seat,
};
use skyway_core::reference::{ReferenceKind, ReferenceLookup};
use skyway_core::repository::{BookingStore, CatalogRepository, Cancellation, SeatAssignment};
use skyway_core::{BookingError, CoreResult};
use skyway_store::{LogPublisher, MemoryStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use common::{customer, fixture, passenger, request};

/// Catalog whose airport and aircraft reads start failing once a booking
/// has been committed.
struct FlakyCatalog {
    inner: MemoryStore,
    committed: Arc<AtomicBool>,
}

impl FlakyCatalog {
    fn check(&self) -> CoreResult<()> {
        if self.committed.load(Ordering::SeqCst) {
            return Err(BookingError::Storage("catalog unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for FlakyCatalog {
    async fn create_airport(&self, airport: &Airport) -> CoreResult<()> {
        self.inner.create_airport(airport).await
    }
    async fn get_airport(&self, id: Uuid) -> CoreResult<Option<Airport>> {
        self.check()?;
        self.inner.get_airport(id).await
    }
    async fn get_airport_by_code(&self, code: &str) -> CoreResult<Option<Airport>> {
        self.inner.get_airport_by_code(code).await
    }
    async fn list_airports(&self) -> CoreResult<Vec<Airport>> {
        self.inner.list_airports().await
    }
    async fn update_airport(&self, airport: &Airport) -> CoreResult<()> {
        self.inner.update_airport(airport).await
    }
    async fn delete_airport(&self, id: Uuid) -> CoreResult<()> {
        self.inner.delete_airport(id).await
    }
    async fn create_aircraft(&self, aircraft: &Aircraft) -> CoreResult<()> {
        self.inner.create_aircraft(aircraft).await
    }
    async fn get_aircraft(&self, id: Uuid) -> CoreResult<Option<Aircraft>> {
        self.check()?;
        self.inner.get_aircraft(id).await
    }
    async fn list_aircraft(&self) -> CoreResult<Vec<Aircraft>> {
        self.inner.list_aircraft().await
    }
    async fn update_aircraft(&self, aircraft: &Aircraft) -> CoreResult<()> {
        self.inner.update_aircraft(aircraft).await
    }
    async fn delete_aircraft(&self, id: Uuid) -> CoreResult<()> {
        self.inner.delete_aircraft(id).await
    }
    async fn create_seats(&self, seats: &[Seat]) -> CoreResult<()> {
        self.inner.create_seats(seats).await
    }
    async fn get_seat(&self, id: Uuid) -> CoreResult<Option<Seat>> {
        self.inner.get_seat(id).await
    }
    async fn list_seats(&self, aircraft_id: Uuid) -> CoreResult<Vec<Seat>> {
        self.inner.list_seats(aircraft_id).await
    }
    async fn update_seat(&self, seat: &Seat) -> CoreResult<()> {
        self.inner.update_seat(seat).await
    }
    async fn delete_seat(&self, id: Uuid) -> CoreResult<()> {
        self.inner.delete_seat(id).await
    }
    async fn create_pricing(&self, pricing: &FlightPricing) -> CoreResult<()> {
        self.inner.create_pricing(pricing).await
    }
    async fn list_pricing(&self, flight_id: Uuid) -> CoreResult<Vec<FlightPricing>> {
        self.inner.list_pricing(flight_id).await
    }
    async fn list_all_pricing(&self) -> CoreResult<Vec<FlightPricing>> {
        self.inner.list_all_pricing().await
    }
    async fn deactivate_pricing(&self, id: Uuid) -> CoreResult<FlightPricing> {
        self.inner.deactivate_pricing(id).await
    }
    async fn start_maintenance(&self, record: &AircraftMaintenance) -> CoreResult<()> {
        self.inner.start_maintenance(record).await
    }
    async fn list_maintenance(&self, aircraft_id: Uuid) -> CoreResult<Vec<AircraftMaintenance>> {
        self.inner.list_maintenance(aircraft_id).await
    }
    async fn list_all_maintenance(&self) -> CoreResult<Vec<AircraftMaintenance>> {
        self.inner.list_all_maintenance().await
    }
    async fn complete_maintenance(
        &self,
        id: Uuid,
        end_date: DateTime<Utc>,
        cost: Option<Decimal>,
    ) -> CoreResult<AircraftMaintenance> {
        self.inner.complete_maintenance(id, end_date, cost).await
    }
}

/// Flags the catalog as soon as a booking commit succeeds.
struct SignallingStore {
    inner: MemoryStore,
    committed: Arc<AtomicBool>,
}

#[async_trait]
impl ReferenceLookup for SignallingStore {
    async fn reference_exists(&self, kind: ReferenceKind, value: &str) -> CoreResult<bool> {
        self.inner.reference_exists(kind, value).await
    }
}

#[async_trait]
impl BookingStore for SignallingStore {
    async fn commit_booking(&self, record: &BookingRecord) -> CoreResult<Flight> {
        let flight = self.inner.commit_booking(record).await?;
        self.committed.store(true, Ordering::SeqCst);
        Ok(flight)
    }
    async fn commit_cancellation(&self, booking_id: Uuid, grant: &Grant) -> CoreResult<Cancellation> {
        self.inner.commit_cancellation(booking_id, grant).await
    }
    async fn assign_seat(&self, ticket_id: Uuid) -> CoreResult<SeatAssignment> {
        self.inner.assign_seat(ticket_id).await
    }
    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<BookingRecord>> {
        self.inner.get_booking(id).await
    }
    async fn list_bookings_for_user(&self, user_id: &str) -> CoreResult<Vec<BookingRecord>> {
        self.inner.list_bookings_for_user(user_id).await
    }
    async fn list_bookings_for_flight(&self, flight_id: Uuid) -> CoreResult<Vec<BookingRecord>> {
        self.inner.list_bookings_for_flight(flight_id).await
    }
}

#[tokio::test]
async fn committed_booking_is_reported_even_if_catalog_reads_fail_afterwards() {
    let fx = fixture(10, 0, false).await;
    let committed = Arc::new(AtomicBool::new(false));
    let engine = BookingEngine::new(
        Arc::new(FlakyCatalog {
            inner: fx.store.clone(),
            committed: committed.clone(),
        }),
        Arc::new(fx.store.clone()),
        Arc::new(SignallingStore {
            inner: fx.store.clone(),
            committed: committed.clone(),
        }),
        Arc::new(LogPublisher),
    );

    let view = engine
        .create_booking(
            &customer("u-1"),
            request(&fx.flight, vec![passenger("ECONOMY", None, None)]),
        )
        .await
        .unwrap();

    assert!(committed.load(Ordering::SeqCst));
    assert_eq!(view.flight.flight_number, "SK101");
    assert_eq!(view.flight.departure_airport.code, "IST");
    assert_eq!(fx.current_flight().await.available_seats, 9);
}
