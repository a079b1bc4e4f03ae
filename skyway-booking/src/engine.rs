use chrono::Utc;
use rust_decimal::Decimal;
use skyway_catalog::select_active;
use skyway_core::events::EventPublisher;
use skyway_core::fare::{self, PricingSnapshot};
use skyway_core::model::{
    Baggage, BaggageStatus, BaggageType, Booking, BookingRecord, BookingStatus, Flight, Payment,
    PaymentStatus, SeatDemand, Ticket, TicketRecord, TicketStatus,
};
use skyway_core::reference::{ReferenceGenerator, ReferenceKind};
use skyway_core::repository::{BookingStore, CatalogRepository, FlightRepository};
use skyway_core::{BookingError, CoreResult, Grant};
use skyway_shared::models::events::{
    BookingCancelledEvent, BookingConfirmedEvent, DomainEvent, SeatAssignedEvent,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::request::CreateBookingRequest;
use crate::view::{BookingView, CancellationReceipt, FlightSummary, TicketSummary};

/// Creates and cancels bookings.
///
/// Reads and validation happen up front so obvious failures return early;
/// the authoritative capacity and seat checks are repeated by the store
/// inside the commit, under the flight's lock.
#[derive(Clone)]
pub struct BookingEngine {
    catalog: Arc<dyn CatalogRepository>,
    flights: Arc<dyn FlightRepository>,
    store: Arc<dyn BookingStore>,
    events: Arc<dyn EventPublisher>,
    references: ReferenceGenerator,
}

impl BookingEngine {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        flights: Arc<dyn FlightRepository>,
        store: Arc<dyn BookingStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            catalog,
            flights,
            store,
            events,
            references: ReferenceGenerator::default(),
        }
    }

    pub fn with_reference_attempts(mut self, attempts: u32) -> Self {
        self.references = ReferenceGenerator::new(attempts);
        self
    }

    pub async fn create_booking(
        &self,
        grant: &Grant,
        request: CreateBookingRequest,
    ) -> CoreResult<BookingView> {
        let (passengers, payment_method) = request.validate()?;

        let flight = self.load_flight(request.flight_id).await?;
        flight.ensure_bookable()?;
        // resolved before the commit so a committed booking always gets its view
        let summary = self.flight_summary(&flight).await?;

        let now = Utc::now();
        let pricing_records = self.catalog.list_pricing(flight.id).await?;
        let pricing = select_active(&pricing_records, now)
            .ok_or_else(|| BookingError::not_found("active pricing for flight", flight.id))?;
        let snapshot = PricingSnapshot::from(pricing);

        let demand = SeatDemand::from_classes(passengers.iter().map(|p| p.seat_class));
        flight.check_capacity(&demand)?;

        let fare_inputs: Vec<_> = passengers.iter().map(|p| p.fare_input()).collect();
        let quote = fare::quote(&snapshot, &fare_inputs)?;

        let mut issued = HashSet::new();
        let store = self.store.as_ref();
        let booking_id = Uuid::new_v4();
        let reference = self
            .references
            .issue(ReferenceKind::BookingReference, store, &mut issued)
            .await?;

        let mut tickets = Vec::with_capacity(passengers.len());
        for (passenger, line) in passengers.into_iter().zip(&quote.lines) {
            let ticket_id = Uuid::new_v4();
            let ticket_number = self
                .references
                .issue(ReferenceKind::TicketNumber, store, &mut issued)
                .await?;

            let mut baggage = Vec::new();
            if let Some(weight) = passenger.baggage_weight_kg.filter(|w| *w > Decimal::ZERO) {
                baggage.push(Baggage {
                    id: Uuid::new_v4(),
                    ticket_id,
                    weight_kg: weight,
                    baggage_fee: line.baggage_fee,
                    baggage_tag: self
                        .references
                        .issue(ReferenceKind::BaggageTag, store, &mut issued)
                        .await?,
                    baggage_type: BaggageType::Checked,
                    status: BaggageStatus::CheckedIn,
                });
            }

            let seat_chosen = passenger.seat_number.is_some();
            tickets.push(TicketRecord {
                ticket: Ticket {
                    id: ticket_id,
                    booking_id,
                    ticket_number,
                    passenger_first_name: passenger.first_name,
                    passenger_last_name: passenger.last_name,
                    passport_number: passenger.passport_number,
                    seat_number: passenger.seat_number,
                    seat_class: passenger.seat_class,
                    seat_assigned: seat_chosen,
                    seat_selection_paid: seat_chosen,
                    ticket_price: line.ticket_price,
                    status: TicketStatus::Active,
                },
                baggage,
            });
        }

        let transaction_id = self
            .references
            .issue(ReferenceKind::TransactionId, store, &mut issued)
            .await?;
        let record = BookingRecord {
            booking: Booking {
                id: booking_id,
                reference,
                user_id: grant.user_id().to_string(),
                flight_id: flight.id,
                booking_date: now,
                status: BookingStatus::Confirmed,
                passenger_count: demand.total(),
                total_amount: quote.total,
            },
            tickets,
            payments: vec![Payment {
                id: Uuid::new_v4(),
                booking_id,
                amount: quote.total,
                payment_method,
                status: PaymentStatus::Completed,
                payment_date: now,
                transaction_id,
            }],
        };

        let updated = self.store.commit_booking(&record).await?;
        info!(
            reference = %record.booking.reference,
            flight_number = %updated.flight_number,
            passengers = record.booking.passenger_count,
            total = %record.booking.total_amount,
            remaining = updated.available_seats,
            "Booking confirmed"
        );

        self.publish(DomainEvent::BookingConfirmed(BookingConfirmedEvent {
            booking_id,
            booking_reference: record.booking.reference.clone(),
            flight_id: updated.id,
            user_id: record.booking.user_id.clone(),
            passenger_count: record.booking.passenger_count,
            total_amount: record.booking.total_amount,
            available_seats: updated.available_seats,
            timestamp: Utc::now().timestamp(),
        }))
        .await;

        Ok(BookingView::compose(&record, summary))
    }

    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        grant: &Grant,
    ) -> CoreResult<CancellationReceipt> {
        let current = self.load_booking(booking_id).await?;
        grant.ensure_permits(&current.booking.user_id)?;
        if current.booking.status == BookingStatus::Cancelled {
            return Err(BookingError::InvalidState(format!(
                "booking {} is already cancelled",
                current.booking.reference
            )));
        }

        let cancellation = self.store.commit_cancellation(booking_id, grant).await?;
        let record = &cancellation.record;
        let refunded_amount: Decimal = record
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Refunded)
            .map(|p| p.amount)
            .sum();
        info!(
            reference = %record.booking.reference,
            released = cancellation.released.total(),
            remaining = cancellation.flight.available_seats,
            "Booking cancelled"
        );

        self.publish(DomainEvent::BookingCancelled(BookingCancelledEvent {
            booking_id,
            booking_reference: record.booking.reference.clone(),
            flight_id: cancellation.flight.id,
            released_seats: cancellation.released.total(),
            available_seats: cancellation.flight.available_seats,
            timestamp: Utc::now().timestamp(),
        }))
        .await;

        Ok(CancellationReceipt {
            booking_id,
            booking_reference: record.booking.reference.clone(),
            flight_id: cancellation.flight.id,
            status: record.booking.status,
            released_seats: cancellation.released.total(),
            refunded_amount,
            available_seats: cancellation.flight.available_seats,
        })
    }

    pub async fn get_booking(&self, booking_id: Uuid, grant: &Grant) -> CoreResult<BookingView> {
        let record = self.load_booking(booking_id).await?;
        grant.ensure_permits(&record.booking.user_id)?;
        let mut views = self.compose(vec![record]).await?;
        views
            .pop()
            .ok_or_else(|| BookingError::not_found("booking", booking_id))
    }

    /// Bookings owned by the caller, newest first.
    pub async fn list_bookings_for_user(&self, grant: &Grant) -> CoreResult<Vec<BookingView>> {
        let records = self.store.list_bookings_for_user(grant.user_id()).await?;
        self.compose(records).await
    }

    pub async fn list_bookings_for_flight(
        &self,
        flight_id: Uuid,
        grant: &Grant,
    ) -> CoreResult<Vec<BookingView>> {
        grant.ensure_elevated()?;
        self.load_flight(flight_id).await?;
        let records = self.store.list_bookings_for_flight(flight_id).await?;
        self.compose(records).await
    }

    pub async fn auto_assign_seat(&self, ticket_id: Uuid, grant: &Grant) -> CoreResult<TicketSummary> {
        grant.ensure_elevated()?;
        let assignment = self.store.assign_seat(ticket_id).await?;
        let seat_number = assignment.ticket.seat_number.clone().unwrap_or_default();
        info!(
            ticket = %assignment.ticket.ticket_number,
            seat = %seat_number,
            "Seat assigned"
        );

        self.publish(DomainEvent::SeatAssigned(SeatAssignedEvent {
            ticket_id,
            flight_id: assignment.flight_id,
            seat_number,
            timestamp: Utc::now().timestamp(),
        }))
        .await;

        let booking = self.load_booking(assignment.ticket.booking_id).await?;
        booking
            .tickets
            .iter()
            .find(|t| t.ticket.id == ticket_id)
            .map(TicketSummary::from)
            .ok_or_else(|| BookingError::not_found("ticket", ticket_id))
    }

    async fn load_flight(&self, id: Uuid) -> CoreResult<Flight> {
        self.flights
            .get_flight(id)
            .await?
            .ok_or_else(|| BookingError::not_found("flight", id))
    }

    async fn load_booking(&self, id: Uuid) -> CoreResult<BookingRecord> {
        self.store
            .get_booking(id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", id))
    }

    async fn flight_summary(&self, flight: &Flight) -> CoreResult<FlightSummary> {
        let departure = self
            .catalog
            .get_airport(flight.departure_airport_id)
            .await?
            .ok_or_else(|| BookingError::not_found("airport", flight.departure_airport_id))?;
        let arrival = self
            .catalog
            .get_airport(flight.arrival_airport_id)
            .await?
            .ok_or_else(|| BookingError::not_found("airport", flight.arrival_airport_id))?;
        let aircraft = self
            .catalog
            .get_aircraft(flight.aircraft_id)
            .await?
            .ok_or_else(|| BookingError::not_found("aircraft", flight.aircraft_id))?;
        Ok(FlightSummary::new(flight, &departure, &arrival, &aircraft))
    }

    async fn compose(&self, records: Vec<BookingRecord>) -> CoreResult<Vec<BookingView>> {
        let mut summaries: HashMap<Uuid, FlightSummary> = HashMap::new();
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            let flight_id = record.booking.flight_id;
            let summary = match summaries.get(&flight_id) {
                Some(summary) => summary.clone(),
                None => {
                    let flight = self.load_flight(flight_id).await?;
                    let summary = self.flight_summary(&flight).await?;
                    summaries.insert(flight_id, summary.clone());
                    summary
                }
            };
            views.push(BookingView::compose(&record, summary));
        }
        Ok(views)
    }

    /// The unit of work has already committed; a lost event is logged, not raised.
    async fn publish(&self, event: DomainEvent) {
        if let Err(e) = self.events.publish(&event).await {
            warn!(topic = event.topic(), error = %e, "Failed to publish event");
        }
    }
}
