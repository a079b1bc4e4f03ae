use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use skyway_core::model::{
    Aircraft, Airport, Baggage, BaggageStatus, BaggageType, BookingRecord, BookingStatus, Flight,
    Payment, PaymentMethod, PaymentStatus, SeatClass, TicketRecord, TicketStatus,
};
use skyway_shared::Masked;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AirportSummary {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub city: String,
}

impl From<&Airport> for AirportSummary {
    fn from(a: &Airport) -> Self {
        Self {
            id: a.id,
            code: a.code.clone(),
            name: a.name.clone(),
            city: a.city.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AircraftSummary {
    pub id: Uuid,
    pub model: String,
    pub registration_number: String,
}

impl From<&Aircraft> for AircraftSummary {
    fn from(a: &Aircraft) -> Self {
        Self {
            id: a.id,
            model: a.model.clone(),
            registration_number: a.registration_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlightSummary {
    pub id: Uuid,
    pub flight_number: String,
    pub departure_airport: AirportSummary,
    pub arrival_airport: AirportSummary,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub aircraft: AircraftSummary,
}

impl FlightSummary {
    pub fn new(flight: &Flight, departure: &Airport, arrival: &Airport, aircraft: &Aircraft) -> Self {
        Self {
            id: flight.id,
            flight_number: flight.flight_number.clone(),
            departure_airport: departure.into(),
            arrival_airport: arrival.into(),
            departure_time: flight.departure_time,
            arrival_time: flight.arrival_time,
            aircraft: aircraft.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BaggageSummary {
    pub id: Uuid,
    pub weight_kg: Decimal,
    pub baggage_fee: Decimal,
    pub baggage_tag: String,
    pub baggage_type: BaggageType,
    pub status: BaggageStatus,
}

impl From<&Baggage> for BaggageSummary {
    fn from(b: &Baggage) -> Self {
        Self {
            id: b.id,
            weight_kg: b.weight_kg,
            baggage_fee: b.baggage_fee,
            baggage_tag: b.baggage_tag.clone(),
            baggage_type: b.baggage_type,
            status: b.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TicketSummary {
    pub id: Uuid,
    pub ticket_number: String,
    pub passenger_first_name: String,
    pub passenger_last_name: String,
    pub passport_number: Masked<String>,
    pub seat_number: Option<String>,
    pub seat_class: SeatClass,
    pub seat_assigned: bool,
    pub seat_selection_paid: bool,
    pub ticket_price: Decimal,
    pub status: TicketStatus,
    pub baggage: Vec<BaggageSummary>,
}

impl From<&TicketRecord> for TicketSummary {
    fn from(r: &TicketRecord) -> Self {
        let t = &r.ticket;
        Self {
            id: t.id,
            ticket_number: t.ticket_number.clone(),
            passenger_first_name: t.passenger_first_name.clone(),
            passenger_last_name: t.passenger_last_name.clone(),
            passport_number: t.passport_number.clone(),
            seat_number: t.seat_number.clone(),
            seat_class: t.seat_class,
            seat_assigned: t.seat_assigned,
            seat_selection_paid: t.seat_selection_paid,
            ticket_price: t.ticket_price,
            status: t.status,
            baggage: r.baggage.iter().map(BaggageSummary::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentSummary {
    pub id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub transaction_id: String,
}

impl From<&Payment> for PaymentSummary {
    fn from(p: &Payment) -> Self {
        Self {
            id: p.id,
            amount: p.amount,
            payment_method: p.payment_method,
            status: p.status,
            payment_date: p.payment_date,
            transaction_id: p.transaction_id.clone(),
        }
    }
}

/// What clients see of a booking.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingView {
    pub id: Uuid,
    pub booking_reference: String,
    pub flight: FlightSummary,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub passenger_count: i32,
    pub total_price: Decimal,
    pub tickets: Vec<TicketSummary>,
    pub payment: Option<PaymentSummary>,
}

impl BookingView {
    pub fn compose(record: &BookingRecord, flight: FlightSummary) -> Self {
        let b = &record.booking;
        Self {
            id: b.id,
            booking_reference: b.reference.clone(),
            flight,
            booking_date: b.booking_date,
            status: b.status,
            passenger_count: b.passenger_count,
            total_price: b.total_amount,
            tickets: record.tickets.iter().map(TicketSummary::from).collect(),
            // a booking carries one payment; show the latest if ever more
            payment: record.payments.last().map(PaymentSummary::from),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CancellationReceipt {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub flight_id: Uuid,
    pub status: BookingStatus,
    pub released_seats: i32,
    pub refunded_amount: Decimal,
    pub available_seats: i32,
}
