use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use skyway_core::model::{
    Baggage, Booking, BookingRecord, BookingStatus, Flight, Payment, Ticket, TicketRecord,
};
use skyway_core::reference::{ReferenceKind, ReferenceLookup};
use skyway_core::repository::{BookingStore, Cancellation, SeatAssignment};
use skyway_core::{BookingError, CoreResult, Grant};
use skyway_shared::Masked;
use sqlx::{PgConnection, PgPool};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::catalog_repo::{fetch_aircraft, fetch_seats};
use crate::database::{db_error, parse_column};
use crate::flight_repo::{lock_flight, write_counters};

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    reference: String,
    user_id: String,
    flight_id: Uuid,
    booking_date: DateTime<Utc>,
    status: String,
    passenger_count: i32,
    total_amount: Decimal,
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    booking_id: Uuid,
    ticket_number: String,
    passenger_first_name: String,
    passenger_last_name: String,
    passport_number: String,
    seat_number: Option<String>,
    seat_class: String,
    seat_assigned: bool,
    seat_selection_paid: bool,
    ticket_price: Decimal,
    status: String,
}

#[derive(sqlx::FromRow)]
struct BaggageRow {
    id: Uuid,
    ticket_id: Uuid,
    weight_kg: Decimal,
    baggage_fee: Decimal,
    baggage_tag: String,
    baggage_type: String,
    status: String,
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount: Decimal,
    payment_method: String,
    status: String,
    payment_date: DateTime<Utc>,
    transaction_id: String,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingError;

    fn try_from(r: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: r.id,
            reference: r.reference,
            user_id: r.user_id,
            flight_id: r.flight_id,
            booking_date: r.booking_date,
            status: parse_column(&r.status)?,
            passenger_count: r.passenger_count,
            total_amount: r.total_amount,
        })
    }
}

impl TryFrom<TicketRow> for Ticket {
    type Error = BookingError;

    fn try_from(r: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: r.id,
            booking_id: r.booking_id,
            ticket_number: r.ticket_number,
            passenger_first_name: r.passenger_first_name,
            passenger_last_name: r.passenger_last_name,
            passport_number: Masked(r.passport_number),
            seat_number: r.seat_number,
            seat_class: parse_column(&r.seat_class)?,
            seat_assigned: r.seat_assigned,
            seat_selection_paid: r.seat_selection_paid,
            ticket_price: r.ticket_price,
            status: parse_column(&r.status)?,
        })
    }
}

impl TryFrom<BaggageRow> for Baggage {
    type Error = BookingError;

    fn try_from(r: BaggageRow) -> Result<Self, Self::Error> {
        Ok(Baggage {
            id: r.id,
            ticket_id: r.ticket_id,
            weight_kg: r.weight_kg,
            baggage_fee: r.baggage_fee,
            baggage_tag: r.baggage_tag,
            baggage_type: parse_column(&r.baggage_type)?,
            status: parse_column(&r.status)?,
        })
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = BookingError;

    fn try_from(r: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: r.id,
            booking_id: r.booking_id,
            amount: r.amount,
            payment_method: parse_column(&r.payment_method)?,
            status: parse_column(&r.status)?,
            payment_date: r.payment_date,
            transaction_id: r.transaction_id,
        })
    }
}

const BOOKING_COLUMNS: &str =
    "id, reference, user_id, flight_id, booking_date, status, passenger_count, total_amount";
const TICKET_COLUMNS: &str = "id, booking_id, ticket_number, passenger_first_name, \
     passenger_last_name, passport_number, seat_number, seat_class, seat_assigned, \
     seat_selection_paid, ticket_price, status";
const BAGGAGE_COLUMNS: &str =
    "id, ticket_id, weight_kg, baggage_fee, baggage_tag, baggage_type, status";
const PAYMENT_COLUMNS: &str =
    "id, booking_id, amount, payment_method, status, payment_date, transaction_id";

/// Attaches tickets, baggage and payments to already-loaded bookings.
async fn assemble(conn: &mut PgConnection, bookings: Vec<Booking>) -> CoreResult<Vec<BookingRecord>> {
    if bookings.is_empty() {
        return Ok(Vec::new());
    }
    let booking_ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();

    let tickets = sqlx::query_as::<_, TicketRow>(&format!(
        "SELECT {} FROM tickets WHERE booking_id = ANY($1) ORDER BY ticket_number",
        TICKET_COLUMNS
    ))
    .bind(&booking_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error)?
    .into_iter()
    .map(Ticket::try_from)
    .collect::<CoreResult<Vec<_>>>()?;

    let ticket_ids: Vec<Uuid> = tickets.iter().map(|t| t.id).collect();
    let mut baggage_by_ticket: HashMap<Uuid, Vec<Baggage>> = HashMap::new();
    let baggage_rows = sqlx::query_as::<_, BaggageRow>(&format!(
        "SELECT {} FROM baggage WHERE ticket_id = ANY($1)",
        BAGGAGE_COLUMNS
    ))
    .bind(&ticket_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error)?;
    for row in baggage_rows {
        let bag = Baggage::try_from(row)?;
        baggage_by_ticket.entry(bag.ticket_id).or_default().push(bag);
    }

    let mut payments_by_booking: HashMap<Uuid, Vec<Payment>> = HashMap::new();
    let payment_rows = sqlx::query_as::<_, PaymentRow>(&format!(
        "SELECT {} FROM payments WHERE booking_id = ANY($1) ORDER BY payment_date",
        PAYMENT_COLUMNS
    ))
    .bind(&booking_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error)?;
    for row in payment_rows {
        let payment = Payment::try_from(row)?;
        payments_by_booking.entry(payment.booking_id).or_default().push(payment);
    }

    let mut tickets_by_booking: HashMap<Uuid, Vec<TicketRecord>> = HashMap::new();
    for ticket in tickets {
        let baggage = baggage_by_ticket.remove(&ticket.id).unwrap_or_default();
        tickets_by_booking
            .entry(ticket.booking_id)
            .or_default()
            .push(TicketRecord { ticket, baggage });
    }

    Ok(bookings
        .into_iter()
        .map(|booking| BookingRecord {
            tickets: tickets_by_booking.remove(&booking.id).unwrap_or_default(),
            payments: payments_by_booking.remove(&booking.id).unwrap_or_default(),
            booking,
        })
        .collect())
}

async fn load_bookings(
    conn: &mut PgConnection,
    filter: &str,
    bind: BookingFilter<'_>,
) -> CoreResult<Vec<BookingRecord>> {
    let sql = format!(
        "SELECT {} FROM bookings WHERE {} ORDER BY booking_date DESC",
        BOOKING_COLUMNS, filter
    );
    let query = sqlx::query_as::<_, BookingRow>(&sql);
    let query = match bind {
        BookingFilter::Id(id) => query.bind(id),
        BookingFilter::User(user) => query.bind(user),
    };
    let bookings = query
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(Booking::try_from)
        .collect::<CoreResult<Vec<_>>>()?;
    assemble(conn, bookings).await
}

enum BookingFilter<'a> {
    Id(Uuid),
    User(&'a str),
}

/// Seat numbers held by active tickets on the flight.
async fn occupied_seats(conn: &mut PgConnection, flight_id: Uuid) -> CoreResult<HashSet<String>> {
    let seats: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT t.seat_number
        FROM tickets t
        JOIN bookings b ON b.id = t.booking_id
        WHERE b.flight_id = $1 AND t.status = 'ACTIVE' AND t.seat_number IS NOT NULL
        "#,
    )
    .bind(flight_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error)?;
    Ok(seats.into_iter().collect())
}

async fn insert_record(conn: &mut PgConnection, record: &BookingRecord) -> CoreResult<()> {
    let b = &record.booking;
    sqlx::query(&format!(
        "INSERT INTO bookings ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        BOOKING_COLUMNS
    ))
    .bind(b.id)
    .bind(&b.reference)
    .bind(&b.user_id)
    .bind(b.flight_id)
    .bind(b.booking_date)
    .bind(b.status.as_str())
    .bind(b.passenger_count)
    .bind(b.total_amount)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    for TicketRecord { ticket: t, baggage } in &record.tickets {
        sqlx::query(&format!(
            "INSERT INTO tickets ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            TICKET_COLUMNS
        ))
        .bind(t.id)
        .bind(t.booking_id)
        .bind(&t.ticket_number)
        .bind(&t.passenger_first_name)
        .bind(&t.passenger_last_name)
        .bind(t.passport_number.inner())
        .bind(&t.seat_number)
        .bind(t.seat_class.as_str())
        .bind(t.seat_assigned)
        .bind(t.seat_selection_paid)
        .bind(t.ticket_price)
        .bind(t.status.as_str())
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;

        for bag in baggage {
            sqlx::query(&format!(
                "INSERT INTO baggage ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
                BAGGAGE_COLUMNS
            ))
            .bind(bag.id)
            .bind(bag.ticket_id)
            .bind(bag.weight_kg)
            .bind(bag.baggage_fee)
            .bind(&bag.baggage_tag)
            .bind(bag.baggage_type.as_str())
            .bind(bag.status.as_str())
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;
        }
    }

    for p in &record.payments {
        sqlx::query(&format!(
            "INSERT INTO payments ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            PAYMENT_COLUMNS
        ))
        .bind(p.id)
        .bind(p.booking_id)
        .bind(p.amount)
        .bind(p.payment_method.as_str())
        .bind(p.status.as_str())
        .bind(p.payment_date)
        .bind(&p.transaction_id)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

#[async_trait]
impl ReferenceLookup for PgBookingStore {
    async fn reference_exists(&self, kind: ReferenceKind, value: &str) -> CoreResult<bool> {
        let sql = match kind {
            ReferenceKind::BookingReference => "SELECT EXISTS(SELECT 1 FROM bookings WHERE reference = $1)",
            ReferenceKind::TicketNumber => "SELECT EXISTS(SELECT 1 FROM tickets WHERE ticket_number = $1)",
            ReferenceKind::BaggageTag => "SELECT EXISTS(SELECT 1 FROM baggage WHERE baggage_tag = $1)",
            ReferenceKind::TransactionId => "SELECT EXISTS(SELECT 1 FROM payments WHERE transaction_id = $1)",
        };
        sqlx::query_scalar::<_, bool>(sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn commit_booking(&self, record: &BookingRecord) -> CoreResult<Flight> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let mut flight = lock_flight(&mut tx, record.booking.flight_id).await?;
        flight.reserve(&record.seat_demand())?;

        if record.requested_seats().next().is_some() {
            let seats = fetch_seats(&mut *tx, flight.aircraft_id).await?;
            let occupied = occupied_seats(&mut tx, flight.id).await?;
            record.check_seats(&seats, &occupied)?;
        }

        insert_record(&mut tx, record).await?;
        write_counters(&mut tx, &flight).await?;
        tx.commit().await.map_err(db_error)?;

        debug!(reference = %record.booking.reference, "Booking committed");
        Ok(flight)
    }

    async fn commit_cancellation(&self, booking_id: Uuid, grant: &Grant) -> CoreResult<Cancellation> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let flight_id: Uuid = sqlx::query_scalar("SELECT flight_id FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or_else(|| BookingError::not_found("booking", booking_id))?;

        let mut flight = lock_flight(&mut tx, flight_id).await?;
        let mut record = load_bookings(&mut tx, "id = $1", BookingFilter::Id(booking_id))
            .await?
            .pop()
            .ok_or_else(|| BookingError::not_found("booking", booking_id))?;

        grant.ensure_permits(&record.booking.user_id)?;
        if record.booking.status == BookingStatus::Cancelled {
            return Err(BookingError::InvalidState(format!(
                "booking {} is already cancelled",
                record.booking.reference
            )));
        }

        let aircraft = fetch_aircraft(&mut *tx, flight.aircraft_id)
            .await?
            .ok_or_else(|| BookingError::not_found("aircraft", flight.aircraft_id))?;
        let released = record.cancel();
        flight.release(&released, &aircraft);

        sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1")
            .bind(booking_id)
            .bind(record.booking.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        sqlx::query("UPDATE tickets SET status = 'CANCELLED' WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        sqlx::query(
            "UPDATE payments SET status = 'REFUNDED' WHERE booking_id = $1 AND status = 'COMPLETED'",
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        write_counters(&mut tx, &flight).await?;

        tx.commit().await.map_err(db_error)?;
        Ok(Cancellation {
            record,
            flight,
            released,
        })
    }

    async fn assign_seat(&self, ticket_id: Uuid) -> CoreResult<SeatAssignment> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let flight_id: Uuid = sqlx::query_scalar(
            "SELECT b.flight_id FROM tickets t JOIN bookings b ON b.id = t.booking_id WHERE t.id = $1",
        )
        .bind(ticket_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or_else(|| BookingError::not_found("ticket", ticket_id))?;

        let flight = lock_flight(&mut tx, flight_id).await?;
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM tickets WHERE id = $1",
            TICKET_COLUMNS
        ))
        .bind(ticket_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        let mut ticket = Ticket::try_from(row)?;

        let seats = fetch_seats(&mut *tx, flight.aircraft_id).await?;
        let occupied = occupied_seats(&mut tx, flight.id).await?;
        ticket.auto_assign(&seats, &occupied)?;

        sqlx::query(
            r#"
            UPDATE tickets
            SET seat_number = $2, seat_assigned = $3, seat_selection_paid = $4
            WHERE id = $1
            "#,
        )
        .bind(ticket.id)
        .bind(&ticket.seat_number)
        .bind(ticket.seat_assigned)
        .bind(ticket.seat_selection_paid)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(SeatAssignment { ticket, flight_id })
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<BookingRecord>> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        Ok(load_bookings(&mut conn, "id = $1", BookingFilter::Id(id)).await?.pop())
    }

    async fn list_bookings_for_user(&self, user_id: &str) -> CoreResult<Vec<BookingRecord>> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        load_bookings(&mut conn, "user_id = $1", BookingFilter::User(user_id)).await
    }

    async fn list_bookings_for_flight(&self, flight_id: Uuid) -> CoreResult<Vec<BookingRecord>> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        load_bookings(&mut conn, "flight_id = $1", BookingFilter::Id(flight_id)).await
    }
}

#[cfg(test)]
mod tests {
    //! Runs against a real database: `DATABASE_URL=... cargo test -- --ignored`.
    use super::*;
    use crate::catalog_repo::PgCatalogRepository;
    use crate::database::DbClient;
    use crate::flight_repo::PgFlightRepository;
    use rust_decimal_macros::dec;
    use skyway_core::model::{
        Aircraft, Airport, PaymentMethod, PaymentStatus, SeatClass, TicketStatus,
    };
    use skyway_core::repository::{CatalogRepository, FlightRepository};
    use skyway_core::Role;

    async fn seeded() -> (PgPool, Flight) {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = DbClient::new(&url, 5).await.unwrap();
        db.migrate().await.unwrap();

        let catalog = PgCatalogRepository::new(db.pool.clone());
        let flights = PgFlightRepository::new(db.pool.clone());
        let suffix = &Uuid::new_v4().simple().to_string()[..6].to_uppercase();

        let mut airports = Vec::new();
        for code in ["A", "B"] {
            let airport = Airport {
                id: Uuid::new_v4(),
                code: format!("{}{}", code, &suffix[..2]),
                name: "Test".into(),
                city: "Test".into(),
                country: "TR".into(),
                address: None,
                active: true,
            };
            catalog.create_airport(&airport).await.unwrap();
            airports.push(airport);
        }
        let aircraft = Aircraft {
            id: Uuid::new_v4(),
            registration_number: format!("TC-{}", suffix),
            model: "A320".into(),
            manufacturer: "Airbus".into(),
            total_seats: 3,
            economy_seats: 2,
            business_seats: 1,
            year_of_manufacture: 2020,
            active: true,
            under_maintenance: false,
        };
        catalog.create_aircraft(&aircraft).await.unwrap();
        let now = Utc::now();
        let flight = Flight::schedule(
            format!("SK{}", suffix),
            airports[0].id,
            airports[1].id,
            &aircraft,
            now + chrono::Duration::days(1),
            now + chrono::Duration::days(1) + chrono::Duration::hours(2),
        );
        flights.create_flight(&flight).await.unwrap();
        (db.pool, flight)
    }

    fn record(flight: &Flight, class: SeatClass) -> BookingRecord {
        let booking_id = Uuid::new_v4();
        let suffix = Uuid::new_v4().simple().to_string().to_uppercase();
        BookingRecord {
            booking: Booking {
                id: booking_id,
                reference: format!("BK{}", &suffix[..8]),
                user_id: "pg-user".into(),
                flight_id: flight.id,
                booking_date: Utc::now(),
                status: BookingStatus::Confirmed,
                passenger_count: 1,
                total_amount: dec!(100.00),
            },
            tickets: vec![TicketRecord {
                ticket: Ticket {
                    id: Uuid::new_v4(),
                    booking_id,
                    ticket_number: format!("TK{}", &suffix[8..20]),
                    passenger_first_name: "Grace".into(),
                    passenger_last_name: "Hopper".into(),
                    passport_number: Masked("X9999999".into()),
                    seat_number: None,
                    seat_class: class,
                    seat_assigned: false,
                    seat_selection_paid: false,
                    ticket_price: dec!(100.00),
                    status: TicketStatus::Active,
                },
                baggage: Vec::new(),
            }],
            payments: vec![Payment {
                id: Uuid::new_v4(),
                booking_id,
                amount: dec!(100.00),
                payment_method: PaymentMethod::Paypal,
                status: PaymentStatus::Completed,
                payment_date: Utc::now(),
                transaction_id: format!("TX{}", &suffix[..16]),
            }],
        }
    }

    #[tokio::test]
    #[ignore]
    async fn commit_and_cancel_round_trip() {
        let (pool, flight) = seeded().await;
        let store = PgBookingStore::new(pool);
        let record = record(&flight, SeatClass::Business);

        let after = store.commit_booking(&record).await.unwrap();
        assert_eq!(after.available_seats, 2);
        assert_eq!(after.available_business_seats, 0);

        let grant = skyway_core::Caller::new("pg-user", Role::Customer).grant();
        let cancelled = store.commit_cancellation(record.booking.id, &grant).await.unwrap();
        assert_eq!(cancelled.flight.available_seats, 3);
        assert_eq!(cancelled.record.payments[0].status, PaymentStatus::Refunded);

        let again = store.commit_cancellation(record.booking.id, &grant).await;
        assert!(matches!(again, Err(BookingError::InvalidState(_))));
    }

    #[tokio::test]
    #[ignore]
    async fn capacity_is_rechecked_under_lock() {
        let (pool, flight) = seeded().await;
        let store = PgBookingStore::new(pool);

        store.commit_booking(&record(&flight, SeatClass::Business)).await.unwrap();
        let second = store.commit_booking(&record(&flight, SeatClass::Business)).await;
        assert!(matches!(second, Err(BookingError::CapacityExceeded { .. })));
    }

    #[tokio::test]
    #[ignore]
    async fn cabins_stay_frozen_and_reschedule_keeps_counters() {
        let (pool, flight) = seeded().await;
        let catalog = PgCatalogRepository::new(pool.clone());
        let flights = PgFlightRepository::new(pool.clone());
        let store = PgBookingStore::new(pool);
        store.commit_booking(&record(&flight, SeatClass::Business)).await.unwrap();

        let mut aircraft = catalog.get_aircraft(flight.aircraft_id).await.unwrap().unwrap();
        aircraft.total_seats += 10;
        aircraft.economy_seats += 10;
        let resized = catalog.update_aircraft(&aircraft).await;
        assert!(matches!(resized, Err(BookingError::InvalidState(_))));

        let mut later = flight.clone();
        later.departure_time += chrono::Duration::hours(1);
        later.arrival_time += chrono::Duration::hours(1);
        let moved = flights.update_flight(&later).await.unwrap();
        assert_eq!(moved.aircraft_id, flight.aircraft_id);
        assert_eq!(moved.available_seats, 2);
    }
}
