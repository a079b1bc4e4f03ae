use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use skyway_core::model::{Flight, FlightStatus};
use skyway_core::repository::FlightRepository;
use skyway_core::{BookingError, CoreResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog_repo::share_aircraft;
use crate::database::{db_error, parse_column};

pub struct PgFlightRepository {
    pool: PgPool,
}

impl PgFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FlightRow {
    id: Uuid,
    flight_number: String,
    departure_airport_id: Uuid,
    arrival_airport_id: Uuid,
    aircraft_id: Uuid,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    status: String,
    available_seats: i32,
    available_economy_seats: i32,
    available_business_seats: i32,
}

impl TryFrom<FlightRow> for Flight {
    type Error = BookingError;

    fn try_from(r: FlightRow) -> Result<Self, Self::Error> {
        Ok(Flight {
            id: r.id,
            flight_number: r.flight_number,
            departure_airport_id: r.departure_airport_id,
            arrival_airport_id: r.arrival_airport_id,
            aircraft_id: r.aircraft_id,
            departure_time: r.departure_time,
            arrival_time: r.arrival_time,
            status: parse_column(&r.status)?,
            available_seats: r.available_seats,
            available_economy_seats: r.available_economy_seats,
            available_business_seats: r.available_business_seats,
        })
    }
}

pub(crate) const FLIGHT_COLUMNS: &str = "id, flight_number, departure_airport_id, \
     arrival_airport_id, aircraft_id, departure_time, arrival_time, status, available_seats, \
     available_economy_seats, available_business_seats";

/// Takes the flight's row lock for the rest of the transaction.
pub(crate) async fn lock_flight(
    conn: &mut sqlx::PgConnection,
    id: Uuid,
) -> CoreResult<Flight> {
    let row = sqlx::query_as::<_, FlightRow>(&format!(
        "SELECT {} FROM flights WHERE id = $1 FOR UPDATE",
        FLIGHT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error)?
    .ok_or_else(|| BookingError::not_found("flight", id))?;
    Flight::try_from(row)
}

pub(crate) async fn write_counters(conn: &mut sqlx::PgConnection, flight: &Flight) -> CoreResult<()> {
    sqlx::query(
        r#"
        UPDATE flights
        SET available_seats = $2, available_economy_seats = $3, available_business_seats = $4
        WHERE id = $1
        "#,
    )
    .bind(flight.id)
    .bind(flight.available_seats)
    .bind(flight.available_economy_seats)
    .bind(flight.available_business_seats)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;
    Ok(())
}

#[async_trait]
impl FlightRepository for PgFlightRepository {
    async fn create_flight(&self, flight: &Flight) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let aircraft = share_aircraft(&mut tx, flight.aircraft_id).await?;
        if !flight.fits(&aircraft) {
            return Err(BookingError::InvalidState(format!(
                "aircraft {} changed while flight {} was being scheduled",
                aircraft.registration_number, flight.flight_number
            )));
        }

        sqlx::query(&format!(
            "INSERT INTO flights ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            FLIGHT_COLUMNS
        ))
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(flight.departure_airport_id)
        .bind(flight.arrival_airport_id)
        .bind(flight.aircraft_id)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .bind(flight.status.as_str())
        .bind(flight.available_seats)
        .bind(flight.available_economy_seats)
        .bind(flight.available_business_seats)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn update_flight(&self, update: &Flight) -> CoreResult<Flight> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let mut flight = lock_flight(&mut tx, update.id).await?;
        let current = share_aircraft(&mut tx, flight.aircraft_id).await?;
        let next = if update.aircraft_id == current.id {
            current.clone()
        } else {
            share_aircraft(&mut tx, update.aircraft_id).await?
        };

        flight.reassign(&current, &next)?;
        flight.flight_number = update.flight_number.clone();
        flight.departure_airport_id = update.departure_airport_id;
        flight.arrival_airport_id = update.arrival_airport_id;
        flight.departure_time = update.departure_time;
        flight.arrival_time = update.arrival_time;

        sqlx::query(
            r#"
            UPDATE flights
            SET flight_number = $2, departure_airport_id = $3, arrival_airport_id = $4,
                aircraft_id = $5, departure_time = $6, arrival_time = $7
            WHERE id = $1
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(flight.departure_airport_id)
        .bind(flight.arrival_airport_id)
        .bind(flight.aircraft_id)
        .bind(flight.departure_time)
        .bind(flight.arrival_time)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        write_counters(&mut tx, &flight).await?;

        tx.commit().await.map_err(db_error)?;
        Ok(flight)
    }

    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {} FROM flights WHERE id = $1",
            FLIGHT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(Flight::try_from).transpose()
    }

    async fn list_flights(&self) -> CoreResult<Vec<Flight>> {
        let rows = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {} FROM flights ORDER BY departure_time",
            FLIGHT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(Flight::try_from).collect()
    }

    async fn update_flight_status(&self, id: Uuid, status: FlightStatus) -> CoreResult<Flight> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "UPDATE flights SET status = $2 WHERE id = $1 RETURNING {}",
            FLIGHT_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| BookingError::not_found("flight", id))?;
        Flight::try_from(row)
    }

    async fn delete_flight(&self, id: Uuid) -> CoreResult<()> {
        // bookings reference flights without cascade, so a booked flight
        // trips the foreign key and surfaces as InvalidState
        let result = sqlx::query("DELETE FROM flights WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(BookingError::not_found("flight", id));
        }
        Ok(())
    }

    async fn search_flights(
        &self,
        departure_airport_id: Uuid,
        arrival_airport_id: Uuid,
        date: NaiveDate,
    ) -> CoreResult<Vec<Flight>> {
        let day_start = date.and_time(chrono::NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);

        let rows = sqlx::query_as::<_, FlightRow>(&format!(
            r#"
            SELECT {} FROM flights
            WHERE departure_airport_id = $1
              AND arrival_airport_id = $2
              AND departure_time >= $3
              AND departure_time < $4
              AND status <> 'CANCELLED'
            ORDER BY departure_time
            "#,
            FLIGHT_COLUMNS
        ))
        .bind(departure_airport_id)
        .bind(arrival_airport_id)
        .bind(day_start)
        .bind(day_end)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(Flight::try_from).collect()
    }
}
