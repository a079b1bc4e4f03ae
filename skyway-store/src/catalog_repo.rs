use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use skyway_core::model::{
    Aircraft, AircraftMaintenance, Airport, FlightPricing, MaintenanceStatus, Seat,
};
use skyway_core::repository::CatalogRepository;
use skyway_core::{BookingError, CoreResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{db_error, parse_column};

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AirportRow {
    id: Uuid,
    code: String,
    name: String,
    city: String,
    country: String,
    address: Option<String>,
    active: bool,
}

impl From<AirportRow> for Airport {
    fn from(r: AirportRow) -> Self {
        Airport {
            id: r.id,
            code: r.code,
            name: r.name,
            city: r.city,
            country: r.country,
            address: r.address,
            active: r.active,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AircraftRow {
    id: Uuid,
    registration_number: String,
    model: String,
    manufacturer: String,
    total_seats: i32,
    economy_seats: i32,
    business_seats: i32,
    year_of_manufacture: i32,
    active: bool,
    under_maintenance: bool,
}

impl From<AircraftRow> for Aircraft {
    fn from(r: AircraftRow) -> Self {
        Aircraft {
            id: r.id,
            registration_number: r.registration_number,
            model: r.model,
            manufacturer: r.manufacturer,
            total_seats: r.total_seats,
            economy_seats: r.economy_seats,
            business_seats: r.business_seats,
            year_of_manufacture: r.year_of_manufacture,
            active: r.active,
            under_maintenance: r.under_maintenance,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SeatRow {
    id: Uuid,
    aircraft_id: Uuid,
    seat_number: String,
    seat_class: String,
    is_available: bool,
    is_window_seat: bool,
    is_aisle_seat: bool,
}

impl TryFrom<SeatRow> for Seat {
    type Error = BookingError;

    fn try_from(r: SeatRow) -> Result<Self, Self::Error> {
        Ok(Seat {
            id: r.id,
            aircraft_id: r.aircraft_id,
            seat_number: r.seat_number,
            seat_class: parse_column(&r.seat_class)?,
            is_available: r.is_available,
            is_window_seat: r.is_window_seat,
            is_aisle_seat: r.is_aisle_seat,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PricingRow {
    id: Uuid,
    flight_id: Uuid,
    economy_price: Decimal,
    business_price: Decimal,
    baggage_price_per_kg: Decimal,
    free_baggage_kg: i32,
    effective_from: DateTime<Utc>,
    effective_to: Option<DateTime<Utc>>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<PricingRow> for FlightPricing {
    fn from(r: PricingRow) -> Self {
        FlightPricing {
            id: r.id,
            flight_id: r.flight_id,
            economy_price: r.economy_price,
            business_price: r.business_price,
            baggage_price_per_kg: r.baggage_price_per_kg,
            free_baggage_kg: r.free_baggage_kg,
            effective_from: r.effective_from,
            effective_to: r.effective_to,
            active: r.active,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MaintenanceRow {
    id: Uuid,
    aircraft_id: Uuid,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    maintenance_type: String,
    description: Option<String>,
    status: String,
    performed_by: Option<String>,
    cost: Option<Decimal>,
}

impl TryFrom<MaintenanceRow> for AircraftMaintenance {
    type Error = BookingError;

    fn try_from(r: MaintenanceRow) -> Result<Self, Self::Error> {
        Ok(AircraftMaintenance {
            id: r.id,
            aircraft_id: r.aircraft_id,
            start_date: r.start_date,
            end_date: r.end_date,
            maintenance_type: parse_column(&r.maintenance_type)?,
            description: r.description,
            status: parse_column(&r.status)?,
            performed_by: r.performed_by,
            cost: r.cost,
        })
    }
}

const AIRCRAFT_COLUMNS: &str = "id, registration_number, model, manufacturer, total_seats, \
     economy_seats, business_seats, year_of_manufacture, active, under_maintenance";
const SEAT_COLUMNS: &str =
    "id, aircraft_id, seat_number, seat_class, is_available, is_window_seat, is_aisle_seat";
const PRICING_COLUMNS: &str = "id, flight_id, economy_price, business_price, baggage_price_per_kg, \
     free_baggage_kg, effective_from, effective_to, active, created_at";
const MAINTENANCE_COLUMNS: &str = "id, aircraft_id, start_date, end_date, maintenance_type, \
     description, status, performed_by, cost";

pub(crate) async fn fetch_aircraft<'e, E>(executor: E, id: Uuid) -> CoreResult<Option<Aircraft>>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AircraftRow>(&format!(
        "SELECT {} FROM aircraft WHERE id = $1",
        AIRCRAFT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(db_error)?;
    Ok(row.map(Aircraft::from))
}

/// Reads the aircraft under a share lock; cabin edits wait for the transaction.
pub(crate) async fn share_aircraft(conn: &mut sqlx::PgConnection, id: Uuid) -> CoreResult<Aircraft> {
    let row = sqlx::query_as::<_, AircraftRow>(&format!(
        "SELECT {} FROM aircraft WHERE id = $1 FOR SHARE",
        AIRCRAFT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error)?
    .ok_or_else(|| BookingError::not_found("aircraft", id))?;
    Ok(Aircraft::from(row))
}

pub(crate) async fn fetch_seats<'e, E>(executor: E, aircraft_id: Uuid) -> CoreResult<Vec<Seat>>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, SeatRow>(&format!(
        "SELECT {} FROM seats WHERE aircraft_id = $1",
        SEAT_COLUMNS
    ))
    .bind(aircraft_id)
    .fetch_all(executor)
    .await
    .map_err(db_error)?;
    rows.into_iter().map(Seat::try_from).collect()
}

fn affected(result: sqlx::postgres::PgQueryResult, entity: &'static str, id: Uuid) -> CoreResult<()> {
    if result.rows_affected() == 0 {
        return Err(BookingError::not_found(entity, id));
    }
    Ok(())
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn create_airport(&self, airport: &Airport) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO airports (id, code, name, city, country, address, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(airport.id)
        .bind(&airport.code)
        .bind(&airport.name)
        .bind(&airport.city)
        .bind(&airport.country)
        .bind(&airport.address)
        .bind(airport.active)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn get_airport(&self, id: Uuid) -> CoreResult<Option<Airport>> {
        let row = sqlx::query_as::<_, AirportRow>(
            "SELECT id, code, name, city, country, address, active FROM airports WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Airport::from))
    }

    async fn get_airport_by_code(&self, code: &str) -> CoreResult<Option<Airport>> {
        let row = sqlx::query_as::<_, AirportRow>(
            "SELECT id, code, name, city, country, address, active FROM airports WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Airport::from))
    }

    async fn list_airports(&self) -> CoreResult<Vec<Airport>> {
        let rows = sqlx::query_as::<_, AirportRow>(
            "SELECT id, code, name, city, country, address, active FROM airports ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Airport::from).collect())
    }

    async fn update_airport(&self, airport: &Airport) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE airports
            SET code = $2, name = $3, city = $4, country = $5, address = $6, active = $7
            WHERE id = $1
            "#,
        )
        .bind(airport.id)
        .bind(&airport.code)
        .bind(&airport.name)
        .bind(&airport.city)
        .bind(&airport.country)
        .bind(&airport.address)
        .bind(airport.active)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        affected(result, "airport", airport.id)
    }

    async fn delete_airport(&self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM airports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        affected(result, "airport", id)
    }

    async fn create_aircraft(&self, aircraft: &Aircraft) -> CoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO aircraft ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            AIRCRAFT_COLUMNS
        ))
        .bind(aircraft.id)
        .bind(&aircraft.registration_number)
        .bind(&aircraft.model)
        .bind(&aircraft.manufacturer)
        .bind(aircraft.total_seats)
        .bind(aircraft.economy_seats)
        .bind(aircraft.business_seats)
        .bind(aircraft.year_of_manufacture)
        .bind(aircraft.active)
        .bind(aircraft.under_maintenance)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn get_aircraft(&self, id: Uuid) -> CoreResult<Option<Aircraft>> {
        fetch_aircraft(&self.pool, id).await
    }

    async fn list_aircraft(&self) -> CoreResult<Vec<Aircraft>> {
        let rows = sqlx::query_as::<_, AircraftRow>(&format!(
            "SELECT {} FROM aircraft ORDER BY registration_number",
            AIRCRAFT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Aircraft::from).collect())
    }

    async fn update_aircraft(&self, aircraft: &Aircraft) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // flight creation takes this row FOR SHARE, so nothing new can be
        // scheduled on the old cabins while the check runs
        let current = sqlx::query_as::<_, AircraftRow>(&format!(
            "SELECT {} FROM aircraft WHERE id = $1 FOR UPDATE",
            AIRCRAFT_COLUMNS
        ))
        .bind(aircraft.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .map(Aircraft::from)
        .ok_or_else(|| BookingError::not_found("aircraft", aircraft.id))?;

        if !current.same_cabins(aircraft) {
            let (in_use,): (bool,) =
                sqlx::query_as("SELECT EXISTS (SELECT 1 FROM flights WHERE aircraft_id = $1)")
                    .bind(aircraft.id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(db_error)?;
            if in_use {
                return Err(BookingError::InvalidState(format!(
                    "aircraft {} has scheduled flights; cabin sizes cannot change",
                    current.registration_number
                )));
            }
        }

        sqlx::query(
            r#"
            UPDATE aircraft
            SET registration_number = $2, model = $3, manufacturer = $4, total_seats = $5,
                economy_seats = $6, business_seats = $7, year_of_manufacture = $8, active = $9
            WHERE id = $1
            "#,
        )
        .bind(aircraft.id)
        .bind(&aircraft.registration_number)
        .bind(&aircraft.model)
        .bind(&aircraft.manufacturer)
        .bind(aircraft.total_seats)
        .bind(aircraft.economy_seats)
        .bind(aircraft.business_seats)
        .bind(aircraft.year_of_manufacture)
        .bind(aircraft.active)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn delete_aircraft(&self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM aircraft WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        affected(result, "aircraft", id)
    }

    async fn create_seats(&self, seats: &[Seat]) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for seat in seats {
            sqlx::query(&format!(
                "INSERT INTO seats ({}) VALUES ($1, $2, $3, $4, $5, $6, $7)",
                SEAT_COLUMNS
            ))
            .bind(seat.id)
            .bind(seat.aircraft_id)
            .bind(&seat.seat_number)
            .bind(seat.seat_class.as_str())
            .bind(seat.is_available)
            .bind(seat.is_window_seat)
            .bind(seat.is_aisle_seat)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn get_seat(&self, id: Uuid) -> CoreResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(&format!(
            "SELECT {} FROM seats WHERE id = $1",
            SEAT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(Seat::try_from).transpose()
    }

    async fn list_seats(&self, aircraft_id: Uuid) -> CoreResult<Vec<Seat>> {
        fetch_seats(&self.pool, aircraft_id).await
    }

    async fn update_seat(&self, seat: &Seat) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE seats
            SET seat_class = $2, is_available = $3, is_window_seat = $4, is_aisle_seat = $5
            WHERE id = $1
            "#,
        )
        .bind(seat.id)
        .bind(seat.seat_class.as_str())
        .bind(seat.is_available)
        .bind(seat.is_window_seat)
        .bind(seat.is_aisle_seat)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        affected(result, "seat", seat.id)
    }

    async fn delete_seat(&self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM seats WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        affected(result, "seat", id)
    }

    async fn create_pricing(&self, pricing: &FlightPricing) -> CoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO flight_pricing ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            PRICING_COLUMNS
        ))
        .bind(pricing.id)
        .bind(pricing.flight_id)
        .bind(pricing.economy_price)
        .bind(pricing.business_price)
        .bind(pricing.baggage_price_per_kg)
        .bind(pricing.free_baggage_kg)
        .bind(pricing.effective_from)
        .bind(pricing.effective_to)
        .bind(pricing.active)
        .bind(pricing.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_pricing(&self, flight_id: Uuid) -> CoreResult<Vec<FlightPricing>> {
        let rows = sqlx::query_as::<_, PricingRow>(&format!(
            "SELECT {} FROM flight_pricing WHERE flight_id = $1 ORDER BY effective_from DESC",
            PRICING_COLUMNS
        ))
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(FlightPricing::from).collect())
    }

    async fn list_all_pricing(&self) -> CoreResult<Vec<FlightPricing>> {
        let rows = sqlx::query_as::<_, PricingRow>(&format!(
            "SELECT {} FROM flight_pricing ORDER BY effective_from DESC",
            PRICING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(FlightPricing::from).collect())
    }

    async fn deactivate_pricing(&self, id: Uuid) -> CoreResult<FlightPricing> {
        let row = sqlx::query_as::<_, PricingRow>(&format!(
            "UPDATE flight_pricing SET active = FALSE WHERE id = $1 RETURNING {}",
            PRICING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(FlightPricing::from)
            .ok_or_else(|| BookingError::not_found("pricing", id))
    }

    async fn start_maintenance(&self, record: &AircraftMaintenance) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let flagged = sqlx::query(
            "UPDATE aircraft SET under_maintenance = TRUE WHERE id = $1 AND under_maintenance = FALSE",
        )
        .bind(record.aircraft_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        if flagged.rows_affected() == 0 {
            return Err(BookingError::InvalidState(format!(
                "aircraft {} is missing or already under maintenance",
                record.aircraft_id
            )));
        }

        sqlx::query(&format!(
            "INSERT INTO aircraft_maintenance ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            MAINTENANCE_COLUMNS
        ))
        .bind(record.id)
        .bind(record.aircraft_id)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.maintenance_type.as_str())
        .bind(&record.description)
        .bind(record.status.as_str())
        .bind(&record.performed_by)
        .bind(record.cost)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn list_maintenance(&self, aircraft_id: Uuid) -> CoreResult<Vec<AircraftMaintenance>> {
        let rows = sqlx::query_as::<_, MaintenanceRow>(&format!(
            "SELECT {} FROM aircraft_maintenance WHERE aircraft_id = $1 ORDER BY start_date DESC",
            MAINTENANCE_COLUMNS
        ))
        .bind(aircraft_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(AircraftMaintenance::try_from).collect()
    }

    async fn list_all_maintenance(&self) -> CoreResult<Vec<AircraftMaintenance>> {
        let rows = sqlx::query_as::<_, MaintenanceRow>(&format!(
            "SELECT {} FROM aircraft_maintenance ORDER BY start_date DESC",
            MAINTENANCE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(AircraftMaintenance::try_from).collect()
    }

    async fn complete_maintenance(
        &self,
        id: Uuid,
        end_date: DateTime<Utc>,
        cost: Option<Decimal>,
    ) -> CoreResult<AircraftMaintenance> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = sqlx::query_as::<_, MaintenanceRow>(&format!(
            "SELECT {} FROM aircraft_maintenance WHERE id = $1 FOR UPDATE",
            MAINTENANCE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or_else(|| BookingError::not_found("maintenance", id))?;

        let mut record = AircraftMaintenance::try_from(row)?;
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

        sqlx::query(
            "UPDATE aircraft_maintenance SET status = $2, end_date = $3, cost = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(record.status.as_str())
        .bind(record.end_date)
        .bind(record.cost)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query("UPDATE aircraft SET under_maintenance = FALSE WHERE id = $1")
            .bind(record.aircraft_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(record)
    }
}
