use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{BookingError, ConflictKind};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatClass {
    Economy,
    Business,
}

super::string_enum!(SeatClass, "seat class", {
    Economy => "ECONOMY",
    Business => "BUSINESS",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Airport {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub address: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Aircraft {
    pub id: Uuid,
    pub registration_number: String,
    pub model: String,
    pub manufacturer: String,
    pub total_seats: i32,
    pub economy_seats: i32,
    pub business_seats: i32,
    pub year_of_manufacture: i32,
    pub active: bool,
    pub under_maintenance: bool,
}

impl Aircraft {
    pub fn capacity_for(&self, class: SeatClass) -> i32 {
        match class {
            SeatClass::Economy => self.economy_seats,
            SeatClass::Business => self.business_seats,
        }
    }

    /// Cabin sizes must add up and none may be negative.
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.economy_seats < 0 || self.business_seats < 0 {
            return Err(BookingError::Validation(
                "seat counts must not be negative".to_string(),
            ));
        }
        if self.total_seats != self.economy_seats + self.business_seats {
            return Err(BookingError::Validation(format!(
                "total seats {} must equal economy {} + business {}",
                self.total_seats, self.economy_seats, self.business_seats
            )));
        }
        Ok(())
    }

    pub fn same_cabins(&self, other: &Aircraft) -> bool {
        self.total_seats == other.total_seats
            && self.economy_seats == other.economy_seats
            && self.business_seats == other.business_seats
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seat {
    pub id: Uuid,
    pub aircraft_id: Uuid,
    pub seat_number: String,
    pub seat_class: SeatClass,
    /// Admin flag: the physical seat can be sold. Occupancy on a given flight
    /// is derived from active tickets, never stored here.
    pub is_available: bool,
    pub is_window_seat: bool,
    pub is_aisle_seat: bool,
}

impl Seat {
    /// Row number and column letter parsed from numbers like `12C`.
    /// Unparseable numbers sort last.
    pub fn position(&self) -> (u32, String) {
        let digits: String = self
            .seat_number
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let column: String = self.seat_number[digits.len()..].to_string();
        (digits.parse().unwrap_or(u32::MAX), column)
    }
}

/// First sellable seat of `class`, in row-then-column order, that no active
/// ticket on the flight holds.
pub fn pick_free_seat<'a>(
    seats: &'a [Seat],
    class: SeatClass,
    occupied: &HashSet<String>,
) -> Option<&'a Seat> {
    seats
        .iter()
        .filter(|s| s.seat_class == class && s.is_available)
        .filter(|s| !occupied.contains(&s.seat_number))
        .min_by_key(|s| s.position())
}

/// Checks a passenger-requested seat against the aircraft's seat map and the
/// seats already held on the flight. An aircraft without a seat map only gets
/// the occupancy check.
pub fn check_requested_seat(
    seats: &[Seat],
    occupied: &HashSet<String>,
    seat_number: &str,
    class: SeatClass,
) -> Result<(), BookingError> {
    if occupied.contains(seat_number) {
        return Err(BookingError::Conflict(ConflictKind::SeatTaken(
            seat_number.to_string(),
        )));
    }
    if seats.is_empty() {
        return Ok(());
    }
    let seat = seats
        .iter()
        .find(|s| s.seat_number == seat_number)
        .ok_or_else(|| {
            BookingError::Validation(format!("seat {} does not exist on this aircraft", seat_number))
        })?;
    if seat.seat_class != class {
        return Err(BookingError::Validation(format!(
            "seat {} is {}, passenger booked {}",
            seat_number, seat.seat_class, class
        )));
    }
    if !seat.is_available {
        return Err(BookingError::Conflict(ConflictKind::SeatTaken(
            seat_number.to_string(),
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightPricing {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub economy_price: Decimal,
    pub business_price: Decimal,
    pub baggage_price_per_kg: Decimal,
    pub free_baggage_kg: i32,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_FREE_BAGGAGE_KG: i32 = 15;

impl FlightPricing {
    pub fn is_effective_at(&self, at: DateTime<Utc>) -> bool {
        self.active
            && self.effective_from <= at
            && self.effective_to.map_or(true, |end| at < end)
    }

    pub fn validate(&self) -> Result<(), BookingError> {
        let prices = [
            self.economy_price,
            self.business_price,
            self.baggage_price_per_kg,
        ];
        if prices.iter().any(|p| p.is_sign_negative()) {
            return Err(BookingError::Validation(
                "prices must not be negative".to_string(),
            ));
        }
        if self.free_baggage_kg < 0 {
            return Err(BookingError::Validation(
                "free baggage allowance must not be negative".to_string(),
            ));
        }
        if let Some(end) = self.effective_to {
            if end <= self.effective_from {
                return Err(BookingError::Validation(
                    "effective_to must be after effective_from".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceType {
    Routine,
    Emergency,
    Scheduled,
}

super::string_enum!(MaintenanceType, "maintenance type", {
    Routine => "ROUTINE",
    Emergency => "EMERGENCY",
    Scheduled => "SCHEDULED",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    InProgress,
    Completed,
    Cancelled,
}

super::string_enum!(MaintenanceStatus, "maintenance status", {
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AircraftMaintenance {
    pub id: Uuid,
    pub aircraft_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub maintenance_type: MaintenanceType,
    pub description: Option<String>,
    pub status: MaintenanceStatus,
    pub performed_by: Option<String>,
    pub cost: Option<Decimal>,
}
