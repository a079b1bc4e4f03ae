use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::{Aircraft, SeatClass};
use crate::error::BookingError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    Scheduled,
    Boarding,
    Departed,
    Arrived,
    Cancelled,
    Delayed,
}

super::string_enum!(FlightStatus, "flight status", {
    Scheduled => "SCHEDULED",
    Boarding => "BOARDING",
    Departed => "DEPARTED",
    Arrived => "ARRIVED",
    Cancelled => "CANCELLED",
    Delayed => "DELAYED",
});

impl FlightStatus {
    /// Seats can be sold only before the aircraft leaves and while the
    /// flight is still operating.
    pub fn is_bookable(&self) -> bool {
        !matches!(
            self,
            FlightStatus::Departed | FlightStatus::Arrived | FlightStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub departure_airport_id: Uuid,
    pub arrival_airport_id: Uuid,
    pub aircraft_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub status: FlightStatus,
    pub available_seats: i32,
    pub available_economy_seats: i32,
    pub available_business_seats: i32,
}

/// Seats requested (or released) per cabin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeatDemand {
    pub economy: i32,
    pub business: i32,
}

impl SeatDemand {
    pub fn from_classes<I: IntoIterator<Item = SeatClass>>(classes: I) -> Self {
        classes.into_iter().fold(SeatDemand::default(), |mut d, class| {
            match class {
                SeatClass::Economy => d.economy += 1,
                SeatClass::Business => d.business += 1,
            }
            d
        })
    }

    pub fn total(&self) -> i32 {
        self.economy + self.business
    }

    pub fn for_class(&self, class: SeatClass) -> i32 {
        match class {
            SeatClass::Economy => self.economy,
            SeatClass::Business => self.business,
        }
    }
}

impl Flight {
    /// New flight with every counter initialised from the aircraft.
    pub fn schedule(
        flight_number: String,
        departure_airport_id: Uuid,
        arrival_airport_id: Uuid,
        aircraft: &Aircraft,
        departure_time: DateTime<Utc>,
        arrival_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_number,
            departure_airport_id,
            arrival_airport_id,
            aircraft_id: aircraft.id,
            departure_time,
            arrival_time,
            status: FlightStatus::Scheduled,
            available_seats: aircraft.total_seats,
            available_economy_seats: aircraft.economy_seats,
            available_business_seats: aircraft.business_seats,
        }
    }

    pub fn available_for(&self, class: SeatClass) -> i32 {
        match class {
            SeatClass::Economy => self.available_economy_seats,
            SeatClass::Business => self.available_business_seats,
        }
    }

    pub fn ensure_bookable(&self) -> Result<(), BookingError> {
        if !self.status.is_bookable() {
            return Err(BookingError::InvalidState(format!(
                "flight {} is {} and cannot be booked",
                self.flight_number, self.status
            )));
        }
        Ok(())
    }

    pub fn check_capacity(&self, demand: &SeatDemand) -> Result<(), BookingError> {
        if demand.total() > self.available_seats {
            return Err(BookingError::CapacityExceeded {
                requested: demand.total(),
                available: self.available_seats,
            });
        }
        for class in [SeatClass::Economy, SeatClass::Business] {
            let requested = demand.for_class(class);
            if requested > self.available_for(class) {
                return Err(BookingError::CapacityExceeded {
                    requested,
                    available: self.available_for(class),
                });
            }
        }
        Ok(())
    }

    /// Check-and-decrement in one step. Callers must hold the flight's lock.
    pub fn reserve(&mut self, demand: &SeatDemand) -> Result<(), BookingError> {
        self.ensure_bookable()?;
        self.check_capacity(demand)?;
        self.available_seats -= demand.total();
        self.available_economy_seats -= demand.economy;
        self.available_business_seats -= demand.business;
        Ok(())
    }

    /// Seats sold so far, measured against the cabins the counters came from.
    pub fn sold(&self, aircraft: &Aircraft) -> SeatDemand {
        SeatDemand {
            economy: aircraft.economy_seats - self.available_economy_seats,
            business: aircraft.business_seats - self.available_business_seats,
        }
    }

    /// True while no counter is above the aircraft's cabin sizes.
    pub fn fits(&self, aircraft: &Aircraft) -> bool {
        self.aircraft_id == aircraft.id
            && self.available_seats <= aircraft.total_seats
            && self.available_economy_seats <= aircraft.economy_seats
            && self.available_business_seats <= aircraft.business_seats
    }

    /// Moves the flight onto another aircraft. Only an unsold flight can
    /// change aircraft; its counters are re-derived from the new cabins.
    pub fn reassign(&mut self, current: &Aircraft, next: &Aircraft) -> Result<(), BookingError> {
        if current.id == next.id {
            return Ok(());
        }
        if self.sold(current).total() > 0 {
            return Err(BookingError::InvalidState(format!(
                "flight {} has sold seats and cannot change aircraft",
                self.flight_number
            )));
        }
        self.aircraft_id = next.id;
        self.available_seats = next.total_seats;
        self.available_economy_seats = next.economy_seats;
        self.available_business_seats = next.business_seats;
        Ok(())
    }

    /// Gives seats back, never past the aircraft's cabin sizes.
    pub fn release(&mut self, demand: &SeatDemand, aircraft: &Aircraft) {
        self.available_seats = (self.available_seats + demand.total()).min(aircraft.total_seats);
        self.available_economy_seats =
            (self.available_economy_seats + demand.economy).min(aircraft.economy_seats);
        self.available_business_seats =
            (self.available_business_seats + demand.business).min(aircraft.business_seats);
    }
}
