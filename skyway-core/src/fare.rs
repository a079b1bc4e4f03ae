use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BookingError, CoreResult};
use crate::model::{FlightPricing, SeatClass};

/// Prices captured from the flight's active pricing record when a booking
/// starts. Tickets keep these values even if the pricing is later replaced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingSnapshot {
    pub pricing_id: Uuid,
    pub economy_price: Decimal,
    pub business_price: Decimal,
    pub baggage_price_per_kg: Decimal,
    pub free_baggage_kg: Decimal,
}

impl From<&FlightPricing> for PricingSnapshot {
    fn from(pricing: &FlightPricing) -> Self {
        Self {
            pricing_id: pricing.id,
            economy_price: pricing.economy_price,
            business_price: pricing.business_price,
            baggage_price_per_kg: pricing.baggage_price_per_kg,
            free_baggage_kg: Decimal::from(pricing.free_baggage_kg),
        }
    }
}

impl PricingSnapshot {
    pub fn unit_price(&self, class: SeatClass) -> Decimal {
        match class {
            SeatClass::Economy => self.economy_price,
            SeatClass::Business => self.business_price,
        }
    }

    /// Excess-weight fee: `max(0, weight - free) * per_kg`, rounded to cents.
    pub fn baggage_fee(&self, weight_kg: Decimal) -> CoreResult<Decimal> {
        check_baggage_weight(weight_kg)?;
        let excess = weight_kg
            .checked_sub(self.free_baggage_kg)
            .ok_or_else(overflow)?
            .max(Decimal::ZERO);
        let fee = excess
            .checked_mul(self.baggage_price_per_kg)
            .ok_or_else(overflow)?;
        Ok(round_money(fee))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareInput {
    pub seat_class: SeatClass,
    pub baggage_weight_kg: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FareLine {
    pub ticket_price: Decimal,
    pub baggage_fee: Decimal,
}

impl FareLine {
    pub fn subtotal(&self) -> CoreResult<Decimal> {
        self.ticket_price
            .checked_add(self.baggage_fee)
            .ok_or_else(overflow)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FareQuote {
    /// One line per passenger, in request order.
    pub lines: Vec<FareLine>,
    pub total: Decimal,
}

/// Largest weight the `NUMERIC(8,2)` baggage column holds.
pub fn max_baggage_weight_kg() -> Decimal {
    Decimal::new(99_999_999, 2)
}

/// Weights are stored to the hundredth of a kilogram, so anything finer or
/// larger than the column is refused rather than priced on a value that
/// would not round-trip.
pub fn check_baggage_weight(weight_kg: Decimal) -> CoreResult<()> {
    if weight_kg < Decimal::ZERO {
        return Err(BookingError::Validation(format!(
            "baggage weight must not be negative, got {}",
            weight_kg
        )));
    }
    if weight_kg > max_baggage_weight_kg() {
        return Err(BookingError::Validation(format!(
            "baggage weight must not exceed {} kg, got {}",
            max_baggage_weight_kg(),
            weight_kg
        )));
    }
    if weight_kg.normalize().scale() > 2 {
        return Err(BookingError::Validation(format!(
            "baggage weight allows at most 2 decimal places, got {}",
            weight_kg
        )));
    }
    Ok(())
}

fn overflow() -> BookingError {
    BookingError::Validation("fare amount is out of range".to_string())
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Prices every passenger against one snapshot.
pub fn quote(snapshot: &PricingSnapshot, passengers: &[FareInput]) -> CoreResult<FareQuote> {
    if passengers.is_empty() {
        return Err(BookingError::Validation(
            "at least one passenger is required".to_string(),
        ));
    }

    let mut lines = Vec::with_capacity(passengers.len());
    for passenger in passengers {
        let baggage_fee = match passenger.baggage_weight_kg {
            Some(weight) => snapshot.baggage_fee(weight)?,
            None => Decimal::ZERO,
        };
        lines.push(FareLine {
            ticket_price: round_money(snapshot.unit_price(passenger.seat_class)),
            baggage_fee,
        });
    }

    let mut total = Decimal::ZERO;
    for line in &lines {
        total = total.checked_add(line.subtotal()?).ok_or_else(overflow)?;
    }
    Ok(FareQuote { lines, total })
}
