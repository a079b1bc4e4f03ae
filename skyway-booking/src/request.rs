use rust_decimal::Decimal;
use serde::Deserialize;
use skyway_core::fare::{check_baggage_weight, FareInput};
use skyway_core::model::{PaymentMethod, SeatClass};
use skyway_core::{BookingError, CoreResult};
use skyway_shared::Masked;
use uuid::Uuid;

/// One traveller as submitted by the client. Enum-valued fields arrive as
/// strings so unknown values surface as validation errors.
#[derive(Debug, Clone, Deserialize)]
pub struct PassengerRequest {
    pub first_name: String,
    pub last_name: String,
    pub passport_number: Masked<String>,
    pub seat_number: Option<String>,
    pub seat_class: String,
    pub baggage_weight_kg: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub flight_id: Uuid,
    pub passengers: Vec<PassengerRequest>,
    pub payment_method: String,
}

/// A passenger after validation and normalisation.
#[derive(Debug, Clone)]
pub struct Passenger {
    pub first_name: String,
    pub last_name: String,
    pub passport_number: Masked<String>,
    pub seat_number: Option<String>,
    pub seat_class: SeatClass,
    pub baggage_weight_kg: Option<Decimal>,
}

impl Passenger {
    pub fn fare_input(&self) -> FareInput {
        FareInput {
            seat_class: self.seat_class,
            baggage_weight_kg: self.baggage_weight_kg,
        }
    }
}

fn non_blank(field: &str, index: usize, value: &str) -> CoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BookingError::Validation(format!(
            "passenger {}: {} is required",
            index + 1,
            field
        )));
    }
    Ok(value.to_string())
}

impl CreateBookingRequest {
    pub fn validate(&self) -> CoreResult<(Vec<Passenger>, PaymentMethod)> {
        if self.passengers.is_empty() {
            return Err(BookingError::Validation(
                "at least one passenger is required".to_string(),
            ));
        }
        let payment_method: PaymentMethod = self.payment_method.parse()?;

        let mut passengers = Vec::with_capacity(self.passengers.len());
        for (i, p) in self.passengers.iter().enumerate() {
            if let Some(weight) = p.baggage_weight_kg {
                check_baggage_weight(weight).map_err(|e| match e {
                    BookingError::Validation(msg) => {
                        BookingError::Validation(format!("passenger {}: {}", i + 1, msg))
                    }
                    other => other,
                })?;
            }
            passengers.push(Passenger {
                first_name: non_blank("first name", i, &p.first_name)?,
                last_name: non_blank("last name", i, &p.last_name)?,
                passport_number: Masked(non_blank("passport number", i, p.passport_number.inner())?),
                seat_number: p
                    .seat_number
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_ascii_uppercase),
                seat_class: p.seat_class.parse()?,
                baggage_weight_kg: p.baggage_weight_kg,
            });
        }
        Ok((passengers, payment_method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn passenger(class: &str) -> PassengerRequest {
        PassengerRequest {
            first_name: " Ada ".to_string(),
            last_name: "Lovelace".to_string(),
            passport_number: Masked("U1234567".to_string()),
            seat_number: Some(" 12c ".to_string()),
            seat_class: class.to_string(),
            baggage_weight_kg: Some(dec!(20)),
        }
    }

    #[test]
    fn normalises_names_and_seats() {
        let request = CreateBookingRequest {
            flight_id: Uuid::new_v4(),
            passengers: vec![passenger("economy")],
            payment_method: "credit_card".to_string(),
        };
        let (passengers, method) = request.validate().unwrap();
        assert_eq!(method, PaymentMethod::CreditCard);
        assert_eq!(passengers[0].first_name, "Ada");
        assert_eq!(passengers[0].seat_number.as_deref(), Some("12C"));
        assert_eq!(passengers[0].seat_class, SeatClass::Economy);
    }

    #[test]
    fn unknown_class_is_a_validation_error() {
        let request = CreateBookingRequest {
            flight_id: Uuid::new_v4(),
            passengers: vec![passenger("FIRST")],
            payment_method: "PAYPAL".to_string(),
        };
        assert!(matches!(request.validate(), Err(BookingError::Validation(_))));
    }

    #[test]
    fn baggage_weight_must_fit_the_stored_precision() {
        for weight in [dec!(-0.5), dec!(1000000), dec!(23.456), Decimal::MAX] {
            let mut p = passenger("ECONOMY");
            p.baggage_weight_kg = Some(weight);
            let request = CreateBookingRequest {
                flight_id: Uuid::new_v4(),
                passengers: vec![passenger("ECONOMY"), p],
                payment_method: "PAYPAL".to_string(),
            };
            match request.validate() {
                Err(BookingError::Validation(msg)) => assert!(msg.starts_with("passenger 2:")),
                other => panic!(
                    "expected a validation error for {}, got {:?}",
                    weight,
                    other.map(|_| ())
                ),
            }
        }

        let mut p = passenger("ECONOMY");
        p.baggage_weight_kg = Some(dec!(23.40));
        let request = CreateBookingRequest {
            flight_id: Uuid::new_v4(),
            passengers: vec![p],
            payment_method: "PAYPAL".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn empty_party_is_rejected() {
        let request = CreateBookingRequest {
            flight_id: Uuid::new_v4(),
            passengers: Vec::new(),
            payment_method: "PAYPAL".to_string(),
        };
        assert!(matches!(request.validate(), Err(BookingError::Validation(_))));
    }
}
