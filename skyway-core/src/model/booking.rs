use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use skyway_shared::Masked;
use uuid::Uuid;

use std::collections::HashSet;

use super::catalog::{check_requested_seat, pick_free_seat, Seat, SeatClass};
use super::flight::SeatDemand;
use crate::error::{BookingError, ConflictKind};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Pending,
}

super::string_enum!(BookingStatus, "booking status", {
    Confirmed => "CONFIRMED",
    Cancelled => "CANCELLED",
    Pending => "PENDING",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Active,
    Cancelled,
    Used,
}

super::string_enum!(TicketStatus, "ticket status", {
    Active => "ACTIVE",
    Cancelled => "CANCELLED",
    Used => "USED",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaggageType {
    Checked,
    CarryOn,
}

super::string_enum!(BaggageType, "baggage type", {
    Checked => "CHECKED",
    CarryOn => "CARRY_ON",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaggageStatus {
    CheckedIn,
    Loaded,
    Delivered,
    Lost,
}

super::string_enum!(BaggageStatus, "baggage status", {
    CheckedIn => "CHECKED_IN",
    Loaded => "LOADED",
    Delivered => "DELIVERED",
    Lost => "LOST",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    BankTransfer,
}

super::string_enum!(PaymentMethod, "payment method", {
    CreditCard => "CREDIT_CARD",
    DebitCard => "DEBIT_CARD",
    Paypal => "PAYPAL",
    BankTransfer => "BANK_TRANSFER",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

super::string_enum!(PaymentStatus, "payment status", {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub reference: String,
    pub user_id: String,
    pub flight_id: Uuid,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub passenger_count: i32,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub ticket_number: String,
    pub passenger_first_name: String,
    pub passenger_last_name: String,
    pub passport_number: Masked<String>,
    pub seat_number: Option<String>,
    pub seat_class: SeatClass,
    pub seat_assigned: bool,
    pub seat_selection_paid: bool,
    /// Frozen from the pricing snapshot at booking time.
    pub ticket_price: Decimal,
    pub status: TicketStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Baggage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub weight_kg: Decimal,
    pub baggage_fee: Decimal,
    pub baggage_tag: String,
    pub baggage_type: BaggageType,
    pub status: BaggageStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketRecord {
    pub ticket: Ticket,
    pub baggage: Vec<Baggage>,
}

/// A booking together with every row it owns. This is the unit the stores
/// write and read atomically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingRecord {
    pub booking: Booking,
    pub tickets: Vec<TicketRecord>,
    pub payments: Vec<Payment>,
}

impl BookingRecord {
    /// Seats held by the booking's active tickets, per cabin.
    pub fn seat_demand(&self) -> SeatDemand {
        SeatDemand::from_classes(
            self.tickets
                .iter()
                .filter(|t| t.ticket.status == TicketStatus::Active)
                .map(|t| t.ticket.seat_class),
        )
    }

    /// Seat numbers passengers asked for, with the class they booked.
    pub fn requested_seats(&self) -> impl Iterator<Item = (&str, SeatClass)> {
        self.tickets.iter().filter_map(|t| {
            t.ticket
                .seat_number
                .as_deref()
                .map(|seat| (seat, t.ticket.seat_class))
        })
    }

    /// Validates every requested seat against the aircraft's seat map and
    /// the seats `occupied` on the flight. The same seat may not appear twice.
    pub fn check_seats(&self, seats: &[Seat], occupied: &HashSet<String>) -> Result<(), BookingError> {
        let mut claimed = occupied.clone();
        for (seat_number, class) in self.requested_seats() {
            check_requested_seat(seats, &claimed, seat_number, class)?;
            claimed.insert(seat_number.to_string());
        }
        Ok(())
    }

    pub fn baggage(&self) -> impl Iterator<Item = &Baggage> {
        self.tickets.iter().flat_map(|t| t.baggage.iter())
    }

    /// Marks the booking and all its tickets cancelled and refunds completed
    /// payments. Returns the seats to give back to the flight.
    pub fn cancel(&mut self) -> SeatDemand {
        let released = self.seat_demand();
        self.booking.status = BookingStatus::Cancelled;
        for t in &mut self.tickets {
            t.ticket.status = TicketStatus::Cancelled;
        }
        for p in &mut self.payments {
            if p.status == PaymentStatus::Completed {
                p.status = PaymentStatus::Refunded;
            }
        }
        released
    }
}

impl Ticket {
    /// Seats the ticket on the first free seat of its class. Only active,
    /// unseated tickets qualify.
    pub fn auto_assign(&mut self, seats: &[Seat], occupied: &HashSet<String>) -> Result<(), BookingError> {
        if self.status != TicketStatus::Active {
            return Err(BookingError::InvalidState(format!(
                "ticket {} is {}",
                self.ticket_number, self.status
            )));
        }
        if let Some(seat) = &self.seat_number {
            return Err(BookingError::InvalidState(format!(
                "ticket {} already holds seat {}",
                self.ticket_number, seat
            )));
        }
        let seat = pick_free_seat(seats, self.seat_class, occupied)
            .ok_or(BookingError::Conflict(ConflictKind::NoSeatAvailable(self.seat_class)))?;
        self.seat_number = Some(seat.seat_number.clone());
        self.seat_assigned = true;
        self.seat_selection_paid = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ticket(seat: Option<&str>, class: SeatClass) -> TicketRecord {
        TicketRecord {
            ticket: Ticket {
                id: Uuid::new_v4(),
                booking_id: Uuid::nil(),
                ticket_number: "TK000000000001".to_string(),
                passenger_first_name: "Ada".to_string(),
                passenger_last_name: "Byron".to_string(),
                passport_number: Masked("P1234567".to_string()),
                seat_number: seat.map(str::to_string),
                seat_class: class,
                seat_assigned: seat.is_some(),
                seat_selection_paid: seat.is_some(),
                ticket_price: dec!(500.00),
                status: TicketStatus::Active,
            },
            baggage: Vec::new(),
        }
    }

    fn record(tickets: Vec<TicketRecord>) -> BookingRecord {
        BookingRecord {
            booking: Booking {
                id: Uuid::nil(),
                reference: "BKABCDEFGH".to_string(),
                user_id: "u-1".to_string(),
                flight_id: Uuid::new_v4(),
                booking_date: Utc::now(),
                status: BookingStatus::Confirmed,
                passenger_count: tickets.len() as i32,
                total_amount: dec!(1500.00),
            },
            payments: vec![Payment {
                id: Uuid::new_v4(),
                booking_id: Uuid::nil(),
                amount: dec!(1500.00),
                payment_method: PaymentMethod::CreditCard,
                status: PaymentStatus::Completed,
                payment_date: Utc::now(),
                transaction_id: "TX0123456789ABCDEF".to_string(),
            }],
            tickets,
        }
    }

    fn seat(number: &str, class: SeatClass) -> Seat {
        Seat {
            id: Uuid::new_v4(),
            aircraft_id: Uuid::nil(),
            seat_number: number.to_string(),
            seat_class: class,
            is_available: true,
            is_window_seat: false,
            is_aisle_seat: false,
        }
    }

    #[test]
    fn cancel_releases_active_tickets_and_refunds() {
        let mut record = record(vec![
            ticket(None, SeatClass::Economy),
            ticket(None, SeatClass::Economy),
            ticket(Some("1A"), SeatClass::Business),
        ]);

        let released = record.cancel();

        assert_eq!(released, SeatDemand { economy: 2, business: 1 });
        assert_eq!(record.booking.status, BookingStatus::Cancelled);
        assert!(record.tickets.iter().all(|t| t.ticket.status == TicketStatus::Cancelled));
        assert_eq!(record.payments[0].status, PaymentStatus::Refunded);
        assert_eq!(record.seat_demand().total(), 0);
    }

    #[test]
    fn same_seat_twice_in_one_booking_conflicts() {
        let record = record(vec![
            ticket(Some("3A"), SeatClass::Economy),
            ticket(Some("3A"), SeatClass::Economy),
        ]);
        let seats = vec![seat("3A", SeatClass::Economy)];

        assert!(matches!(
            record.check_seats(&seats, &HashSet::new()),
            Err(BookingError::Conflict(ConflictKind::SeatTaken(_)))
        ));
    }

    #[test]
    fn auto_assign_skips_occupied_seats() {
        let seats = vec![seat("3A", SeatClass::Economy), seat("3B", SeatClass::Economy)];
        let occupied: HashSet<String> = ["3A".to_string()].into_iter().collect();
        let mut t = ticket(None, SeatClass::Economy).ticket;

        t.auto_assign(&seats, &occupied).unwrap();
        assert_eq!(t.seat_number.as_deref(), Some("3B"));
        assert!(t.seat_assigned);
        assert!(!t.seat_selection_paid);

        assert!(matches!(
            t.auto_assign(&seats, &occupied),
            Err(BookingError::InvalidState(_))
        ));
    }

    #[test]
    fn auto_assign_reports_full_cabin() {
        let seats = vec![seat("1A", SeatClass::Business)];
        let mut t = ticket(None, SeatClass::Economy).ticket;
        assert!(matches!(
            t.auto_assign(&seats, &HashSet::new()),
            Err(BookingError::Conflict(ConflictKind::NoSeatAvailable(SeatClass::Economy)))
        ));
    }
}
