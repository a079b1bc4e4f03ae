pub mod engine;
pub mod request;
pub mod view;

pub use engine::BookingEngine;
pub use request::{CreateBookingRequest, Passenger, PassengerRequest};
pub use view::{
    AircraftSummary, AirportSummary, BaggageSummary, BookingView, CancellationReceipt,
    FlightSummary, PaymentSummary, TicketSummary,
};
