pub mod layout;
pub mod pricing;
pub mod service;

pub use layout::generate_layout;
pub use pricing::select_active;
pub use service::{
    AircraftInput, AirportInput, CatalogService, FlightDetails, FlightInput, MaintenanceInput,
    PricingInput, SeatInput,
};
