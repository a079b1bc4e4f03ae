pub mod error;
pub mod model;
pub mod fare;
pub mod reference;
pub mod access;
pub mod repository;
pub mod events;

pub use error::{BookingError, ConflictKind, CoreResult};
pub use access::{Caller, Grant, Role};
pub use reference::{ReferenceGenerator, ReferenceKind, ReferenceLookup};
