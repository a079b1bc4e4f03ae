pub mod auth;

pub use auth::{admin_auth_middleware, customer_auth_middleware, rate_limit_middleware, Claims};
