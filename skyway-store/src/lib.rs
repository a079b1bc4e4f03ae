pub mod app_config;
pub mod database;
pub mod catalog_repo;
pub mod flight_repo;
pub mod booking_repo;
pub mod memory;
pub mod redis_repo;
pub mod events;

pub use app_config::Config;
pub use booking_repo::PgBookingStore;
pub use catalog_repo::PgCatalogRepository;
pub use database::DbClient;
pub use events::LogPublisher;
#[cfg(feature = "kafka")]
pub use events::KafkaPublisher;
pub use flight_repo::PgFlightRepository;
pub use memory::MemoryStore;
pub use redis_repo::{Availability, RedisClient};
