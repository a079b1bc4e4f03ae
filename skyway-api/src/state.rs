use skyway_booking::BookingEngine;
use skyway_catalog::CatalogService;
use skyway_store::app_config::BookingRules;
use skyway_store::{Availability, RedisClient};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub bookings: BookingEngine,
    /// Availability cache and rate limiting are skipped when absent.
    pub redis: Option<Arc<RedisClient>>,
    pub metrics: Arc<Metrics>,
    pub auth: AuthConfig,
    pub rules: BookingRules,
}

impl AppState {
    pub fn new(
        catalog: CatalogService,
        bookings: BookingEngine,
        auth: AuthConfig,
        rules: BookingRules,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            catalog,
            bookings,
            redis: None,
            metrics: Arc::new(Metrics::new()?),
            auth,
            rules,
        })
    }

    pub fn with_redis(mut self, redis: Option<Arc<RedisClient>>) -> Self {
        self.redis = redis;
        self
    }

    pub async fn cached_availability(&self, flight_id: Uuid) -> Option<Availability> {
        let redis = self.redis.as_ref()?;
        match redis.get_flight_availability(flight_id).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(%flight_id, error = %e, "Availability cache read failed");
                None
            }
        }
    }

    /// Version to seed against; `None` disables seeding for this read.
    pub async fn availability_version(&self, flight_id: Uuid) -> Option<i64> {
        let redis = self.redis.as_ref()?;
        match redis.availability_version(flight_id).await {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(%flight_id, error = %e, "Availability version read failed");
                None
            }
        }
    }

    /// Seeds the cache unless a commit invalidated it after `version` was read.
    pub async fn seed_availability(
        &self,
        flight_id: Uuid,
        availability: Availability,
        version: i64,
    ) {
        if let Some(redis) = &self.redis {
            let ttl = self.rules.availability_ttl_seconds;
            if let Err(e) = redis
                .seed_flight_availability(flight_id, availability, version, ttl)
                .await
            {
                warn!(%flight_id, error = %e, "Availability cache write failed");
            }
        }
    }

    /// Called after every commit that moves a flight's counters.
    pub async fn invalidate_availability(&self, flight_id: Uuid) {
        if let Some(redis) = &self.redis {
            if let Err(e) = redis.invalidate_flight_availability(flight_id).await {
                warn!(%flight_id, error = %e, "Availability cache invalidation failed");
            }
        }
    }
}
