use redis::{AsyncCommands, RedisResult};
use serde::{Deserialize, Serialize};
use skyway_core::model::Flight;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Seat counters as served by the public availability endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Availability {
    pub available_seats: i32,
    pub available_economy_seats: i32,
    pub available_business_seats: i32,
}

impl From<&Flight> for Availability {
    fn from(flight: &Flight) -> Self {
        Self {
            available_seats: flight.available_seats,
            available_economy_seats: flight.available_economy_seats,
            available_business_seats: flight.available_business_seats,
        }
    }
}

impl Availability {
    fn fields(&self) -> [(&'static str, i32); 3] {
        [
            ("total", self.available_seats),
            ("economy", self.available_economy_seats),
            ("business", self.available_business_seats),
        ]
    }

    fn from_fields(fields: &HashMap<String, i32>) -> Option<Self> {
        Some(Self {
            available_seats: *fields.get("total")?,
            available_economy_seats: *fields.get("economy")?,
            available_business_seats: *fields.get("business")?,
        })
    }
}

fn availability_key(flight_id: Uuid) -> String {
    format!("flight:{}:availability", flight_id)
}

fn version_key(flight_id: Uuid) -> String {
    format!("flight:{}:availability:version", flight_id)
}

const VERSION_TTL_SECONDS: i64 = 86_400;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// `None` on a miss or a partial entry; callers fall back to the database.
    pub async fn get_flight_availability(&self, flight_id: Uuid) -> RedisResult<Option<Availability>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let fields: HashMap<String, i32> = conn.hgetall(availability_key(flight_id)).await?;
        Ok(Availability::from_fields(&fields))
    }

    /// Current invalidation count for the flight; 0 when never invalidated.
    pub async fn availability_version(&self, flight_id: Uuid) -> RedisResult<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let version: Option<i64> = conn.get(version_key(flight_id)).await?;
        Ok(version.unwrap_or(0))
    }

    /// Writes the counters only if no invalidation happened since `version`
    /// was read, so a slow seed cannot resurrect pre-commit numbers.
    pub async fn seed_flight_availability(
        &self,
        flight_id: Uuid,
        availability: Availability,
        version: i64,
        ttl_seconds: u64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let script = redis::Script::new(
            r#"
            local current = redis.call("GET", KEYS[2]) or "0"
            if current ~= ARGV[1] then
                return 0
            end
            redis.call("HSET", KEYS[1], unpack(ARGV, 3))
            redis.call("EXPIRE", KEYS[1], ARGV[2])
            return 1
        "#,
        );
        let mut invocation = script.key(availability_key(flight_id));
        invocation.key(version_key(flight_id)).arg(version).arg(ttl_seconds);
        for (field, count) in availability.fields() {
            invocation.arg(field).arg(count);
        }
        let written: i32 = invocation.invoke_async(&mut conn).await?;
        if written == 1 {
            debug!(%flight_id, seats = availability.available_seats, "Availability cached");
        } else {
            debug!(%flight_id, "Availability seed skipped, counters moved");
        }
        Ok(written == 1)
    }

    /// Drops the cached counters and bumps the version in one step.
    pub async fn invalidate_flight_availability(&self, flight_id: Uuid) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let version = version_key(flight_id);
        let _: () = redis::pipe()
            .atomic()
            .incr(&version, 1)
            .ignore()
            .expire(&version, VERSION_TTL_SECONDS)
            .ignore()
            .del(availability_key(flight_id))
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Fixed-window counter. Returns false once `limit` is exceeded in the window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}
