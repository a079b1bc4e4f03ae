use anyhow::Context;
use skyway_api::{app, AppState, AuthConfig};
use skyway_booking::BookingEngine;
use skyway_catalog::CatalogService;
use skyway_core::events::EventPublisher;
use skyway_store::{
    Config, DbClient, LogPublisher, PgBookingStore, PgCatalogRepository, PgFlightRepository,
    RedisClient,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyway_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Skyway API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let catalog_repo = Arc::new(PgCatalogRepository::new(db.pool.clone()));
    let flight_repo = Arc::new(PgFlightRepository::new(db.pool.clone()));
    let booking_store = Arc::new(PgBookingStore::new(db.pool.clone()));

    // Redis, optional
    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url)
                .await
                .context("Failed to connect to Redis")?,
        )),
        None => {
            tracing::warn!("No Redis configured: availability cache and rate limiting disabled");
            None
        }
    };

    let events = event_publisher(&config)?;

    let catalog = CatalogService::new(catalog_repo.clone(), flight_repo.clone());
    let bookings = BookingEngine::new(catalog_repo, flight_repo, booking_store, events)
        .with_reference_attempts(config.booking.reference_attempts);

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
    };
    let state = AppState::new(catalog, bookings, auth, config.booking.clone())
        .context("Failed to register metrics")?
        .with_redis(redis);

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

fn event_publisher(config: &Config) -> anyhow::Result<Arc<dyn EventPublisher>> {
    #[cfg(feature = "kafka")]
    {
        if let Some(kafka) = &config.kafka {
            let producer = skyway_store::KafkaPublisher::new(&kafka.brokers)
                .context("Failed to create Kafka producer")?;
            return Ok(Arc::new(producer));
        }
    }

    if config.kafka.is_some() {
        tracing::warn!("Kafka configured but the `kafka` feature is off; events go to the log");
    }
    Ok(Arc::new(LogPublisher))
}
