use skyway_core::{BookingError, ConflictKind};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{error, info};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Maps driver errors onto the domain error. Unique violations become
/// conflicts and foreign-key violations mean the row is still referenced.
pub(crate) fn db_error(err: sqlx::Error) -> BookingError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23505") => {
                let what = db.constraint().unwrap_or("unique value").to_string();
                return BookingError::Conflict(ConflictKind::Duplicate(what));
            }
            Some("23503") => {
                return BookingError::InvalidState(format!(
                    "record is still referenced ({})",
                    db.constraint().unwrap_or("foreign key")
                ));
            }
            _ => {}
        }
    }
    error!("Database error: {}", err);
    BookingError::Storage(err.to_string())
}

/// Parses a status column into its enum, surfacing bad data as a storage error.
pub(crate) fn parse_column<T>(value: &str) -> Result<T, BookingError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| BookingError::Storage(format!("corrupt column value: {}", e)))
}
