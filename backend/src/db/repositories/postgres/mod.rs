//! Postgres repository implementation using Diesel.
//!
//! Stations and measurements live in two tables (see `migrations/`).
//! Measurements are unique per `(station_id, tstamp)`, which makes replayed
//! feeder uploads a no-op at the storage level.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::DatabaseErrorKind;
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::HashMap;
use std::time::Duration;
use tokio::task;

use crate::db::repository::{
    ErrorContext, MeasurementRepository, RepositoryError, RepositoryResult, StationQuery,
    StationRepository,
};
use crate::models::{
    Measurement, MeasurementVariable, NewStation, Station, StationId, StationUpdate,
    StationWithLastMeasurement, StoredMeasurement, TimeRange,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Rows per INSERT statement; keeps a batch well under the 65535 bind parameter cap.
const INSERT_CHUNK: usize = 1000;

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// Unparseable numeric values fall back to their defaults.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// # Errors
    /// `ConnectionError` if the pool cannot be built, `InternalError` if a
    /// migration fails.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        tracing::info!(
            max_pool_size = config.max_pool_size,
            "Postgres repository ready"
        );

        Ok(Self {
            pool,
            config,
        })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        for version in applied {
            tracing::info!(%version, "Applied migration");
        }
        Ok(())
    }

    /// Run `f` on a pooled connection inside `spawn_blocking`, retrying
    /// retryable failures with exponential backoff.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        if attempt < max_retries {
                            tracing::warn!(attempt = attempt + 1, error = %err, "Retrying");
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        tracing::warn!(attempt = attempt + 1, error = %e, "Retrying");
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn station_not_found(operation: &str, id: impl ToString) -> RepositoryError {
    RepositoryError::not_found_with_context(
        "Station not found",
        ErrorContext::new(operation)
            .with_entity("station")
            .with_entity_id(id),
    )
}

#[async_trait]
impl StationRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn create_station(&self, station: &NewStation) -> RepositoryResult<Station> {
        let row = NewStationRow::from(station);
        self.with_conn(move |conn| {
            diesel::insert_into(stations::table)
                .values(&row)
                .returning(StationRow::as_returning())
                .get_result::<StationRow>(conn)
                .map(Station::from)
                .map_err(|e| match e {
                    diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        RepositoryError::ValidationError {
                            message: "Station token already registered".to_string(),
                            context: ErrorContext::new("create_station").with_entity("station"),
                        }
                    }
                    other => map_diesel_error(other).with_operation("create_station"),
                })
        })
        .await
    }

    async fn station_by_token(&self, token_id: &str) -> RepositoryResult<Station> {
        let token_id = token_id.to_string();
        self.with_conn(move |conn| {
            stations::table
                .filter(stations::token_id.eq(&token_id))
                .select(StationRow::as_select())
                .first::<StationRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Station::from)
                .ok_or_else(|| {
                    RepositoryError::not_found_with_context(
                        "Unknown station token",
                        ErrorContext::new("station_by_token").with_entity("station"),
                    )
                })
        })
        .await
    }

    async fn station(&self, id: StationId) -> RepositoryResult<Station> {
        self.with_conn(move |conn| {
            stations::table
                .find(id.value())
                .select(StationRow::as_select())
                .first::<StationRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Station::from)
                .ok_or_else(|| station_not_found("station", id))
        })
        .await
    }

    async fn update_station(&self, id: StationId, update: &StationUpdate) -> RepositoryResult<()> {
        let update = update.clone();
        self.with_conn(move |conn| {
            let affected = diesel::update(stations::table.find(id.value()))
                .set((
                    stations::seen.eq(update.seen),
                    stations::version.eq(update.version),
                ))
                .execute(conn)
                .map_err(map_diesel_error)?;

            if affected == 0 {
                return Err(station_not_found("update_station", id));
            }
            Ok(())
        })
        .await
    }

    async fn stations(
        &self,
        query: &StationQuery,
    ) -> RepositoryResult<Vec<StationWithLastMeasurement>> {
        let query = query.clone();
        let (upper, lower) = query.window(Utc::now());

        self.with_conn(move |conn| {
            let mut select = stations::table
                .select(StationRow::as_select())
                .order(stations::id.asc())
                .into_boxed();
            if !query.include_private {
                select = select.filter(stations::is_public.eq(true));
            }
            if let Some(bbox) = query.bbox {
                select = select
                    .filter(stations::longitude.between(bbox.min_lon, bbox.max_lon))
                    .filter(stations::latitude.between(bbox.min_lat, bbox.max_lat));
            }
            let rows: Vec<StationRow> = select.load(conn).map_err(map_diesel_error)?;
            if rows.is_empty() {
                return Ok(Vec::new());
            }

            let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
            let mut last = measurements::table
                .filter(measurements::station_id.eq_any(&ids))
                .filter(measurements::tstamp.le(upper))
                .distinct_on(measurements::station_id)
                .order((measurements::station_id.asc(), measurements::tstamp.desc()))
                .select(MeasurementRow::as_select())
                .into_boxed();
            if let Some(lower) = lower {
                last = last.filter(measurements::tstamp.gt(lower));
            }
            let mut last_by_station: HashMap<i64, StoredMeasurement> = last
                .load::<MeasurementRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(|row| (row.station_id, StoredMeasurement::from(row)))
                .collect();

            Ok(rows
                .into_iter()
                .map(|row| StationWithLastMeasurement {
                    last_measurement: last_by_station.remove(&row.id),
                    station: Station::from(row),
                })
                .collect())
        })
        .await
    }
}

#[async_trait]
impl MeasurementRepository for PostgresRepository {
    async fn add_measurements(
        &self,
        station_id: StationId,
        batch: &[Measurement],
    ) -> RepositoryResult<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        let rows: Vec<NewMeasurementRow> = batch
            .iter()
            .map(|m| NewMeasurementRow::new(station_id, m))
            .collect();

        self.with_conn(move |conn| {
            conn.transaction::<usize, RepositoryError, _>(|tx| {
                let mut inserted = 0;
                for chunk in rows.chunks(INSERT_CHUNK) {
                    inserted += diesel::insert_into(measurements::table)
                        .values(chunk)
                        .on_conflict((measurements::station_id, measurements::tstamp))
                        .do_nothing()
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }
                Ok(inserted)
            })
            .map_err(|e| e.with_operation("add_measurements"))
        })
        .await
    }

    async fn measurements(
        &self,
        station_id: StationId,
        range: TimeRange,
        variables: &[MeasurementVariable],
    ) -> RepositoryResult<Vec<StoredMeasurement>> {
        let variables = variables.to_vec();
        self.with_conn(move |conn| {
            let rows: Vec<MeasurementRow> = measurements::table
                .filter(measurements::station_id.eq(station_id.value()))
                .filter(measurements::tstamp.between(range.from, range.to))
                .order(measurements::tstamp.asc())
                .select(MeasurementRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?;

            Ok(rows
                .into_iter()
                .map(|row| {
                    let mut stored = StoredMeasurement::from(row);
                    stored.measurement.retain_variables(&variables);
                    stored
                })
                .collect())
        })
        .await
    }

    async fn count_measurements(&self, station_id: StationId) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            measurements::table
                .filter(measurements::station_id.eq(station_id.value()))
                .count()
                .get_result::<i64>(conn)
                .map(|n| n as usize)
                .map_err(map_diesel_error)
        })
        .await
    }
}
