//! Business-level storage operations.
//!
//! Thin functions over [`FullRepository`] used by the HTTP handlers and the
//! ingestion pipeline. They work with any backend.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::repository::{FullRepository, RepositoryError, RepositoryResult, StationQuery};
use crate::models::{
    Measurement, MeasurementVariable, NewStation, Station, StationId, StationUpdate,
    StationWithLastMeasurement, StoredMeasurement, TimeRange,
};

pub async fn health_check(repo: &dyn FullRepository) -> RepositoryResult<bool> {
    repo.health_check().await
}

/// Register a new station.
///
/// # Errors
/// `ValidationError` for an empty token or one already in use.
pub async fn register_station(
    repo: &dyn FullRepository,
    station: &NewStation,
) -> RepositoryResult<Station> {
    if station.token_id.trim().is_empty() {
        return Err(RepositoryError::validation("Station token must not be empty"));
    }
    let created = repo.create_station(station).await?;
    debug!(station = %created.id, "Registered station");
    Ok(created)
}

pub async fn station_by_token(
    repo: &dyn FullRepository,
    token_id: &str,
) -> RepositoryResult<Station> {
    repo.station_by_token(token_id).await
}

/// Record that a station reported at `seen`. A missing or empty `version`
/// clears the stored firmware version.
pub async fn touch_station(
    repo: &dyn FullRepository,
    station_id: StationId,
    seen: DateTime<Utc>,
    version: Option<&str>,
) -> RepositoryResult<()> {
    let update = StationUpdate {
        seen,
        version: version.filter(|v| !v.is_empty()).map(str::to_string),
    };
    repo.update_station(station_id, &update).await
}

pub async fn list_stations(
    repo: &dyn FullRepository,
    query: &StationQuery,
) -> RepositoryResult<Vec<StationWithLastMeasurement>> {
    repo.stations(query).await
}

/// Measurements of one station inside `range`.
///
/// # Errors
/// `NotFound` if the station does not exist.
pub async fn measurements(
    repo: &dyn FullRepository,
    station_id: StationId,
    range: TimeRange,
    variables: &[MeasurementVariable],
) -> RepositoryResult<Vec<StoredMeasurement>> {
    repo.station(station_id).await?;
    repo.measurements(station_id, range, variables).await
}

/// Persist a normalized batch; returns how many rows were new.
pub async fn add_measurements(
    repo: &dyn FullRepository,
    station_id: StationId,
    batch: &[Measurement],
) -> RepositoryResult<usize> {
    repo.add_measurements(station_id, batch).await
}

#[cfg(test)]
#[path = "services_tests.rs"]
mod services_tests;
