//! Measurement storage operations.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Measurement, MeasurementVariable, StationId, StoredMeasurement, TimeRange};

/// Storage sink for normalized measurements.
///
/// (`station_id`, `timestamp`) is a uniqueness key: inserting a measurement
/// whose key already exists is silently ignored, so replaying a feeder batch
/// never creates duplicate rows and never fails.
#[async_trait]
pub trait MeasurementRepository: Send + Sync {
    /// Insert a batch for one station, skipping rows whose key already exists.
    ///
    /// # Returns
    /// The number of rows actually inserted.
    async fn add_measurements(
        &self,
        station_id: StationId,
        measurements: &[Measurement],
    ) -> RepositoryResult<usize>;

    /// Measurements of a station inside `range` (inclusive), oldest first.
    ///
    /// Only the listed variables are populated; an empty list returns all of them.
    /// The timestamp is always present.
    async fn measurements(
        &self,
        station_id: StationId,
        range: TimeRange,
        vars: &[MeasurementVariable],
    ) -> RepositoryResult<Vec<StoredMeasurement>>;

    /// Total number of stored measurements for a station.
    async fn count_measurements(&self, station_id: StationId) -> RepositoryResult<usize>;
}
