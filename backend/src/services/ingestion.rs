//! Feeder batch ingestion.
//!
//! `token → station → normalize → store → touch station`.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::api::FeederData;
use crate::db::repository::{FullRepository, RepositoryResult};
use crate::db::services;
use crate::models::StationId;
use crate::services::normalizer::normalize_at;

/// Outcome of one feeder upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionReport {
    pub station_id: StationId,
    /// Readings in the upload.
    pub received: usize,
    /// Readings left after normalization.
    pub accepted: usize,
    /// Rows actually written; replayed readings are not counted.
    pub inserted: usize,
}

pub async fn ingest_feeder_data(
    repo: &dyn FullRepository,
    data: FeederData,
) -> RepositoryResult<IngestionReport> {
    ingest_feeder_data_at(repo, data, Utc::now()).await
}

/// Ingest `data` with `now` as the arrival time.
///
/// # Errors
/// `NotFound` when no station owns `data.token_id`; storage errors as-is.
/// Nothing is written for an unknown token.
pub async fn ingest_feeder_data_at(
    repo: &dyn FullRepository,
    data: FeederData,
    now: DateTime<Utc>,
) -> RepositoryResult<IngestionReport> {
    let FeederData {
        token_id,
        version,
        measurements,
    } = data;

    let station = services::station_by_token(repo, &token_id).await?;
    let received = measurements.len();
    let normalized = normalize_at(station.id, measurements, now);
    let inserted = services::add_measurements(repo, station.id, &normalized).await?;
    services::touch_station(repo, station.id, now, version.as_deref()).await?;

    let report = IngestionReport {
        station_id: station.id,
        received,
        accepted: normalized.len(),
        inserted,
    };

    if inserted > 1 {
        info!(
            station = %station.id,
            received,
            inserted,
            "added {} measurements",
            inserted
        );
    } else {
        debug!(station = %station.id, received, inserted, "feeder upload");
    }

    Ok(report)
}

#[cfg(test)]
#[path = "ingestion_tests.rs"]
mod ingestion_tests;
