//! In-memory local repository implementation.
//!
//! Suitable for unit testing and local development. Stations live in a
//! `BTreeMap` keyed by id and every station's measurements in a `BTreeMap`
//! keyed by timestamp, which gives the (`station_id`, `timestamp`) uniqueness
//! key and chronological ordering for free.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::db::repository::*;
use crate::models::*;

/// In-memory local repository.
///
/// # Example
/// ```
/// use openair_api::db::repositories::LocalRepository;
/// use openair_api::db::repository::StationRepository;
/// use openair_api::models::{GeoPoint, NewStation};
///
/// # tokio_test_block(async {
/// let repo = LocalRepository::new();
/// let station = repo
///     .create_station(&NewStation {
///         token_id: "token".to_string(),
///         description: "roof".to_string(),
///         is_public: true,
///         location: GeoPoint::new(44.5, 48.7),
///     })
///     .await
///     .unwrap();
/// assert_eq!(repo.station_by_token("token").await.unwrap().id, station.id);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    stations: BTreeMap<StationId, Station>,
    measurements: HashMap<StationId, BTreeMap<DateTime<Utc>, StoredMeasurement>>,

    // ID counters
    next_station_id: i64,
    next_measurement_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            stations: BTreeMap::new(),
            measurements: HashMap::new(),
            next_station_id: 1,
            next_measurement_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Get the number of stations stored.
    pub fn station_count(&self) -> usize {
        self.data.read().stations.len()
    }

    /// Get the number of measurements stored across all stations.
    pub fn measurement_count(&self) -> usize {
        self.data.read().measurements.values().map(BTreeMap::len).sum()
    }

    fn ensure_healthy(data: &LocalData, operation: &str) -> RepositoryResult<()> {
        if data.is_healthy {
            Ok(())
        } else {
            Err(RepositoryError::connection_with_context(
                "local repository marked unhealthy",
                ErrorContext::new(operation),
            ))
        }
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StationRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn create_station(&self, station: &NewStation) -> RepositoryResult<Station> {
        let mut data = self.data.write();
        Self::ensure_healthy(&data, "create_station")?;

        if data.stations.values().any(|s| s.token_id == station.token_id) {
            return Err(RepositoryError::validation(format!(
                "station token already registered: {}",
                station.token_id
            )));
        }

        let id = StationId(data.next_station_id);
        data.next_station_id += 1;

        let created = Station {
            id,
            token_id: station.token_id.clone(),
            description: station.description.clone(),
            created: Utc::now(),
            seen: None,
            version: None,
            is_public: station.is_public,
            location: station.location,
        };
        data.stations.insert(id, created.clone());
        Ok(created)
    }

    async fn station_by_token(&self, token_id: &str) -> RepositoryResult<Station> {
        let data = self.data.read();
        Self::ensure_healthy(&data, "station_by_token")?;

        data.stations
            .values()
            .find(|s| s.token_id == token_id)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("no station with token id [{}]", token_id),
                    ErrorContext::new("station_by_token").with_entity("station"),
                )
            })
    }

    async fn station(&self, id: StationId) -> RepositoryResult<Station> {
        let data = self.data.read();
        Self::ensure_healthy(&data, "station")?;

        data.stations.get(&id).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("station {} not found", id),
                ErrorContext::new("station")
                    .with_entity("station")
                    .with_entity_id(id),
            )
        })
    }

    async fn update_station(&self, id: StationId, update: &StationUpdate) -> RepositoryResult<()> {
        let mut data = self.data.write();
        Self::ensure_healthy(&data, "update_station")?;

        let station = data.stations.get_mut(&id).ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("station {} not found", id),
                ErrorContext::new("update_station")
                    .with_entity("station")
                    .with_entity_id(id),
            )
        })?;

        station.seen = Some(update.seen);
        station.version = update.version.clone();
        Ok(())
    }

    async fn stations(
        &self,
        query: &StationQuery,
    ) -> RepositoryResult<Vec<StationWithLastMeasurement>> {
        let data = self.data.read();
        Self::ensure_healthy(&data, "stations")?;

        let now = Utc::now();
        let result = data
            .stations
            .values()
            .filter(|s| query.accepts_station(s))
            .map(|s| {
                let last_measurement = data.measurements.get(&s.id).and_then(|series| {
                    series
                        .values()
                        .rev()
                        .find(|m| query.accepts_timestamp(m.measurement.timestamp, now))
                        .cloned()
                });
                StationWithLastMeasurement {
                    station: s.clone(),
                    last_measurement,
                }
            })
            .collect();

        Ok(result)
    }
}

#[async_trait]
impl MeasurementRepository for LocalRepository {
    async fn add_measurements(
        &self,
        station_id: StationId,
        measurements: &[Measurement],
    ) -> RepositoryResult<usize> {
        let mut data = self.data.write();
        Self::ensure_healthy(&data, "add_measurements")?;

        if !data.stations.contains_key(&station_id) {
            return Err(RepositoryError::not_found_with_context(
                format!("station {} not found", station_id),
                ErrorContext::new("add_measurements")
                    .with_entity("station")
                    .with_entity_id(station_id),
            ));
        }

        let mut next_id = data.next_measurement_id;
        let series = data.measurements.entry(station_id).or_default();
        let mut inserted = 0;
        for m in measurements {
            if series.contains_key(&m.timestamp) {
                continue;
            }
            series.insert(
                m.timestamp,
                StoredMeasurement {
                    id: MeasurementId(next_id),
                    station_id,
                    measurement: m.clone(),
                },
            );
            next_id += 1;
            inserted += 1;
        }
        data.next_measurement_id = next_id;

        Ok(inserted)
    }

    async fn measurements(
        &self,
        station_id: StationId,
        range: TimeRange,
        vars: &[MeasurementVariable],
    ) -> RepositoryResult<Vec<StoredMeasurement>> {
        let data = self.data.read();
        Self::ensure_healthy(&data, "measurements")?;

        let Some(series) = data.measurements.get(&station_id) else {
            return Ok(Vec::new());
        };

        let result = series
            .range(range.from..=range.to)
            .map(|(_, stored)| {
                let mut stored = stored.clone();
                stored.measurement.retain_variables(vars);
                stored
            })
            .collect();

        Ok(result)
    }

    async fn count_measurements(&self, station_id: StationId) -> RepositoryResult<usize> {
        let data = self.data.read();
        Self::ensure_healthy(&data, "count_measurements")?;
        Ok(data.measurements.get(&station_id).map_or(0, BTreeMap::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn measurement(secs: i64, pm25: f32) -> Measurement {
        Measurement {
            timestamp: ts(secs),
            temperature: Some(20.0),
            humidity: None,
            pressure: None,
            pm25: Some(pm25),
            pm10: Some(pm25 * 2.0),
            aqi: None,
        }
    }

    async fn station(repo: &LocalRepository, token: &str, public: bool, lon: f64) -> Station {
        repo.create_station(&NewStation {
            token_id: token.to_string(),
            description: format!("station {}", token),
            is_public: public,
            location: GeoPoint::new(lon, 48.0),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_lookup_station() {
        let repo = LocalRepository::new();
        let s = station(&repo, "abc", true, 44.0).await;

        assert_eq!(s.id, StationId(1));
        assert_eq!(repo.station_by_token("abc").await.unwrap(), s);
        assert_eq!(repo.station(s.id).await.unwrap(), s);
        assert!(repo.station_by_token("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_token_rejected() {
        let repo = LocalRepository::new();
        station(&repo, "abc", true, 44.0).await;
        let err = repo
            .create_station(&NewStation {
                token_id: "abc".to_string(),
                description: String::new(),
                is_public: false,
                location: GeoPoint::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_add_measurements_is_idempotent() {
        let repo = LocalRepository::new();
        let s = station(&repo, "abc", true, 44.0).await;
        let batch = vec![measurement(100, 1.0), measurement(200, 2.0)];

        assert_eq!(repo.add_measurements(s.id, &batch).await.unwrap(), 2);
        assert_eq!(repo.add_measurements(s.id, &batch).await.unwrap(), 0);
        assert_eq!(repo.count_measurements(s.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_key_keeps_first_row() {
        let repo = LocalRepository::new();
        let s = station(&repo, "abc", true, 44.0).await;

        repo.add_measurements(s.id, &[measurement(100, 1.0)]).await.unwrap();
        repo.add_measurements(s.id, &[measurement(100, 9.0)]).await.unwrap();

        let stored = repo
            .measurements(s.id, TimeRange::new(ts(0), ts(1_000)), &[])
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].measurement.pm25, Some(1.0));
    }

    #[tokio::test]
    async fn test_add_measurements_unknown_station() {
        let repo = LocalRepository::new();
        let err = repo
            .add_measurements(StationId(99), &[measurement(1, 1.0)])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_measurements_range_and_vars() {
        let repo = LocalRepository::new();
        let s = station(&repo, "abc", true, 44.0).await;
        let batch = vec![
            measurement(300, 3.0),
            measurement(100, 1.0),
            measurement(200, 2.0),
            measurement(400, 4.0),
        ];
        repo.add_measurements(s.id, &batch).await.unwrap();

        let stored = repo
            .measurements(
                s.id,
                TimeRange::new(ts(300), ts(100)),
                &[MeasurementVariable::Pm25],
            )
            .await
            .unwrap();

        let stamps: Vec<_> = stored.iter().map(|m| m.measurement.timestamp).collect();
        assert_eq!(stamps, vec![ts(100), ts(200), ts(300)]);
        assert!(stored.iter().all(|m| m.measurement.temperature.is_none()));
        assert!(stored.iter().all(|m| m.measurement.pm10.is_none()));
        assert_eq!(stored[1].measurement.pm25, Some(2.0));
    }

    #[tokio::test]
    async fn test_stations_last_measurement_and_filters() {
        let repo = LocalRepository::new();
        let a = station(&repo, "a", true, 44.0).await;
        let b = station(&repo, "b", false, 44.0).await;
        let c = station(&repo, "c", true, 10.0).await;

        let now = Utc::now();
        let recent = now - Duration::seconds(60);
        let old = now - Duration::hours(2);
        repo.add_measurements(
            a.id,
            &[
                Measurement { timestamp: old, ..measurement(0, 1.0) },
                Measurement { timestamp: recent, ..measurement(0, 5.0) },
            ],
        )
        .await
        .unwrap();

        let all_public = repo.stations(&StationQuery::default()).await.unwrap();
        let ids: Vec<_> = all_public.iter().map(|s| s.station.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
        assert_eq!(
            all_public[0].last_measurement.as_ref().map(|m| m.measurement.timestamp),
            Some(recent)
        );
        assert!(all_public[1].last_measurement.is_none());

        let boxed = repo
            .stations(&StationQuery {
                bbox: Some(BoundingBox::new(40.0, 40.0, 50.0, 50.0)),
                include_private: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = boxed.iter().map(|s| s.station.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);

        let before_recent = repo
            .stations(&StationQuery {
                measured_before: Some(recent - Duration::seconds(1)),
                last_window: Some(Duration::hours(3)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            before_recent[0]
                .last_measurement
                .as_ref()
                .map(|m| m.measurement.timestamp),
            Some(old)
        );

        let narrow = repo
            .stations(&StationQuery {
                last_window: Some(Duration::seconds(1)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(narrow[0].last_measurement.is_none());
    }

    #[tokio::test]
    async fn test_update_station() {
        let repo = LocalRepository::new();
        let s = station(&repo, "abc", true, 44.0).await;
        let seen = ts(1_560_000_000);

        repo.update_station(
            s.id,
            &StationUpdate {
                seen,
                version: Some("1.2.0".to_string()),
            },
        )
        .await
        .unwrap();
        let updated = repo.station(s.id).await.unwrap();
        assert_eq!(updated.seen, Some(seen));
        assert_eq!(updated.version.as_deref(), Some("1.2.0"));

        repo.update_station(s.id, &StationUpdate { seen, version: None })
            .await
            .unwrap();
        assert_eq!(repo.station(s.id).await.unwrap().version, None);
    }

    #[tokio::test]
    async fn test_unhealthy_repository() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);

        assert!(!repo.health_check().await.unwrap());
        let err = repo.station_by_token("abc").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_clear() {
        let repo = LocalRepository::new();
        let s = station(&repo, "abc", true, 44.0).await;
        repo.add_measurements(s.id, &[measurement(1, 1.0)]).await.unwrap();

        repo.clear();

        assert_eq!(repo.station_count(), 0);
        assert_eq!(repo.measurement_count(), 0);
    }
}
