//! Station storage operations.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::error::RepositoryResult;
use crate::models::{
    BoundingBox, NewStation, Station, StationId, StationUpdate, StationWithLastMeasurement,
};

/// Filter for station listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationQuery {
    /// Only stations located inside this box.
    pub bbox: Option<BoundingBox>,
    /// Upper bound for the last measurement; `None` means now.
    pub measured_before: Option<DateTime<Utc>>,
    /// Only measurements newer than `measured_before - last_window` count as "last".
    pub last_window: Option<Duration>,
    /// Include non-public stations.
    pub include_private: bool,
}

impl StationQuery {
    /// Resolve the measurement window against `now`.
    ///
    /// # Returns
    /// `(upper, lower)`: a measurement qualifies when `ts <= upper` and, if
    /// `lower` is set, `ts > lower`. A window reaching past the representable
    /// range leaves no lower bound.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
        let upper = self.measured_before.unwrap_or(now);
        let lower = self.last_window.and_then(|w| upper.checked_sub_signed(w));
        (upper, lower)
    }

    pub fn accepts_timestamp(&self, ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let (upper, lower) = self.window(now);
        ts <= upper && lower.map_or(true, |l| ts > l)
    }

    pub fn accepts_station(&self, station: &Station) -> bool {
        (self.include_private || station.is_public)
            && self.bbox.map_or(true, |b| b.contains(&station.location))
    }
}

#[async_trait]
pub trait StationRepository: Send + Sync {
    /// Check if the storage backend is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Register a station.
    ///
    /// # Errors
    /// `ValidationError` if another station already uses the same token.
    async fn create_station(&self, station: &NewStation) -> RepositoryResult<Station>;

    /// Find a station by its feeder token.
    ///
    /// # Errors
    /// `NotFound` if no station carries this token.
    async fn station_by_token(&self, token_id: &str) -> RepositoryResult<Station>;

    /// Find a station by id.
    async fn station(&self, id: StationId) -> RepositoryResult<Station>;

    /// Record that a station reported in.
    async fn update_station(&self, id: StationId, update: &StationUpdate) -> RepositoryResult<()>;

    /// Stations matching `query`, ordered by id, each with its latest
    /// measurement inside the query window.
    async fn stations(&self, query: &StationQuery)
        -> RepositoryResult<Vec<StationWithLastMeasurement>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;
    use chrono::TimeZone;

    fn station(is_public: bool, lon: f64, lat: f64) -> Station {
        Station {
            id: StationId(1),
            token_id: "t".to_string(),
            description: String::new(),
            created: Utc.timestamp_opt(0, 0).unwrap(),
            seen: None,
            version: None,
            is_public,
            location: GeoPoint::new(lon, lat),
        }
    }

    #[test]
    fn test_window_defaults_to_now() {
        let now = Utc.timestamp_opt(10_000, 0).unwrap();
        let query = StationQuery::default();
        assert_eq!(query.window(now), (now, None));
        assert!(query.accepts_timestamp(now, now));
        assert!(!query.accepts_timestamp(now + Duration::seconds(1), now));
    }

    #[test]
    fn test_window_lower_bound_is_exclusive() {
        let now = Utc.timestamp_opt(10_000, 0).unwrap();
        let query = StationQuery {
            last_window: Some(Duration::seconds(600)),
            ..Default::default()
        };
        assert!(query.accepts_timestamp(Utc.timestamp_opt(9_401, 0).unwrap(), now));
        assert!(!query.accepts_timestamp(Utc.timestamp_opt(9_400, 0).unwrap(), now));
    }

    #[test]
    fn test_window_relative_to_measured_before() {
        let now = Utc.timestamp_opt(10_000, 0).unwrap();
        let before = Utc.timestamp_opt(5_000, 0).unwrap();
        let query = StationQuery {
            measured_before: Some(before),
            last_window: Some(Duration::seconds(100)),
            ..Default::default()
        };
        assert_eq!(
            query.window(now),
            (before, Some(Utc.timestamp_opt(4_900, 0).unwrap()))
        );
    }

    #[test]
    fn test_window_at_min_time_has_no_lower_bound() {
        let now = Utc.timestamp_opt(10_000, 0).unwrap();
        let query = StationQuery {
            measured_before: Some(DateTime::<Utc>::MIN_UTC),
            last_window: Some(Duration::hours(1)),
            ..Default::default()
        };
        assert_eq!(query.window(now), (DateTime::<Utc>::MIN_UTC, None));
        assert!(query.accepts_timestamp(DateTime::<Utc>::MIN_UTC, now));
        assert!(!query.accepts_timestamp(now, now));
    }

    #[test]
    fn test_accepts_station() {
        let query = StationQuery {
            bbox: Some(BoundingBox::new(44.0, 48.0, 45.0, 49.0)),
            ..Default::default()
        };
        assert!(query.accepts_station(&station(true, 44.5, 48.5)));
        assert!(!query.accepts_station(&station(false, 44.5, 48.5)));
        assert!(!query.accepts_station(&station(true, 10.0, 48.5)));

        let all = StationQuery {
            include_private: true,
            ..Default::default()
        };
        assert!(all.accepts_station(&station(false, 10.0, 10.0)));
    }
}
