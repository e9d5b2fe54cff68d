#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::api::FeederData;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{MeasurementRepository, StationRepository};
    use crate::models::{GeoPoint, NewStation, RawMeasurement, Station};
    use crate::services::ingestion::ingest_feeder_data_at;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    async fn setup() -> (LocalRepository, Station) {
        let repo = LocalRepository::new();
        let station = repo
            .create_station(&NewStation {
                token_id: "feeder-token".to_string(),
                description: "Garden".to_string(),
                is_public: true,
                location: GeoPoint::new(44.5, 48.7),
            })
            .await
            .unwrap();
        (repo, station)
    }

    fn upload(token: &str, version: Option<&str>, batch: Vec<RawMeasurement>) -> FeederData {
        FeederData {
            token_id: token.to_string(),
            version: version.map(str::to_string),
            measurements: batch,
        }
    }

    fn reading(timestamp: Option<DateTime<Utc>>) -> RawMeasurement {
        RawMeasurement {
            timestamp,
            pm25: Some(12.1),
            pm10: Some(55.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ingest_stores_normalized_batch() {
        let (repo, station) = setup().await;
        let now = ts(1_560_000_300);
        let batch = vec![reading(None), reading(Some(ts(1_560_000_100))), reading(None)];

        let report = ingest_feeder_data_at(&repo, upload("feeder-token", Some("0.5.0"), batch), now)
            .await
            .unwrap();

        assert_eq!(report.station_id, station.id);
        assert_eq!(report.received, 3);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.inserted, 2);

        let stored = repo.station(station.id).await.unwrap();
        assert_eq!(stored.seen, Some(now));
        assert_eq!(stored.version.as_deref(), Some("0.5.0"));
    }

    #[tokio::test]
    async fn test_replayed_batch_keeps_row_count() {
        let (repo, station) = setup().await;
        let batch = vec![
            reading(Some(ts(1_560_000_000))),
            reading(Some(ts(1_560_000_060))),
        ];

        let first = ingest_feeder_data_at(
            &repo,
            upload("feeder-token", None, batch.clone()),
            ts(1_560_000_100),
        )
        .await
        .unwrap();
        let second = ingest_feeder_data_at(
            &repo,
            upload("feeder-token", None, batch),
            ts(1_560_000_200),
        )
        .await
        .unwrap();

        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(repo.count_measurements(station.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unknown_token_writes_nothing() {
        let (repo, _) = setup().await;

        let err = ingest_feeder_data_at(
            &repo,
            upload("nope", None, vec![reading(Some(ts(1)))]),
            ts(2),
        )
        .await
        .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(repo.measurement_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_still_touches_station() {
        let (repo, station) = setup().await;
        let now = ts(1_560_000_000);

        let report = ingest_feeder_data_at(&repo, upload("feeder-token", Some(""), vec![]), now)
            .await
            .unwrap();

        assert_eq!(report.inserted, 0);
        let stored = repo.station(station.id).await.unwrap();
        assert_eq!(stored.seen, Some(now));
        assert_eq!(stored.version, None);
    }
}
