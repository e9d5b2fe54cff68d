use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{measurements, stations};
use crate::models::{
    GeoPoint, Measurement, MeasurementId, NewStation, Station, StationId, StoredMeasurement,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = stations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StationRow {
    pub id: i64,
    pub token_id: String,
    pub description: String,
    pub created: DateTime<Utc>,
    pub seen: Option<DateTime<Utc>>,
    pub version: Option<String>,
    pub is_public: bool,
    pub longitude: f64,
    pub latitude: f64,
}

impl From<StationRow> for Station {
    fn from(row: StationRow) -> Self {
        Station {
            id: StationId(row.id),
            token_id: row.token_id,
            description: row.description,
            created: row.created,
            seen: row.seen,
            version: row.version,
            is_public: row.is_public,
            location: GeoPoint::new(row.longitude, row.latitude),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = stations)]
pub struct NewStationRow {
    pub token_id: String,
    pub description: String,
    pub is_public: bool,
    pub longitude: f64,
    pub latitude: f64,
}

impl From<&NewStation> for NewStationRow {
    fn from(s: &NewStation) -> Self {
        Self {
            token_id: s.token_id.clone(),
            description: s.description.clone(),
            is_public: s.is_public,
            longitude: s.location.longitude,
            latitude: s.location.latitude,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = measurements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MeasurementRow {
    pub id: i64,
    pub station_id: i64,
    pub tstamp: DateTime<Utc>,
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub pressure: Option<f32>,
    pub pm25: Option<f32>,
    pub pm10: Option<f32>,
    pub aqi: Option<i32>,
}

impl From<MeasurementRow> for StoredMeasurement {
    fn from(row: MeasurementRow) -> Self {
        StoredMeasurement {
            id: MeasurementId(row.id),
            station_id: StationId(row.station_id),
            measurement: Measurement {
                timestamp: row.tstamp,
                temperature: row.temperature,
                humidity: row.humidity,
                pressure: row.pressure,
                pm25: row.pm25,
                pm10: row.pm10,
                aqi: row.aqi,
            },
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = measurements)]
pub struct NewMeasurementRow {
    pub station_id: i64,
    pub tstamp: DateTime<Utc>,
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub pressure: Option<f32>,
    pub pm25: Option<f32>,
    pub pm10: Option<f32>,
    pub aqi: Option<i32>,
}

impl NewMeasurementRow {
    pub fn new(station_id: StationId, m: &Measurement) -> Self {
        Self {
            station_id: station_id.value(),
            tstamp: m.timestamp,
            temperature: m.temperature,
            humidity: m.humidity,
            pressure: m.pressure,
            pm25: m.pm25,
            pm10: m.pm10,
            aqi: m.aqi,
        }
    }
}
