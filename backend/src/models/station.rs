use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::measurement::StoredMeasurement;
use crate::define_id_type;

define_id_type!(i64, StationId);

/// Geographic position of a station (WGS84 degrees).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// Sensor station registered with the service.
///
/// `token_id` is the opaque credential a feeder presents when posting
/// measurements. It never leaves the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: StationId,
    pub token_id: String,
    pub description: String,
    pub created: DateTime<Utc>,
    pub seen: Option<DateTime<Utc>>,
    pub version: Option<String>,
    pub is_public: bool,
    pub location: GeoPoint,
}

/// Station data needed to register a new station.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStation {
    pub token_id: String,
    pub description: String,
    pub is_public: bool,
    pub location: GeoPoint,
}

/// Fields refreshed every time a feeder reports in.
#[derive(Debug, Clone, PartialEq)]
pub struct StationUpdate {
    pub seen: DateTime<Utc>,
    /// Firmware version reported by the feeder; `None` clears the stored value.
    pub version: Option<String>,
}

/// A station together with its latest measurement inside the requested window.
#[derive(Debug, Clone, PartialEq)]
pub struct StationWithLastMeasurement {
    pub station: Station,
    pub last_measurement: Option<StoredMeasurement>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoundingBoxParseError {
    #[error("invalid bounding box: [{0}]")]
    TooFewValues(String),
    #[error("invalid bounding box [{bbox}] value: {value}")]
    InvalidValue { bbox: String, value: String },
}

/// Axis-aligned bounding box `[min_lon, min_lat, max_lon, max_lat]`, edges included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Parse a comma-delimited box such as `"44.43,48.65,44.53,48.7"`.
    ///
    /// An empty string means no box. Values past the fourth are ignored.
    pub fn parse(s: &str) -> Result<Option<Self>, BoundingBoxParseError> {
        if s.trim().is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() < 4 {
            return Err(BoundingBoxParseError::TooFewValues(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(parts.iter()) {
            *slot = part
                .trim()
                .parse()
                .map_err(|_| BoundingBoxParseError::InvalidValue {
                    bbox: s.to_string(),
                    value: part.to_string(),
                })?;
        }

        Ok(Some(Self::new(values[0], values[1], values[2], values[3])))
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.longitude >= self.min_lon
            && point.longitude <= self.max_lon
            && point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
    }
}
