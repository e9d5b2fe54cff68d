//! JSON wire contract of the `/v1` API.
//!
//! Every response carries a [`ApiResult`] envelope, flattened into the
//! payload of the successful read endpoints. Timestamps are Unix seconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    unix_seconds, GeoPoint, Measurement, RawMeasurement, StationId, StationWithLastMeasurement,
    StoredMeasurement,
};

/// Upload sent by a station feeder to `POST /v1/feeder`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeederData {
    pub token_id: String,
    /// Feeder firmware version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub measurements: Vec<RawMeasurement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Ok,
    BadRequest,
    NotFound,
    ServerError,
}

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResult {
    pub fn ok() -> Self {
        Self {
            status: ResultStatus::Ok,
            message: None,
        }
    }

    pub fn error(status: ResultStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }
}

/// Station as exposed to API clients. The feeder token is never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiStation {
    pub id: StationId,
    pub description: String,
    pub location: GeoPoint,
    #[serde(
        default,
        with = "unix_seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_measurement: Option<Measurement>,
}

impl From<StationWithLastMeasurement> for ApiStation {
    fn from(s: StationWithLastMeasurement) -> Self {
        let StationWithLastMeasurement {
            station,
            last_measurement,
        } = s;
        Self {
            id: station.id,
            description: station.description,
            location: station.location,
            seen: station.seen,
            version: station.version,
            last_measurement: last_measurement.map(|m| m.measurement),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationsResult {
    #[serde(flatten)]
    pub result: ApiResult,
    pub stations: Vec<ApiStation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementsResult {
    #[serde(flatten)]
    pub result: ApiResult,
    pub measurements: Vec<Measurement>,
}

impl StationsResult {
    pub fn new(stations: Vec<StationWithLastMeasurement>) -> Self {
        Self {
            result: ApiResult::ok(),
            stations: stations.into_iter().map(ApiStation::from).collect(),
        }
    }
}

impl MeasurementsResult {
    pub fn new(measurements: Vec<StoredMeasurement>) -> Self {
        Self {
            result: ApiResult::ok(),
            measurements: measurements.into_iter().map(|m| m.measurement).collect(),
        }
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod api_tests;
