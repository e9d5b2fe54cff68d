//! Query string parameters and auxiliary response bodies.
//!
//! Parameters arrive as raw strings so that malformed values surface as a
//! [`ParseError`] in the response envelope instead of an extractor rejection.

use serde::{Deserialize, Serialize};

use crate::db::repository::StationQuery;
use crate::models::{
    parse_duration, parse_unix_time, BoundingBox, BoundingBoxParseError, MeasurementVariable,
    StationId, TimeParseError, TimeRange, UnknownVariable,
};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("'{0}' parameter not set")]
    Missing(&'static str),

    #[error("can't parse station id: {0}")]
    InvalidStation(String),

    #[error(transparent)]
    BoundingBox(#[from] BoundingBoxParseError),

    #[error(transparent)]
    Time(#[from] TimeParseError),

    #[error(transparent)]
    Variable(#[from] UnknownVariable),
}

/// `GET /v1/stations?bbox=&mlast=&mfrom=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationsParams {
    /// `min_lon,min_lat,max_lon,max_lat`
    pub bbox: Option<String>,
    /// Recency window for the last measurement, e.g. `15m`.
    pub mlast: Option<String>,
    /// Upper bound of the last measurement, Unix seconds.
    pub mfrom: Option<String>,
}

impl StationsParams {
    pub fn to_query(&self) -> Result<StationQuery, ParseError> {
        Ok(StationQuery {
            bbox: BoundingBox::parse(self.bbox.as_deref().unwrap_or(""))?,
            measured_before: parse_unix_time(self.mfrom.as_deref().unwrap_or(""))?,
            last_window: parse_duration(self.mlast.as_deref().unwrap_or(""))?,
            include_private: false,
        })
    }
}

/// `GET /v1/measurements?station=&from=&to=&v=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasurementsParams {
    pub station: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Comma-separated variable names; empty means all.
    pub v: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementsRequest {
    pub station_id: StationId,
    pub range: TimeRange,
    pub variables: Vec<MeasurementVariable>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl MeasurementsParams {
    pub fn to_request(&self) -> Result<MeasurementsRequest, ParseError> {
        let station = non_empty(&self.station).ok_or(ParseError::Missing("station"))?;
        let station_id = station
            .parse::<StationId>()
            .map_err(|e| ParseError::InvalidStation(e.to_string()))?;

        let from = parse_unix_time(self.from.as_deref().unwrap_or(""))?
            .ok_or(ParseError::Missing("from"))?;
        let to = parse_unix_time(self.to.as_deref().unwrap_or(""))?
            .ok_or(ParseError::Missing("to"))?;

        let variables = match non_empty(&self.v) {
            Some(v) => MeasurementVariable::parse_list(v)?,
            None => Vec::new(),
        };

        Ok(MeasurementsRequest {
            station_id,
            range: TimeRange::new(from, to),
            variables,
        })
    }
}

/// `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub repository: String,
}
