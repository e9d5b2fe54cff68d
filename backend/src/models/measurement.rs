use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::station::StationId;
use super::time::unix_seconds;
use crate::define_id_type;

define_id_type!(i64, MeasurementId);

/// A single reading as sent by a feeder. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    #[serde(default, with = "unix_seconds::option")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub humidity: Option<f32>,
    #[serde(default)]
    pub pressure: Option<f32>,
    #[serde(default)]
    pub pm25: Option<f32>,
    #[serde(default)]
    pub pm10: Option<f32>,
    #[serde(default)]
    pub aqi: Option<i32>,
}

/// A reading that passed normalization: the timestamp is always set and the
/// AQI is filled in whenever both PM values were reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(with = "unix_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm25: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm10: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aqi: Option<i32>,
}

impl Measurement {
    /// Blank every variable not listed in `vars`. An empty list keeps everything.
    pub fn retain_variables(&mut self, vars: &[MeasurementVariable]) {
        if vars.is_empty() {
            return;
        }
        let keep = |v: MeasurementVariable| vars.contains(&v);
        if !keep(MeasurementVariable::Temperature) {
            self.temperature = None;
        }
        if !keep(MeasurementVariable::Humidity) {
            self.humidity = None;
        }
        if !keep(MeasurementVariable::Pressure) {
            self.pressure = None;
        }
        if !keep(MeasurementVariable::Pm25) {
            self.pm25 = None;
        }
        if !keep(MeasurementVariable::Pm10) {
            self.pm10 = None;
        }
        if !keep(MeasurementVariable::Aqi) {
            self.aqi = None;
        }
    }
}

/// A persisted measurement row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMeasurement {
    pub id: MeasurementId,
    pub station_id: StationId,
    pub measurement: Measurement,
}

/// Measurement variables a series query can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementVariable {
    Temperature,
    Humidity,
    Pressure,
    Pm25,
    Pm10,
    Aqi,
}

impl MeasurementVariable {
    pub const ALL: [MeasurementVariable; 6] = [
        Self::Temperature,
        Self::Humidity,
        Self::Pressure,
        Self::Pm25,
        Self::Pm10,
        Self::Aqi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Pressure => "pressure",
            Self::Pm25 => "pm25",
            Self::Pm10 => "pm10",
            Self::Aqi => "aqi",
        }
    }

    /// Parse a comma-separated variable list. Empty input yields an empty list.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, UnknownVariable> {
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut vars = Vec::new();
        for part in s.split(',') {
            let var: Self = part.parse()?;
            if !vars.contains(&var) {
                vars.push(var);
            }
        }
        Ok(vars)
    }
}

impl fmt::Display for MeasurementVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown measurement variable: {0}")]
pub struct UnknownVariable(pub String);

impl FromStr for MeasurementVariable {
    type Err = UnknownVariable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == name)
            .ok_or_else(|| UnknownVariable(s.trim().to_string()))
    }
}
