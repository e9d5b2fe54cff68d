//! Feeder batch normalization.
//!
//! Turns the raw readings of one feeder batch into measurements ready for
//! storage: fills in the missing timestamp of the most recent reading, drops
//! other readings without a timestamp and derives the AQI from the PM values
//! when the feeder did not send one.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::{Measurement, RawMeasurement, StationId};
use crate::services::aqi::PmReading;

/// Normalize a batch using the current wall-clock time.
pub fn normalize(station_id: StationId, batch: Vec<RawMeasurement>) -> Vec<Measurement> {
    normalize_at(station_id, batch, Utc::now())
}

/// Normalize a batch, stamping `now` on a trailing reading without timestamp.
///
/// Output order follows the input; readings are only ever dropped.
pub fn normalize_at(
    station_id: StationId,
    batch: Vec<RawMeasurement>,
    now: DateTime<Utc>,
) -> Vec<Measurement> {
    let last = batch.len().saturating_sub(1);
    let mut normalized = Vec::with_capacity(batch.len());

    for (i, raw) in batch.into_iter().enumerate() {
        let timestamp = match raw.timestamp {
            Some(ts) => ts,
            // Only the latest reading of a batch may omit its timestamp.
            None if i == last => now,
            None => {
                warn!(
                    station = %station_id,
                    index = i,
                    "skipped measurement without timestamp: {:?}",
                    raw
                );
                continue;
            }
        };

        let aqi = raw.aqi.or_else(|| derive_aqi(station_id, &raw));

        normalized.push(Measurement {
            timestamp,
            temperature: raw.temperature,
            humidity: raw.humidity,
            pressure: raw.pressure,
            pm25: raw.pm25,
            pm10: raw.pm10,
            aqi,
        });
    }

    normalized
}

fn derive_aqi(station_id: StationId, raw: &RawMeasurement) -> Option<i32> {
    let reading = PmReading::new(raw.pm25?, raw.pm10?);
    match reading.aqi() {
        Ok(aqi) => Some(aqi),
        Err(e) => {
            warn!(station = %station_id, "can't compute AQI: {}", e);
            None
        }
    }
}

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod normalizer_tests;
