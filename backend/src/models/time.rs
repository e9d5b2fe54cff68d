//! Time helpers: Unix-second wire encoding, query time ranges and
//! parsing of the textual time parameters accepted by the API.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Errors produced while parsing time-related query parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("invalid unix time: [{0}]")]
    InvalidUnixTime(String),
    #[error("invalid duration: [{0}]")]
    InvalidDuration(String),
    #[error("missing unit in duration: [{0}]")]
    MissingUnit(String),
    #[error("unknown unit [{unit}] in duration: [{input}]")]
    UnknownUnit { unit: String, input: String },
}

/// Serde adapter encoding `DateTime<Utc>` as integral Unix seconds.
pub mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(dt.timestamp())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let secs = i64::deserialize(d)?;
        DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| de::Error::custom(format!("unix time out of range: {}", secs)))
    }

    /// Same encoding for optional timestamps; `null` and a missing field both map to `None`.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => s.serialize_some(&dt.timestamp()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<i64>::deserialize(d)? {
                Some(secs) => DateTime::from_timestamp(secs, 0)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("unix time out of range: {}", secs))),
                None => Ok(None),
            }
        }
    }
}

/// Closed time interval used by measurement series queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "unix_seconds")]
    pub from: DateTime<Utc>,
    #[serde(with = "unix_seconds")]
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range; reversed bounds are swapped so that `from <= to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        if from > to {
            Self { from: to, to: from }
        } else {
            Self { from, to }
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from <= ts && ts <= self.to
    }
}

/// Parse a Unix time given in whole seconds. An empty string means "not set".
pub fn parse_unix_time(s: &str) -> Result<Option<DateTime<Utc>>, TimeParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let secs: i64 = s
        .parse()
        .map_err(|_| TimeParseError::InvalidUnixTime(s.to_string()))?;
    DateTime::from_timestamp(secs, 0)
        .map(Some)
        .ok_or_else(|| TimeParseError::InvalidUnixTime(s.to_string()))
}

/// Parse a duration written as a sequence of decimal numbers with unit
/// suffixes, e.g. `300ms`, `1.5h` or `2h45m`. Valid units are `ns`, `us`
/// (or `µs`), `ms`, `s`, `m` and `h`. An empty string means "not set".
pub fn parse_duration(s: &str) -> Result<Option<Duration>, TimeParseError> {
    let input = s.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let (negative, mut rest) = match input.as_bytes()[0] {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(Some(Duration::zero()));
    }
    if rest.is_empty() {
        return Err(TimeParseError::InvalidDuration(input.to_string()));
    }

    let mut total_nanos: f64 = 0.0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_len];
        if number.is_empty() || number == "." {
            return Err(TimeParseError::InvalidDuration(input.to_string()));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| TimeParseError::InvalidDuration(input.to_string()))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let scale = match unit {
            "" => return Err(TimeParseError::MissingUnit(input.to_string())),
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            other => {
                return Err(TimeParseError::UnknownUnit {
                    unit: other.to_string(),
                    input: input.to_string(),
                })
            }
        };
        total_nanos += value * scale;
    }

    if total_nanos > i64::MAX as f64 {
        return Err(TimeParseError::InvalidDuration(input.to_string()));
    }
    let nanos = total_nanos.round() as i64;
    Ok(Some(Duration::nanoseconds(if negative { -nanos } else { nanos })))
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod time_tests;
