//! Air Quality Index computation.
//!
//! Implements the US EPA piecewise-linear breakpoint method for particulate
//! matter. Each pollutant yields its own sub-index; the reported AQI is the
//! larger of the two.
//!
//! Arithmetic is done in single precision so that values sitting exactly on a
//! breakpoint (for instance 12.1 µg/m³ PM2.5) truncate onto the breakpoint and
//! not just below it.

/// AQI value at the lower edge of each bucket. The last entry is the ceiling.
static AQI_BREAKPOINTS: [f32; 8] = [0.0, 51.0, 101.0, 151.0, 201.0, 301.0, 401.0, 500.0];

/// Lowest possible index.
pub const AQI_MIN: i32 = 0;
/// Highest possible index.
pub const AQI_MAX: i32 = 500;

/// Concentration breakpoints of a single pollutant.
#[derive(Debug)]
pub struct BreakpointTable {
    /// Lower concentration edge of each bucket, µg/m³.
    pub concentrations: [f32; 8],
    /// Reporting resolution; concentrations are truncated down to a multiple of it.
    pub resolution: f32,
}

/// PM2.5 breakpoints, reported to 0.1 µg/m³.
pub static PM25_BREAKPOINTS: BreakpointTable = BreakpointTable {
    concentrations: [0.0, 12.1, 35.5, 55.5, 150.5, 250.5, 350.5, 500.0],
    resolution: 0.1,
};

/// PM10 breakpoints, reported to 1 µg/m³.
pub static PM10_BREAKPOINTS: BreakpointTable = BreakpointTable {
    concentrations: [0.0, 55.0, 155.0, 255.0, 355.0, 425.0, 505.0, 605.0],
    resolution: 1.0,
};

impl BreakpointTable {
    /// Index of the bucket holding `c`. Concentrations past the last edge land
    /// in the last bucket.
    fn bucket(&self, c: f32) -> usize {
        let last = self.concentrations.len() - 2;
        self.concentrations
            .windows(2)
            .position(|edge| edge[0] <= c && c < edge[1])
            .unwrap_or(last)
    }

    /// Sub-index for one pollutant. `concentration` must be non-negative.
    pub fn sub_index(&self, concentration: f32) -> i32 {
        let q = self.resolution;
        let c = (concentration / q).floor() * q;
        let bucket = self.bucket(c);

        let bp_lo = self.concentrations[bucket];
        let bp_hi = self.concentrations[bucket + 1] - q;
        let aqi_lo = AQI_BREAKPOINTS[bucket];
        let aqi_hi = AQI_BREAKPOINTS[bucket + 1] - 1.0;

        let value = interpolate(c, bp_lo, bp_hi, aqi_lo, aqi_hi)
            .clamp(AQI_MIN as f32, AQI_MAX as f32);
        // f32::round rounds half away from zero.
        value.round() as i32
    }
}

fn interpolate(value: f32, from_lo: f32, from_hi: f32, to_lo: f32, to_hi: f32) -> f32 {
    ((value - from_lo) / (from_hi - from_lo)) * (to_hi - to_lo) + to_lo
}

/// Errors raised by the AQI calculator.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum AqiError {
    #[error("invalid PM reading: pm2.5={pm25}, pm10={pm10}")]
    InvalidReading { pm25: f32, pm10: f32 },
}

/// A pair of particulate matter concentrations, µg/m³.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PmReading {
    pub pm25: f32,
    pub pm10: f32,
}

impl PmReading {
    pub fn new(pm25: f32, pm10: f32) -> Self {
        Self { pm25, pm10 }
    }

    /// True when both concentrations are non-negative. NaN is not valid.
    pub fn is_valid(&self) -> bool {
        self.pm25 >= 0.0 && self.pm10 >= 0.0
    }

    /// Combined AQI: the worse of the PM2.5 and PM10 sub-indices.
    pub fn aqi(&self) -> Result<i32, AqiError> {
        if !self.is_valid() {
            return Err(AqiError::InvalidReading {
                pm25: self.pm25,
                pm10: self.pm10,
            });
        }
        let pm25 = PM25_BREAKPOINTS.sub_index(self.pm25);
        let pm10 = PM10_BREAKPOINTS.sub_index(self.pm10);
        Ok(pm25.max(pm10))
    }
}

/// Whether `(pm25, pm10)` may be handed to [`compute_aqi`].
pub fn valid(pm25: f32, pm10: f32) -> bool {
    PmReading::new(pm25, pm10).is_valid()
}

/// Compute the AQI for a PM2.5/PM10 pair. Negative input is rejected.
pub fn compute_aqi(pm25: f32, pm10: f32) -> Result<i32, AqiError> {
    PmReading::new(pm25, pm10).aqi()
}

#[cfg(test)]
#[path = "aqi_tests.rs"]
mod aqi_tests;
