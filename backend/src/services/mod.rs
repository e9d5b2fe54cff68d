//! Measurement processing.
//!
//! - [`aqi`]: EPA breakpoint AQI calculator
//! - [`normalizer`]: feeder batch normalization
//! - [`ingestion`]: end-to-end feeder upload pipeline

pub mod aqi;
pub mod ingestion;
pub mod normalizer;

pub use aqi::{compute_aqi, valid, AqiError, PmReading};
pub use ingestion::{ingest_feeder_data, IngestionReport};
pub use normalizer::normalize;
