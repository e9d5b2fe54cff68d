//! # OpenAir API
//!
//! Air-quality telemetry backend. Station feeders upload batches of
//! particulate matter, temperature, humidity and pressure readings over HTTP;
//! the server normalizes them, derives an EPA Air Quality Index, stores them
//! idempotently and answers station and measurement-series queries.
//!
//! ## Architecture
//!
//! - [`models`]: stations, measurements, bounding boxes, time parsing
//! - [`services`]: AQI calculator, batch normalizer, ingestion pipeline
//! - [`db`]: repository traits, in-memory and Postgres backends, configuration
//! - [`api`]: JSON wire contract
//! - [`http`]: axum router and handlers (feature `http-server`)
//! - [`config`]: server command line (feature `http-server`)

// RepositoryError carries a rich ErrorContext.
#![allow(clippy::result_large_err)]

pub mod api;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod config;
#[cfg(feature = "http-server")]
pub mod http;
