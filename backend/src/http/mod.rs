//! axum HTTP front end.
//!
//! ```text
//! GET  /health
//! POST /v1/feeder          feeder uploads
//! GET  /v1/stations        stations with their last measurement
//! GET  /v1/measurements    measurement series of one station
//! ```
//!
//! Responses are JSON envelopes (see [`crate::api`]). The layer only parses
//! input and maps errors; storage and ingestion live in `db` and `services`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::AppError;
pub use router::create_router;
pub use state::AppState;
