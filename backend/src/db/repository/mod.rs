//! Repository trait definitions for database operations.
//!
//! Storage is split into two focused traits:
//!
//! - [`StationRepository`]: station lookup, registration and listing
//! - [`MeasurementRepository`]: idempotent measurement ingestion and series queries
//!
//! Functions that need both use the [`FullRepository`] bound:
//!
//! ```ignore
//! async fn ingest<R: FullRepository + ?Sized>(repo: &R, token: &str) -> RepositoryResult<()> {
//!     let station = repo.station_by_token(token).await?;
//!     repo.add_measurements(station.id, &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod measurement;
pub mod station;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use measurement::MeasurementRepository;
pub use station::{StationQuery, StationRepository};

/// Composite trait bound for a complete repository implementation.
pub trait FullRepository: StationRepository + MeasurementRepository {}

// Any type implementing both traits is a FullRepository
impl<T> FullRepository for T where T: StationRepository + MeasurementRepository {}
