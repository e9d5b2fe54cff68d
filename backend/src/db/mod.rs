//! Station and measurement storage.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  HTTP handlers / ingestion pipeline           │
//! └───────────────────┬───────────────────────────┘
//!                     │
//! ┌───────────────────▼───────────────────────────┐
//! │  services.rs: business-level operations       │
//! └───────────────────┬───────────────────────────┘
//!                     │
//! ┌───────────────────▼───────────────────────────┐
//! │  repository/: StationRepository,              │
//! │  MeasurementRepository, RepositoryError       │
//! └───────────┬───────────────────────┬───────────┘
//!             │                       │
//!   ┌─────────▼─────────┐   ┌─────────▼─────────┐
//!   │  LocalRepository  │   │ PostgresRepository│
//!   │    (in-memory)    │   │  (Diesel + r2d2)  │
//!   └───────────────────┘   └───────────────────┘
//! ```
//!
//! Backends are chosen at startup by [`factory`] from `repository.toml`,
//! command line flags or the environment, then connected with
//! [`init_repository`].

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod services;

#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    ErrorContext, FullRepository, MeasurementRepository, RepositoryError, RepositoryResult,
    StationQuery, StationRepository,
};

use anyhow::{Context, Result};
use std::sync::Arc;

/// Connect the repository described by `builder`.
pub async fn init_repository(builder: RepositoryBuilder) -> Result<Arc<dyn FullRepository>> {
    let repo_type = builder.selected_type();
    builder
        .build()
        .await
        .with_context(|| format!("Failed to create {} repository", repo_type))
}
