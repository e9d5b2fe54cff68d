//! Storage backends for the [`FullRepository`](crate::db::FullRepository) traits.
//!
//! - `local`: in-memory store for tests and development
//! - `postgres`: Diesel/r2d2 store (feature `postgres-repo`)
pub mod local;
#[cfg(feature = "postgres-repo")]
pub mod postgres;

pub use local::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use postgres::{PostgresConfig, PostgresRepository};
