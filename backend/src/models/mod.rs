//! Domain types shared by the ingestion pipeline, the repositories and the HTTP layer.

pub mod macros;
pub mod measurement;
pub mod station;
pub mod time;

pub use measurement::*;
pub use station::*;
pub use time::*;
