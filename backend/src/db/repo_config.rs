//! `repository.toml` support.
//!
//! ```toml
//! [repository]
//! type = "postgres"
//!
//! [postgres]
//! database_url = "postgres://openair@localhost/openair"
//! max_connections = 10
//! ```
//!
//! An empty or missing `postgres.database_url` falls back to `DATABASE_URL`
//! so credentials can stay out of the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::factory::RepositoryType;
use super::repository::RepositoryError;
use super::PostgresConfig;

/// Files probed by [`RepositoryConfig::from_default_location`], in order.
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "repository.toml",
    "backend/repository.toml",
    "/etc/openair/repository.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub repository: RepositorySettings,
    #[serde(default)]
    pub postgres: PostgresSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type")]
    pub repo_type: String,
}

/// Pool settings; every field is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresSettings {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: 30,
            idle_timeout: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl RepositoryConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RepositoryError::configuration(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, RepositoryError> {
        toml::from_str(content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse repository config: {}", e))
        })
    }

    /// Load the first file of [`DEFAULT_CONFIG_PATHS`] that exists.
    pub fn from_default_location() -> Result<Self, RepositoryError> {
        match DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
        {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading repository config");
                Self::from_file(path)
            }
            None => Err(RepositoryError::configuration(
                "No repository.toml found in standard locations",
            )),
        }
    }

    pub fn repository_type(&self) -> Result<RepositoryType, RepositoryError> {
        self.repository
            .repo_type
            .parse()
            .map_err(|e: String| RepositoryError::configuration(e))
    }

    #[cfg(feature = "postgres-repo")]
    fn database_url(&self) -> Option<String> {
        Some(self.postgres.database_url.trim().to_string())
            .filter(|url| !url.is_empty())
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .or_else(|| std::env::var("PG_DATABASE_URL").ok())
    }

    /// Postgres settings, or `None` when the file selects another backend.
    ///
    /// # Errors
    /// `ConfigurationError` for an unknown type, a Postgres backend without a
    /// database URL, or a Postgres backend in a build without `postgres-repo`.
    pub fn to_postgres_config(&self) -> Result<Option<PostgresConfig>, RepositoryError> {
        if self.repository_type()? != RepositoryType::Postgres {
            return Ok(None);
        }
        self.build_postgres_config().map(Some)
    }

    #[cfg(feature = "postgres-repo")]
    fn build_postgres_config(&self) -> Result<PostgresConfig, RepositoryError> {
        let database_url = self.database_url().ok_or_else(|| {
            RepositoryError::configuration(
                "Postgres repository requires 'postgres.database_url' or DATABASE_URL",
            )
        })?;

        Ok(PostgresConfig {
            database_url,
            max_pool_size: self.postgres.max_connections,
            min_pool_size: self.postgres.min_connections,
            connection_timeout_sec: self.postgres.connect_timeout,
            idle_timeout_sec: self.postgres.idle_timeout,
            max_retries: self.postgres.max_retries,
            retry_delay_ms: self.postgres.retry_delay_ms,
        })
    }

    #[cfg(not(feature = "postgres-repo"))]
    fn build_postgres_config(&self) -> Result<PostgresConfig, RepositoryError> {
        Err(RepositoryError::configuration(
            "Postgres repository feature not enabled",
        ))
    }
}
