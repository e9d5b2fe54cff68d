//! Server command line.
//!
//! Repository selection, in priority order:
//! 1. `--config <repository.toml>`
//! 2. `--db-host` and the other `--db-*` flags (Postgres)
//! 3. `REPOSITORY_TYPE` / `DATABASE_URL` / `PG_*` environment variables

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::db::{RepositoryBuilder, RepositoryError};
use crate::models::parse_duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "openair-server", about = "OpenAir API server", version)]
pub struct ServerArgs {
    /// HTTP server host
    #[arg(short = 's', long, default_value = "localhost")]
    pub http_host: String,

    /// HTTP server port
    #[arg(short = 'p', long, default_value_t = 8081)]
    pub http_port: u16,

    /// Graceful shutdown timeout, e.g. `15s` or `1m`
    #[arg(short = 'T', long, default_value = "15s", value_parser = parse_timeout)]
    pub graceful_timeout: Duration,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Repository configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Database server host; selects the Postgres repository
    #[arg(short = 'H', long)]
    pub db_host: Option<String>,

    /// Database server port
    #[arg(short = 'P', long, default_value_t = 5432)]
    pub db_port: u16,

    /// Database user name
    #[arg(short = 'U', long, default_value = "openair")]
    pub db_user: String,

    /// Database user password
    #[arg(short = 'W', long = "db-pass", default_value = "openair", hide_default_value = true)]
    pub db_password: String,

    /// Database name to connect to
    #[arg(short = 'D', long, default_value = "openair")]
    pub db_name: String,

    /// Maximum number of pooled connections (0 for the pool default)
    #[arg(short = 'M', long, default_value_t = 0)]
    pub db_max_conn: u32,
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    // Plain integers are seconds.
    if let Ok(secs) = s.trim().parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    parse_duration(s)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "timeout must not be empty".to_string())?
        .to_std()
        .map_err(|_| "timeout must not be negative".to_string())
}

impl ServerArgs {
    /// Resolve `--http-host`/`--http-port` to a socket address.
    pub async fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        tokio::net::lookup_host((self.http_host.as_str(), self.http_port))
            .await?
            .next()
            .ok_or_else(|| anyhow::anyhow!("can't resolve HTTP host {}", self.http_host))
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// Postgres URL assembled from the `--db-*` flags, if `--db-host` is set.
    pub fn database_url(&self) -> Option<String> {
        self.db_host.as_ref().map(|host| {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                self.db_user, self.db_password, host, self.db_port, self.db_name
            )
        })
    }

    pub fn repository_builder(&self) -> Result<RepositoryBuilder, RepositoryError> {
        if let Some(path) = &self.config {
            return RepositoryBuilder::new().from_config_file(path);
        }
        match self.database_url() {
            Some(url) => self.postgres_builder(url),
            None => RepositoryBuilder::new().from_env(),
        }
    }

    #[cfg(feature = "postgres-repo")]
    fn postgres_builder(&self, url: String) -> Result<RepositoryBuilder, RepositoryError> {
        let mut config = crate::db::PostgresConfig::with_url(url);
        if self.db_max_conn > 0 {
            config.max_pool_size = self.db_max_conn;
            config.min_pool_size = config.min_pool_size.min(self.db_max_conn);
        }
        Ok(RepositoryBuilder::new()
            .repository_type(crate::db::RepositoryType::Postgres)
            .postgres_config(config))
    }

    #[cfg(not(feature = "postgres-repo"))]
    fn postgres_builder(&self, _url: String) -> Result<RepositoryBuilder, RepositoryError> {
        Err(RepositoryError::configuration(
            "--db-host requires the postgres-repo feature",
        ))
    }
}
