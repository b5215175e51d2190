//! Application configuration.
//!
//! Every setting can be supplied as a command line flag or through the
//! environment (a `.env` file is honoured by the binary).

use std::time::Duration;

use clap::{Args, ValueEnum};

/// Database settings.
#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Maximum number of pooled connections
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection before giving up
    #[arg(long, env = "DATABASE_ACQUIRE_TIMEOUT_SECONDS", default_value_t = 5)]
    pub acquire_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// Connection acquisition timeout.
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Cart ledger settings.
#[derive(Debug, Clone, Copy, Args)]
pub struct CartConfig {
    /// Attempts allowed when a concurrent add races the merge for the same line
    #[arg(long, env = "CART_MERGE_RETRY_LIMIT", default_value_t = CartConfig::DEFAULT_MERGE_RETRY_LIMIT)]
    pub merge_retry_limit: u32,
}

impl CartConfig {
    pub const DEFAULT_MERGE_RETRY_LIMIT: u32 = 3;
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            merge_retry_limit: Self::DEFAULT_MERGE_RETRY_LIMIT,
        }
    }
}
