//! Configuration handling for the REST-MySQL service.
//!
//! Values come from CLI arguments, then environment variables (a `.env` file
//! is loaded into the environment first), then the defaults below.

use crate::db::RetryPolicy;
use crate::db::retry::{DEFAULT_RETRY_INITIAL_SECS, DEFAULT_RETRY_RESET_SECS};
use crate::models::ConnectionSettings;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_LISTEN_IP: &str = "127.0.0.1";
pub const DEFAULT_LISTEN_PORT: u16 = 8080;
pub const DEFAULT_MYSQL_HOST: &str = "localhost";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_MYSQL_USER: &str = "root";

/// Configuration for the REST-MySQL service.
#[derive(Clone, Parser)]
#[command(
    name = "rest-mysql",
    about = "Generic REST CRUD endpoints over MySQL tables",
    version,
    author
)]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, default_value = DEFAULT_LISTEN_IP, env = "LISTEN_IP")]
    pub listen_ip: String,

    /// Port the HTTP server binds to
    #[arg(long, default_value_t = DEFAULT_LISTEN_PORT, env = "LISTEN_PORT")]
    pub listen_port: u16,

    /// MySQL server host
    #[arg(long, default_value = DEFAULT_MYSQL_HOST, env = "MYSQL_HOST")]
    pub mysql_host: String,

    /// MySQL server port
    #[arg(long, default_value_t = DEFAULT_MYSQL_PORT, env = "MYSQL_PORT")]
    pub mysql_port: u16,

    /// MySQL user
    #[arg(long, default_value = DEFAULT_MYSQL_USER, env = "MYSQL_USER")]
    pub mysql_user: String,

    /// MySQL password (sensitive - not logged)
    #[arg(long, default_value = "", env = "MYSQL_PASSWORD", hide_env_values = true)]
    pub mysql_password: String,

    /// Serve SQLite files from this directory instead of MySQL (one `<db>.db` per database)
    #[arg(long, env = "SQLITE_DIR")]
    pub sqlite_dir: Option<PathBuf>,

    /// First reconnect delay in seconds while a database is unreachable
    #[arg(long, default_value_t = DEFAULT_RETRY_INITIAL_SECS, env = "RETRY_INITIAL_SECS")]
    pub retry_initial_secs: u64,

    /// Reconnect delays above this many seconds start over from the first delay
    #[arg(long, default_value_t = DEFAULT_RETRY_RESET_SECS, env = "RETRY_RESET_SECS")]
    pub retry_reset_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Load a `.env` file if present, then parse arguments and environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            listen_ip: DEFAULT_LISTEN_IP.to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            mysql_host: DEFAULT_MYSQL_HOST.to_string(),
            mysql_port: DEFAULT_MYSQL_PORT,
            mysql_user: DEFAULT_MYSQL_USER.to_string(),
            mysql_password: String::new(),
            sqlite_dir: None,
            retry_initial_secs: DEFAULT_RETRY_INITIAL_SECS,
            retry_reset_secs: DEFAULT_RETRY_RESET_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_ip, self.listen_port)
    }

    /// Connection parameters shared by every database name.
    pub fn connection_settings(&self) -> ConnectionSettings {
        match &self.sqlite_dir {
            Some(dir) => ConnectionSettings::sqlite(dir.clone()),
            None => ConnectionSettings::mysql(
                &self.mysql_host,
                self.mysql_port,
                &self.mysql_user,
                &self.mysql_password,
            ),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_secs(self.retry_initial_secs, self.retry_reset_secs)
    }

    /// Check values clap cannot validate on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.retry_initial_secs == 0 {
            return Err("RETRY_INITIAL_SECS must be greater than 0".to_string());
        }
        if self.listen_ip.trim().is_empty() {
            return Err("LISTEN_IP must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("listen_ip", &self.listen_ip)
            .field("listen_port", &self.listen_port)
            .field("mysql_host", &self.mysql_host)
            .field("mysql_port", &self.mysql_port)
            .field("mysql_user", &self.mysql_user)
            .field("mysql_password", &"****")
            .field("sqlite_dir", &self.sqlite_dir)
            .field("retry_initial_secs", &self.retry_initial_secs)
            .field("retry_reset_secs", &self.retry_reset_secs)
            .field("log_level", &self.log_level)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}
