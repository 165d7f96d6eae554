//! REST-MySQL - Main entry point.
//!
//! Serves generic CRUD endpoints over the tables of any database reachable
//! with the configured credentials.

use rest_mysql::config::Config;
use rest_mysql::db::{RetryingExecutor, SqlxConnector};
use rest_mysql::service::CrudService;
use rest_mysql::transport::HttpTransport;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Warnings and errors go to stderr, everything else to stdout.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json().with_writer(writer)).init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(writer),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    init_tracing(&config);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    let settings = config.connection_settings();
    info!(
        backend = %settings.db_type(),
        settings = ?settings,
        "Starting REST-MySQL v{}",
        env!("CARGO_PKG_VERSION")
    );

    let executor = RetryingExecutor::new(SqlxConnector::new(settings), config.retry_policy());
    let service = Arc::new(CrudService::new(executor));

    let transport = HttpTransport::new(service, &config.listen_ip, config.listen_port);
    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
