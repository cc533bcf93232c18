//! Log Indexer
//!
//! Provisions the log data stream, backfills it with generated records and
//! keeps writing live records until Ctrl-C.

use std::env;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use log_indexer::{Dependencies, IndexerError};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), IndexerError> {
    // A missing .env file is fine
    dotenv::dotenv().ok();
    init_tracing();

    let dependencies = Dependencies::new().await.map_err(|e| {
        error!(error = %e, "Failed to initialize dependencies");
        e
    })?;
    let indexer = dependencies.indexer();

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let summary = indexer.run(&cancel).await.map_err(|e| {
        error!(error = %e, "Indexer stopped");
        e
    })?;

    info!(
        written = summary.written,
        failed = summary.failed,
        rejected = summary.rejected,
        "Indexer finished"
    );
    Ok(())
}
