//! One-shot lakehouse object lock demo against a real S3 endpoint and Trino.
//!
//! Reads `configuration/lakehouse_lock_demo.json`, uploads
//! `testdata/<DATA_FILE_NAME>` and runs every lifecycle step once. Step
//! failures are reported and the run continues; only configuration,
//! connection and shutdown problems give a non-zero exit code.

use lakehouse_lock_demo::clients::{S3ObjectStore, TrinoConnector};
use lakehouse_lock_demo::config::{Configuration, ConfigurationError, LogLevel};
use lakehouse_lock_demo::lifecycle::{
    listen_for_signals, run_demo, setup_tracing, wait_for_configuration, ConfigSlot, DemoError,
    DemoReport, ShutdownSignal, ShutdownToken, StepPolicy, WaitError, DEFAULT_POLL_INTERVAL,
};
use std::path::Path;
use std::process::ExitCode;
use tokio::task::JoinHandle;
use tracing::{error, info};

const CONFIG_PATH: &str = "configuration/lakehouse_lock_demo.json";
const TEMP_DIR: &str = "temp";
const DATA_DIR: &str = "testdata";
/// Parquet file exported from the `customer` table.
const DATA_FILE_NAME: &str = "20240716_195545_07788_nxv46_b7038b63-56dc-4c8e-8b2d-595a2e2a4a84";

async fn run(
    slot: ConfigSlot,
    token: ShutdownToken,
    loader: JoinHandle<Result<(), ConfigurationError>>,
) -> Result<DemoReport, DemoError> {
    let config = match wait_for_configuration(&slot, &token, DEFAULT_POLL_INTERVAL).await {
        Ok(config) => config,
        Err(WaitError::LoaderGone) => {
            return match loader.await {
                Ok(Err(e)) => Err(e.into()),
                _ => Err(DemoError::ConfigurationUnavailable),
            };
        }
        Err(e) => return Err(e.into()),
    };

    setup_tracing(config.log_level);
    info!(config = ?config, "Configuration loaded");

    let store = S3ObjectStore::connect(&config.object_store).await;
    let data_file = Path::new(DATA_DIR).join(DATA_FILE_NAME);
    run_demo(
        &config,
        &store,
        TrinoConnector::new(),
        &data_file,
        StepPolicy::ContinueOnError,
    )
    .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let (signal, token) = ShutdownSignal::new();
    tokio::spawn(listen_for_signals(signal));

    let (publisher, slot) = ConfigSlot::new();
    let loader = tokio::spawn(async move {
        let config = Configuration::load(CONFIG_PATH, TEMP_DIR).await?;
        publisher.publish(config);
        Ok::<(), ConfigurationError>(())
    });

    match run(slot, token, loader).await {
        Ok(report) => {
            let failed = report.failures().count();
            println!(
                "Demo finished: {} step(s) run, {failed} failed",
                report.steps.len()
            );
            info!(steps = report.steps.len(), failed, "Demo finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            // Tracing may not be installed yet if the configuration never loaded.
            setup_tracing(LogLevel::Info);
            error!(error = %e, detail = ?e, "Demo aborted");
            eprintln!("Demo aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
