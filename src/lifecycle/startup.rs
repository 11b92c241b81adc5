//! Waiting for a configuration that is loaded elsewhere.

use crate::config::Configuration;
use crate::lifecycle::error::DemoError;
use crate::lifecycle::shutdown::ShutdownToken;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

/// How often the wait loop re-checks the slot.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("shutdown requested while waiting for configuration")]
    ShutdownRequested,

    #[error("configuration publisher went away without publishing")]
    LoaderGone,
}

impl From<WaitError> for DemoError {
    fn from(error: WaitError) -> Self {
        match error {
            WaitError::ShutdownRequested => DemoError::ShutdownRequested,
            WaitError::LoaderGone => DemoError::ConfigurationUnavailable,
        }
    }
}

/// Write side: hands the loaded configuration to whoever is waiting.
#[derive(Debug)]
pub struct ConfigPublisher {
    sender: watch::Sender<Option<Arc<Configuration>>>,
}

impl ConfigPublisher {
    pub fn publish(self, configuration: Configuration) {
        self.sender.send_replace(Some(Arc::new(configuration)));
    }
}

/// Read side of a configuration hand-off.
#[derive(Debug, Clone)]
pub struct ConfigSlot {
    receiver: watch::Receiver<Option<Arc<Configuration>>>,
}

impl ConfigSlot {
    pub fn new() -> (ConfigPublisher, ConfigSlot) {
        let (sender, receiver) = watch::channel(None);
        (ConfigPublisher { sender }, ConfigSlot { receiver })
    }

    pub fn current(&self) -> Option<Arc<Configuration>> {
        self.receiver.borrow().clone()
    }

    fn publisher_gone(&self) -> bool {
        self.receiver.has_changed().is_err()
    }
}

/// One look at the slot. Closure is sampled before the value, so a
/// publish that raced with the publisher going away is still seen.
fn poll(slot: &ConfigSlot) -> Result<Option<Arc<Configuration>>, WaitError> {
    let gone = slot.publisher_gone();
    match slot.current() {
        Some(configuration) => Ok(Some(configuration)),
        None if gone => Err(WaitError::LoaderGone),
        None => Ok(None),
    }
}

/// Poll `slot` every `interval` until a configuration shows up.
///
/// The token is checked on every iteration and also raced against the
/// sleep, so a shutdown request ends the wait within one interval.
pub async fn wait_for_configuration(
    slot: &ConfigSlot,
    token: &ShutdownToken,
    interval: Duration,
) -> Result<Arc<Configuration>, WaitError> {
    let mut polls = 0u64;
    loop {
        if token.is_requested() {
            info!(polls, "Shutdown requested, no longer waiting for configuration");
            return Err(WaitError::ShutdownRequested);
        }
        if let Some(configuration) = poll(slot)? {
            debug!(polls, "Configuration available");
            return Ok(configuration);
        }

        polls += 1;
        debug!(polls, "Waiting for configuration");
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn configuration() -> Configuration {
        let document = json!({
            "BASE": { "logging_level": "info" },
            "DELL_S3_CONNECTION": {
                "protocol": "http", "host": "s3", "port": 9020,
                "s3AccessKey": "k", "s3SecretKey": "s",
                "connectTimeout": 1, "readTimeout": 1
            },
            "DDAE_SESSION": {
                "protocol": "http", "host": "trino", "port": 8080,
                "user": "u", "password": "p", "catalog": "hive", "schema": "default",
                "connectTimeout": 1, "readTimeout": 1
            },
            "DDAE_DATA_CONFIG": {
                "ddae_catalog": "hive", "ddae_schema": "s",
                "ddae_table_location": "s3a://b/hive/",
                "ddae_table_name_customer": "t",
                "ddae_table_schema_customer": "id bigint",
                "dell_lakehouse_s3_bucket": "b"
            }
        });
        Configuration::from_json_str(&document.to_string(), PathBuf::from("temp")).unwrap()
    }

    #[test]
    fn test_poll_sees_value_published_by_a_dropped_publisher() {
        let (publisher, slot) = ConfigSlot::new();
        publisher.publish(configuration());
        assert!(slot.publisher_gone());

        let polled = poll(&slot).unwrap().expect("published value must win");
        assert_eq!(polled.table.bucket, "b");
    }

    #[test]
    fn test_poll_reports_gone_only_without_a_value() {
        let (publisher, slot) = ConfigSlot::new();
        assert_eq!(poll(&slot).map(|c| c.is_some()), Ok(false));
        drop(publisher);
        assert_eq!(poll(&slot).map(|c| c.is_some()), Err(WaitError::LoaderGone));
    }
}
