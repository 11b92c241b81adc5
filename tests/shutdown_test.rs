use lakehouse_lock_demo::config::Configuration;
use lakehouse_lock_demo::lifecycle::{
    wait_for_configuration, ConfigSlot, DemoError, ShutdownSignal, WaitError,
};
use serde_json::json;
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn configuration() -> Configuration {
    let document = json!({
        "BASE": { "logging_level": "warning" },
        "DELL_S3_CONNECTION": {
            "protocol": "http", "host": "localhost", "port": 9020,
            "s3AccessKey": "key", "s3SecretKey": "secret",
            "connectTimeout": 5, "readTimeout": 30
        },
        "DDAE_SESSION": {
            "protocol": "http", "host": "localhost", "port": 8080,
            "user": "admin", "password": "pw", "catalog": "hive", "schema": "default",
            "connectTimeout": 5, "readTimeout": 30
        },
        "DDAE_DATA_CONFIG": {
            "ddae_catalog": "hive", "ddae_schema": "lock_demo",
            "ddae_table_location": "s3a://lock-demo/hive/",
            "ddae_table_name_customer": "customer",
            "ddae_table_schema_customer": "custkey bigint",
            "dell_lakehouse_s3_bucket": "lock-demo"
        }
    });
    Configuration::from_json_str(&document.to_string(), PathBuf::from("temp"))
        .expect("Failed to build configuration")
}

#[tokio::test]
async fn test_shutdown_ends_wait_within_one_interval() {
    let interval = Duration::from_millis(200);
    let (signal, token) = ShutdownSignal::new();
    let (_publisher, slot) = ConfigSlot::new();

    let waiter = tokio::spawn(async move { wait_for_configuration(&slot, &token, interval).await });
    tokio::time::sleep(Duration::from_millis(30)).await;

    let requested_at = Instant::now();
    assert!(signal.request());
    let result = tokio::time::timeout(interval * 2, waiter)
        .await
        .expect("wait did not end after shutdown")
        .expect("wait task panicked");

    assert_eq!(result.map(|_| ()), Err(WaitError::ShutdownRequested));
    assert!(requested_at.elapsed() <= interval);
}

#[tokio::test]
async fn test_shutdown_before_waiting_returns_immediately() {
    let (signal, token) = ShutdownSignal::new();
    let (publisher, slot) = ConfigSlot::new();
    signal.request();
    publisher.publish(configuration());

    let result = wait_for_configuration(&slot, &token, Duration::from_secs(60)).await;
    assert_eq!(result.map(|_| ()), Err(WaitError::ShutdownRequested));
}

#[tokio::test]
async fn test_published_configuration_is_returned() {
    let (_signal, token) = ShutdownSignal::new();
    let (publisher, slot) = ConfigSlot::new();

    let waiter = tokio::spawn(async move {
        wait_for_configuration(&slot, &token, Duration::from_millis(20)).await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    publisher.publish(configuration());

    let config = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("wait did not observe the configuration")
        .expect("wait task panicked")
        .expect("configuration should be returned");
    assert_eq!(config.table.bucket, "lock-demo");
}

#[tokio::test]
async fn test_loader_gone_without_publishing() {
    let (_signal, token) = ShutdownSignal::new();
    let (publisher, slot) = ConfigSlot::new();
    drop(publisher);

    let result = tokio::time::timeout(
        Duration::from_secs(1),
        wait_for_configuration(&slot, &token, Duration::from_millis(20)),
    )
    .await
    .expect("wait should notice the loader is gone");
    assert_eq!(result.map(|_| ()), Err(WaitError::LoaderGone));
}

#[test]
fn test_wait_errors_map_to_fatal_errors() {
    assert!(matches!(
        DemoError::from(WaitError::ShutdownRequested),
        DemoError::ShutdownRequested
    ));
    assert!(matches!(
        DemoError::from(WaitError::LoaderGone),
        DemoError::ConfigurationUnavailable
    ));
}
