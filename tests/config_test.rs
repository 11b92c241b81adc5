use lakehouse_lock_demo::config::{
    Configuration, ConfigurationError, LogLevel, Protocol, TableConnector,
};
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

const REQUIRED_FIELDS: &[(&str, &str)] = &[
    ("BASE", "logging_level"),
    ("DELL_S3_CONNECTION", "protocol"),
    ("DELL_S3_CONNECTION", "host"),
    ("DELL_S3_CONNECTION", "port"),
    ("DELL_S3_CONNECTION", "s3AccessKey"),
    ("DELL_S3_CONNECTION", "s3SecretKey"),
    ("DELL_S3_CONNECTION", "connectTimeout"),
    ("DELL_S3_CONNECTION", "readTimeout"),
    ("DDAE_SESSION", "protocol"),
    ("DDAE_SESSION", "host"),
    ("DDAE_SESSION", "port"),
    ("DDAE_SESSION", "user"),
    ("DDAE_SESSION", "password"),
    ("DDAE_SESSION", "catalog"),
    ("DDAE_SESSION", "schema"),
    ("DDAE_SESSION", "connectTimeout"),
    ("DDAE_SESSION", "readTimeout"),
    ("DDAE_DATA_CONFIG", "ddae_catalog"),
    ("DDAE_DATA_CONFIG", "ddae_schema"),
    ("DDAE_DATA_CONFIG", "ddae_table_location"),
    ("DDAE_DATA_CONFIG", "ddae_table_name_customer"),
    ("DDAE_DATA_CONFIG", "ddae_table_schema_customer"),
    ("DDAE_DATA_CONFIG", "dell_lakehouse_s3_bucket"),
];

fn valid_document() -> Value {
    json!({
        "BASE": { "logging_level": "debug" },
        "DELL_S3_CONNECTION": {
            "protocol": "https", "host": "s3.lab", "port": 9021,
            "s3AccessKey": "AKIA", "s3SecretKey": "SECRET",
            "connectTimeout": 3, "readTimeout": 45
        },
        "DDAE_SESSION": {
            "protocol": "http", "host": "trino.lab", "port": 8080,
            "user": "analyst", "password": "pw", "catalog": "hive", "schema": "default",
            "connectTimeout": 7, "readTimeout": 90
        },
        "DDAE_DATA_CONFIG": {
            "ddae_catalog": "hive", "ddae_schema": "lock_demo",
            "ddae_table_location": "s3a://lock-bucket/hive/",
            "ddae_table_name_customer": "customer",
            "ddae_table_schema_customer": "custkey bigint, name varchar",
            "dell_lakehouse_s3_bucket": "lock-bucket"
        }
    })
}

fn write_document(document: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(document.to_string().as_bytes())
        .expect("Failed to write configuration");
    file
}

async fn load(document: &Value) -> Result<Configuration, ConfigurationError> {
    let file = write_document(document);
    Configuration::load(file.path(), "temp").await
}

#[tokio::test]
async fn test_round_trip_of_a_valid_document() {
    let config = load(&valid_document()).await.expect("valid document must load");

    assert_eq!(config.log_level, LogLevel::Debug);

    let s3 = &config.object_store;
    assert_eq!(s3.protocol, Protocol::Https);
    assert_eq!(s3.host, "s3.lab");
    assert_eq!(s3.port, 9021);
    assert_eq!(s3.access_key, "AKIA");
    assert_eq!(s3.secret_key, "SECRET");
    assert_eq!(s3.connect_timeout, Duration::from_secs(3));
    assert_eq!(s3.read_timeout, Duration::from_secs(45));
    assert_eq!(s3.endpoint_url(), "https://s3.lab:9021");
    assert!(s3.uses_tls());

    let session = &config.query_session;
    assert_eq!(session.protocol, Protocol::Http);
    assert_eq!(session.host, "trino.lab");
    assert_eq!(session.port, 8080);
    assert_eq!(session.user, "analyst");
    assert_eq!(session.password, "pw");
    assert_eq!(session.catalog, "hive");
    assert_eq!(session.schema, "default");
    assert_eq!(session.connect_timeout, Duration::from_secs(7));
    assert_eq!(session.read_timeout, Duration::from_secs(90));

    let table = &config.table;
    assert_eq!(table.catalog, "hive");
    assert_eq!(table.schema, "lock_demo");
    assert_eq!(table.location, "s3a://lock-bucket/hive/");
    assert_eq!(table.table_name, "customer");
    assert_eq!(table.column_definitions, "custkey bigint, name varchar");
    assert_eq!(table.bucket, "lock-bucket");
    assert_eq!(table.connector, TableConnector::Hive);

    assert_eq!(config.temp_dir, PathBuf::from("temp"));
}

#[tokio::test]
async fn test_every_missing_field_is_rejected() {
    for (section, field) in REQUIRED_FIELDS {
        let mut document = valid_document();
        document[*section]
            .as_object_mut()
            .expect("section is an object")
            .remove(*field);

        match load(&document).await {
            Err(ConfigurationError::MissingField { section: s, field: f }) => {
                assert_eq!((s, f), (*section, *field));
            }
            other => panic!("{section}.{field}: expected MissingField, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_empty_and_zero_values_are_rejected() {
    for (section, field) in REQUIRED_FIELDS {
        let mut document = valid_document();
        let blank = if document[*section][*field].is_number() { json!(0) } else { json!("  ") };
        document[*section][*field] = blank;

        let result = load(&document).await;
        assert!(
            matches!(result, Err(ConfigurationError::EmptyField { .. })),
            "{section}.{field}: expected EmptyField, got {result:?}"
        );
    }
}

#[tokio::test]
async fn test_missing_section_is_named() {
    let mut document = valid_document();
    document.as_object_mut().unwrap().remove("DDAE_SESSION");
    assert!(matches!(
        load(&document).await,
        Err(ConfigurationError::MissingSection("DDAE_SESSION"))
    ));
}

#[tokio::test]
async fn test_log_levels_in_any_case() {
    for (raw, expected) in [
        ("debug", LogLevel::Debug),
        ("INFO", LogLevel::Info),
        ("Warning", LogLevel::Warning),
        ("eRRoR", LogLevel::Error),
    ] {
        let mut document = valid_document();
        document["BASE"]["logging_level"] = json!(raw);
        let config = load(&document).await.expect("level must be accepted");
        assert_eq!(config.log_level, expected);
    }

    for raw in ["trace", "warn", "critical", "verbose"] {
        let mut document = valid_document();
        document["BASE"]["logging_level"] = json!(raw);
        assert!(matches!(
            load(&document).await,
            Err(ConfigurationError::InvalidLogLevel(level)) if level == raw
        ));
    }
}

#[tokio::test]
async fn test_protocol_errors_name_the_section() {
    for raw in ["ftp", "s3", "HTTPS", "tcp"] {
        let mut document = valid_document();
        document["DELL_S3_CONNECTION"]["protocol"] = json!(raw);
        assert!(matches!(
            load(&document).await,
            Err(ConfigurationError::InvalidObjectStoreProtocol(p)) if p == raw
        ));

        let mut document = valid_document();
        document["DDAE_SESSION"]["protocol"] = json!(raw);
        assert!(matches!(
            load(&document).await,
            Err(ConfigurationError::InvalidQueryProtocol(p)) if p == raw
        ));
    }
}

#[tokio::test]
async fn test_path_preconditions() {
    assert!(matches!(
        Configuration::load("", "temp").await,
        Err(ConfigurationError::MissingPath)
    ));

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = dir.path().join("absent.json");
    assert!(matches!(
        Configuration::load(&missing, "temp").await,
        Err(ConfigurationError::PathNotFound(p)) if p == missing
    ));

    let file = write_document(&valid_document());
    assert!(matches!(
        Configuration::load(file.path(), "").await,
        Err(ConfigurationError::MissingTempDir)
    ));
}

#[tokio::test]
async fn test_unparseable_file() {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(b"BASE = { logging_level = info }").unwrap();
    assert!(matches!(
        Configuration::load(file.path(), "temp").await,
        Err(ConfigurationError::Parse(_))
    ));
}
