//! Error type for configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration document was rejected.
///
/// Loading stops at the first violation, so exactly one of these is reported.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no configuration file path provided")]
    MissingPath,

    #[error("configuration file path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("no path for temporary file storage provided")]
    MissingTempDir,

    #[error("failed to read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse the configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("configuration document must be a JSON object")]
    NotAnObject,

    #[error("section {0} is missing from the configuration")]
    MissingSection(&'static str),

    #[error("section {0} must be a JSON object")]
    SectionNotAnObject(&'static str),

    #[error("{section}.{field} is missing from the configuration")]
    MissingField {
        section: &'static str,
        field: &'static str,
    },

    #[error("{section}.{field} is not configured")]
    EmptyField {
        section: &'static str,
        field: &'static str,
    },

    #[error("{section}.{field} has an invalid value: {value}")]
    InvalidValue {
        section: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("logging level can be only one of ['debug', 'info', 'warning', 'error'], got '{0}'")]
    InvalidLogLevel(String),

    #[error("the object store protocol can only be one of ['http', 'https'], got '{0}'")]
    InvalidObjectStoreProtocol(String),

    #[error("the query session protocol can only be one of ['http', 'https'], got '{0}'")]
    InvalidQueryProtocol(String),

    #[error("table location must look like scheme://bucket/path/, got '{0}'")]
    InvalidTableLocation(String),

    #[error("table connector can be only one of ['hive', 'iceberg'], got '{0}'")]
    InvalidTableConnector(String),
}
