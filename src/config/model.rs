//! Typed configuration records.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::error::ConfigurationError;

/// Transport scheme for either service endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    /// Exact match on the lowercase scheme name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "http" => Some(Protocol::Http),
            "https" => Some(Protocol::Https),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Protocol::Https)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verbosity selected by `BASE.logging_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigurationError::InvalidLogLevel(value.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which external-table declaration the query engine expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableConnector {
    #[default]
    Hive,
    Iceberg,
}

impl TableConnector {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hive" => Some(TableConnector::Hive),
            "iceberg" => Some(TableConnector::Iceberg),
            _ => None,
        }
    }

    /// Table property that carries the storage location.
    pub fn location_property(&self) -> &'static str {
        match self {
            TableConnector::Hive => "external_location",
            TableConnector::Iceberg => "location",
        }
    }
}

/// `DELL_S3_CONNECTION`: where the S3-compatible endpoint lives.
#[derive(Clone, PartialEq)]
pub struct ObjectStoreConnection {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub access_key: String,
    pub secret_key: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl ObjectStoreConnection {
    pub fn endpoint_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    pub fn uses_tls(&self) -> bool {
        self.protocol.is_tls()
    }
}

impl fmt::Debug for ObjectStoreConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreConnection")
            .field("endpoint", &self.endpoint_url())
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

/// `DDAE_SESSION`: how to reach the query engine.
#[derive(Clone, PartialEq)]
pub struct QuerySessionSettings {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub catalog: String,
    pub schema: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl QuerySessionSettings {
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

impl fmt::Debug for QuerySessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySessionSettings")
            .field("url", &self.url())
            .field("user", &self.user)
            .field("password", &"***")
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

/// `DDAE_DATA_CONFIG`: the table the demo creates and the bucket behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    pub catalog: String,
    pub schema: String,
    /// URI prefix such as `s3a://bucket/hive/`; the table name is appended to it.
    pub location: String,
    pub table_name: String,
    /// Column list exactly as it goes between the parentheses of `CREATE TABLE`.
    pub column_definitions: String,
    pub bucket: String,
    pub connector: TableConnector,
}

impl TableConfig {
    pub fn qualified_schema(&self) -> String {
        format!("{}.{}", self.catalog, self.schema)
    }

    pub fn qualified_table(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.schema, self.table_name)
    }

    pub fn storage_location(&self) -> String {
        format!("{}{}", self.location, self.table_name)
    }

    /// Object key a data file must be written under to be part of the table.
    pub fn object_key(&self, file_name: &str) -> String {
        let location = self.storage_location();
        let prefix = split_storage_uri(&location)
            .map(|(_, path)| path.trim_end_matches('/'))
            .unwrap_or_default();
        if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{prefix}/{file_name}")
        }
    }
}

/// Split `scheme://authority/path` into `(authority, path)`.
///
/// Returns `None` when the scheme or authority is missing.
pub fn split_storage_uri(uri: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = uri.split_once("://")?;
    if scheme.is_empty() {
        return None;
    }
    let (authority, path) = match rest.split_once('/') {
        Some((authority, path)) => (authority, path),
        None => (rest, ""),
    };
    if authority.is_empty() {
        return None;
    }
    Some((authority, path))
}

/// A configuration record.
///
/// [`Configuration::load`](crate::config::Configuration::load) and
/// [`Configuration::from_json_str`](crate::config::Configuration::from_json_str)
/// return one only when every rule passed. The fields are public, so a
/// record assembled by hand (as tests do) carries no such guarantee.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub log_level: LogLevel,
    pub object_store: ObjectStoreConnection,
    pub query_session: QuerySessionSettings,
    pub table: TableConfig,
    pub temp_dir: PathBuf,
}
