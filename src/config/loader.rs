//! Reading and validating the configuration document.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::error::ConfigurationError;
use crate::config::model::{
    split_storage_uri, Configuration, LogLevel, ObjectStoreConnection, Protocol,
    QuerySessionSettings, TableConfig, TableConnector,
};

pub const BASE_SECTION: &str = "BASE";
pub const OBJECT_STORE_SECTION: &str = "DELL_S3_CONNECTION";
pub const QUERY_SESSION_SECTION: &str = "DDAE_SESSION";
pub const TABLE_SECTION: &str = "DDAE_DATA_CONFIG";

impl Configuration {
    /// Load and validate the document at `path`.
    ///
    /// Rules are checked in a fixed order and the first violation is returned;
    /// nothing is built unless every rule passes.
    pub async fn load(
        path: impl AsRef<Path>,
        temp_dir: impl AsRef<Path>,
    ) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ConfigurationError::MissingPath);
        }
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ConfigurationError::PathNotFound(path.to_path_buf()));
        }
        let temp_dir = temp_dir.as_ref();
        if temp_dir.as_os_str().is_empty() {
            return Err(ConfigurationError::MissingTempDir);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigurationError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), bytes = content.len(), "Configuration file read");

        Self::from_json_str(&content, temp_dir.to_path_buf())
    }

    /// Validate an in-memory document.
    pub fn from_json_str(content: &str, temp_dir: PathBuf) -> Result<Self, ConfigurationError> {
        if temp_dir.as_os_str().is_empty() {
            return Err(ConfigurationError::MissingTempDir);
        }
        let document: Value = serde_json::from_str(content)?;
        let Value::Object(document) = document else {
            return Err(ConfigurationError::NotAnObject);
        };

        let base = Section::of(&document, BASE_SECTION)?;
        let log_level: LogLevel = base.text("logging_level")?.parse()?;

        let s3 = Section::of(&document, OBJECT_STORE_SECTION)?;
        let object_store = ObjectStoreConnection {
            protocol: s3.protocol("protocol", ConfigurationError::InvalidObjectStoreProtocol)?,
            host: s3.text("host")?,
            port: s3.port("port")?,
            access_key: s3.text("s3AccessKey")?,
            secret_key: s3.text("s3SecretKey")?,
            connect_timeout: s3.seconds("connectTimeout")?,
            read_timeout: s3.seconds("readTimeout")?,
        };

        let session = Section::of(&document, QUERY_SESSION_SECTION)?;
        let query_session = QuerySessionSettings {
            protocol: session.protocol("protocol", ConfigurationError::InvalidQueryProtocol)?,
            host: session.text("host")?,
            port: session.port("port")?,
            user: session.text("user")?,
            password: session.text("password")?,
            catalog: session.text("catalog")?,
            schema: session.text("schema")?,
            connect_timeout: session.seconds("connectTimeout")?,
            read_timeout: session.seconds("readTimeout")?,
        };

        let data = Section::of(&document, TABLE_SECTION)?;
        let catalog = data.text("ddae_catalog")?;
        let schema = data.text("ddae_schema")?;
        let location = data.text("ddae_table_location")?;
        if split_storage_uri(&location).is_none() {
            return Err(ConfigurationError::InvalidTableLocation(location));
        }
        let table_name = data.text("ddae_table_name_customer")?;
        let column_definitions = data.text("ddae_table_schema_customer")?;
        let bucket = data.text("dell_lakehouse_s3_bucket")?;
        let connector = match data.optional_text("ddae_table_connector")? {
            Some(raw) => TableConnector::parse(&raw)
                .ok_or(ConfigurationError::InvalidTableConnector(raw))?,
            None => TableConnector::default(),
        };

        Ok(Configuration {
            log_level,
            object_store,
            query_session,
            table: TableConfig {
                catalog,
                schema,
                location,
                table_name,
                column_definitions,
                bucket,
                connector,
            },
            temp_dir,
        })
    }
}

/// One top-level object of the document, with typed field accessors.
struct Section<'a> {
    name: &'static str,
    fields: &'a Map<String, Value>,
}

impl<'a> Section<'a> {
    fn of(document: &'a Map<String, Value>, name: &'static str) -> Result<Self, ConfigurationError> {
        match document.get(name) {
            Some(Value::Object(fields)) => Ok(Self { name, fields }),
            Some(_) => Err(ConfigurationError::SectionNotAnObject(name)),
            None => Err(ConfigurationError::MissingSection(name)),
        }
    }

    fn raw(&self, field: &'static str) -> Result<&'a Value, ConfigurationError> {
        match self.fields.get(field) {
            None => Err(ConfigurationError::MissingField {
                section: self.name,
                field,
            }),
            Some(Value::Null) => Err(self.empty(field)),
            Some(value) => Ok(value),
        }
    }

    fn empty(&self, field: &'static str) -> ConfigurationError {
        ConfigurationError::EmptyField {
            section: self.name,
            field,
        }
    }

    fn invalid(&self, field: &'static str, value: &Value) -> ConfigurationError {
        ConfigurationError::InvalidValue {
            section: self.name,
            field,
            value: value.to_string(),
        }
    }

    fn text(&self, field: &'static str) -> Result<String, ConfigurationError> {
        match self.raw(field)? {
            Value::String(s) if s.trim().is_empty() => Err(self.empty(field)),
            Value::String(s) => Ok(s.clone()),
            other => Err(self.invalid(field, other)),
        }
    }

    fn optional_text(&self, field: &'static str) -> Result<Option<String>, ConfigurationError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.text(field).map(Some),
        }
    }

    fn protocol(
        &self,
        field: &'static str,
        reject: fn(String) -> ConfigurationError,
    ) -> Result<Protocol, ConfigurationError> {
        let raw = self.text(field)?;
        Protocol::parse(&raw).ok_or_else(|| reject(raw))
    }

    fn port(&self, field: &'static str) -> Result<u16, ConfigurationError> {
        let value = self.raw(field)?;
        let number = match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) if s.trim().is_empty() => return Err(self.empty(field)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
        .ok_or_else(|| self.invalid(field, value))?;

        match number {
            0 => Err(self.empty(field)),
            n => u16::try_from(n).map_err(|_| self.invalid(field, value)),
        }
    }

    fn seconds(&self, field: &'static str) -> Result<Duration, ConfigurationError> {
        let value = self.raw(field)?;
        let secs = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if s.trim().is_empty() => return Err(self.empty(field)),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|secs| secs.is_finite())
        .ok_or_else(|| self.invalid(field, value))?;

        if secs == 0.0 {
            Err(self.empty(field))
        } else {
            Duration::try_from_secs_f64(secs).map_err(|_| self.invalid(field, value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "BASE": { "logging_level": "info" },
            "DELL_S3_CONNECTION": {
                "protocol": "http", "host": "ecs.local", "port": "9020",
                "s3AccessKey": "ak", "s3SecretKey": "sk",
                "connectTimeout": 5, "readTimeout": "30"
            },
            "DDAE_SESSION": {
                "protocol": "https", "host": "trino.local", "port": 8443,
                "user": "admin", "password": "pw", "catalog": "hive", "schema": "default",
                "connectTimeout": 10, "readTimeout": 60
            },
            "DDAE_DATA_CONFIG": {
                "ddae_catalog": "hive", "ddae_schema": "demo",
                "ddae_table_location": "s3a://demo-bucket/hive/",
                "ddae_table_name_customer": "customer",
                "ddae_table_schema_customer": "id bigint, name varchar",
                "dell_lakehouse_s3_bucket": "demo-bucket"
            }
        })
    }

    fn load(doc: &Value) -> Result<Configuration, ConfigurationError> {
        Configuration::from_json_str(&doc.to_string(), PathBuf::from("temp"))
    }

    #[test]
    fn test_string_and_number_forms_are_both_accepted() {
        let config = load(&document()).unwrap();
        assert_eq!(config.object_store.port, 9020);
        assert_eq!(config.object_store.read_timeout, Duration::from_secs(30));
        assert_eq!(config.query_session.port, 8443);
        assert_eq!(config.table.connector, TableConnector::Hive);
    }

    #[test]
    fn test_first_violation_wins() {
        let mut doc = document();
        doc["BASE"]["logging_level"] = json!("verbose");
        doc["DELL_S3_CONNECTION"]["protocol"] = json!("ftp");
        assert!(matches!(load(&doc), Err(ConfigurationError::InvalidLogLevel(l)) if l == "verbose"));
    }

    #[test]
    fn test_zero_port_and_timeout_are_not_configured() {
        let mut doc = document();
        doc["DELL_S3_CONNECTION"]["port"] = json!(0);
        assert!(matches!(
            load(&doc),
            Err(ConfigurationError::EmptyField { field: "port", .. })
        ));

        let mut doc = document();
        doc["DDAE_SESSION"]["readTimeout"] = json!("0");
        assert!(matches!(
            load(&doc),
            Err(ConfigurationError::EmptyField { field: "readTimeout", .. })
        ));
    }

    #[test]
    fn test_out_of_range_port_is_invalid() {
        let mut doc = document();
        doc["DDAE_SESSION"]["port"] = json!(70000);
        assert!(matches!(
            load(&doc),
            Err(ConfigurationError::InvalidValue { field: "port", .. })
        ));
    }

    #[test]
    fn test_connector_override() {
        let mut doc = document();
        doc["DDAE_DATA_CONFIG"]["ddae_table_connector"] = json!("Iceberg");
        assert_eq!(load(&doc).unwrap().table.connector, TableConnector::Iceberg);

        doc["DDAE_DATA_CONFIG"]["ddae_table_connector"] = json!("delta");
        assert!(matches!(load(&doc), Err(ConfigurationError::InvalidTableConnector(_))));
    }

    #[test]
    fn test_table_location_needs_a_bucket() {
        let mut doc = document();
        doc["DDAE_DATA_CONFIG"]["ddae_table_location"] = json!("hive/customer");
        assert!(matches!(load(&doc), Err(ConfigurationError::InvalidTableLocation(_))));
    }

    #[test]
    fn test_non_object_documents_are_rejected() {
        assert!(matches!(load(&json!([1, 2])), Err(ConfigurationError::NotAnObject)));
        assert!(matches!(
            Configuration::from_json_str("{ not json", PathBuf::from("temp")),
            Err(ConfigurationError::Parse(_))
        ));
    }
}
