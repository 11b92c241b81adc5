//! # Configuration
//!
//! The demo is driven by one JSON document with four sections:
//!
//! ```text
//! BASE               { logging_level }
//! DELL_S3_CONNECTION { protocol, host, port, s3AccessKey, s3SecretKey, connectTimeout, readTimeout }
//! DDAE_SESSION       { protocol, host, port, user, password, catalog, schema, connectTimeout, readTimeout }
//! DDAE_DATA_CONFIG   { ddae_catalog, ddae_schema, ddae_table_location, ddae_table_name_customer,
//!                      ddae_table_schema_customer, dell_lakehouse_s3_bucket, [ddae_table_connector] }
//! ```
//!
//! [`Configuration::load`] turns it into a typed, immutable [`Configuration`]
//! or fails with the first [`ConfigurationError`] it finds.

pub mod error;
pub mod loader;
pub mod model;

pub use error::ConfigurationError;
pub use loader::{BASE_SECTION, OBJECT_STORE_SECTION, QUERY_SESSION_SECTION, TABLE_SECTION};
pub use model::*;
