//! Collaborator interfaces and their network-backed implementations.
//!
//! The demo only ever talks to [`ObjectStore`] and [`QueryConnector`]; the
//! S3 and Trino adapters here and the simulations in [`crate::sim`] both
//! implement them.

pub mod object_store;
pub mod query;
pub mod render;
pub mod s3;
pub mod trino;

pub use object_store::*;
pub use query::{QueryConnector, QueryError, QueryResult, QuerySession, QuerySessionHandle};
pub use render::{render_table, NO_DATA_MESSAGE};
pub use s3::S3ObjectStore;
pub use trino::{TrinoConnector, TrinoSession};
