//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing_subscriber` formatter once,
//! after the configuration has been read. The configured
//! `BASE.logging_level` becomes the default filter; `RUST_LOG` wins when it
//! is set.
//!
//! ```bash
//! # Level from the configuration file
//! cargo run
//!
//! # Everything from the S3 adapter, info elsewhere
//! RUST_LOG=info,lakehouse_lock_demo::clients::s3=debug cargo run
//! ```
//!
//! Each lifecycle step logs inside a `step` span carrying its number and
//! name, so a compact line reads like:
//!
//! ```text
//! INFO step{number=8 name="delete object"}: Delete marker created version_id=...
//! ```
//!
//! Actor lifecycle events of the simulated collaborators carry an
//! `entity_type` field (`Bucket`, `Schema`, `Table`) instead of a module path.

use crate::config::LogLevel;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Later calls are ignored.
pub fn setup_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
