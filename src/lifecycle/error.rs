//! Errors that end a demo run.

use crate::clients::{QueryError, StorageError};
use crate::config::ConfigurationError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single lifecycle step failed.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("cannot read data file {}: {source}", .path.display())]
    DataFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no delete marker was captured for {key}")]
    MissingDeleteMarker { key: String },

    #[error("{failed} version(s) could not be deleted ({removed} removed)")]
    PurgeIncomplete { removed: usize, failed: usize },
}

/// Fatal errors: the run stops and the process exits non-zero.
#[derive(Debug, Error)]
pub enum DemoError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("could not establish a query session with {url}")]
    Connection { url: String },

    #[error("shutdown requested before the demo started")]
    ShutdownRequested,

    #[error("configuration loader exited without publishing a configuration")]
    ConfigurationUnavailable,

    #[error("step {number} ({name}) failed: {source}")]
    StepAborted {
        number: usize,
        name: &'static str,
        #[source]
        source: StepError,
    },
}
