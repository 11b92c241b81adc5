//! Running the demo: startup hand-off, shutdown, the step sequence and logging.
//!
//! # Main Components
//!
//! - [`run_demo`] drives the object lifecycle steps
//! - [`wait_for_configuration`] blocks startup until a configuration is published or shutdown is requested
//! - [`ShutdownSignal`] and [`listen_for_signals`] turn SIGINT/SIGTERM into a cancellation token
//! - [`setup_tracing`] installs the log subscriber

pub mod demo;
pub mod error;
pub mod shutdown;
pub mod startup;
pub mod tracing;

pub use demo::*;
pub use error::{DemoError, StepError};
pub use shutdown::{listen_for_signals, ShutdownSignal, ShutdownToken};
pub use startup::{
    wait_for_configuration, ConfigPublisher, ConfigSlot, WaitError, DEFAULT_POLL_INTERVAL,
};
pub use tracing::setup_tracing;
