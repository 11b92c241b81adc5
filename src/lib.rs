//! # Lakehouse Lock Demo
//!
//! > **Object versioning and object lock, seen through a SQL table.**
//!
//! This crate walks an S3-compatible bucket and a Trino-compatible query
//! engine through a fixed lifecycle: create a locked, versioned bucket, put a
//! data file behind an external table, hide it with a delete marker, bring it
//! back by deleting the marker, then clean everything up. Querying the table
//! after each change shows what the storage layer did.
//!
//! ## Module Tour
//!
//! ### 1. Configuration ([`config`])
//! - **Role**: Turns the JSON document into a typed, fully validated [`Configuration`](config::Configuration), failing on the first broken rule.
//! - **Key items**: [`Configuration::load`](config::Configuration::load), [`ConfigurationError`](config::ConfigurationError).
//!
//! ### 2. Collaborators ([`clients`])
//! - **Role**: The two external services as traits, plus their network adapters.
//! - **Key items**: [`ObjectStore`](clients::ObjectStore), [`QueryConnector`](clients::QueryConnector),
//!   [`QuerySessionHandle`](clients::QuerySessionHandle), [`S3ObjectStore`](clients::S3ObjectStore),
//!   [`TrinoConnector`](clients::TrinoConnector).
//!
//! ### 3. The Orchestrator ([`lifecycle`])
//! - **Role**: Runs the steps in order, applies the [`StepPolicy`](lifecycle::StepPolicy), and owns startup and shutdown.
//! - **Key items**: [`run_demo`](lifecycle::run_demo), [`DemoReport`](lifecycle::DemoReport),
//!   [`wait_for_configuration`](lifecycle::wait_for_configuration), [`ShutdownSignal`](lifecycle::ShutdownSignal).
//!
//! ### 4. The Engine ([`framework`])
//! - **Role**: A generic `ResourceActor<T>` that owns a collection of resources and applies requests to them one at a time.
//! - **Key items**: [`ActorEntity`](framework::ActorEntity), [`ResourceActor`](framework::ResourceActor), [`mock`](framework::mock).
//!
//! ### 5. Simulations ([`sim`])
//! - **Role**: In-memory object store and query engine built on the framework, so the whole lifecycle runs in tests without a network.
//! - **Key items**: [`SimulatedObjectStore`](sim::SimulatedObjectStore), [`SimulatedQueryEngine`](sim::SimulatedQueryEngine).
//!
//! ## Quick Start
//!
//! ```bash
//! # Uses configuration/lakehouse_lock_demo.json and testdata/
//! cargo run
//!
//! # Override the configured log level
//! RUST_LOG=debug cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod clients;
pub mod config;
pub mod framework;
pub mod lifecycle;
pub mod sim;
