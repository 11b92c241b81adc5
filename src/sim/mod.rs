//! In-memory stand-ins for the object store and the query engine.
//!
//! Both are built on [`ResourceActor`](crate::framework::ResourceActor):
//! buckets in one actor, schemas and tables in two more. Tables receive the
//! store as their actor context, so a `SELECT` sees exactly the objects the
//! store currently exposes, delete markers included.
//!
//! ```rust,ignore
//! let store = SimulatedObjectStore::spawn();
//! let engine = SimulatedQueryEngine::spawn(store.clone());
//! let report = run_demo(&config, &store, engine, data_file, StepPolicy::default()).await?;
//! ```

pub mod bucket;
pub mod catalog;
pub mod engine;
pub mod statement;
pub mod store;

pub use bucket::{Bucket, BucketAction, BucketActionResult, BucketCreate, VersioningState};
pub use engine::{SimulatedQueryEngine, SimulatedSession};
pub use statement::Statement;
pub use store::SimulatedObjectStore;
