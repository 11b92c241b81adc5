//! Generic resource actor used by the simulated collaborators.
//!
//! A resource kind (buckets, schemas, tables) implements [`ActorEntity`];
//! a [`ResourceActor`] owns every instance of that kind and applies requests
//! sequentially; callers hold a cloneable [`ResourceClient`].
//!
//! # Testing
//!
//! See [`mock`] for driving a client without a running actor.

pub mod actor;
pub mod client;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;

pub use actor::ResourceActor;
pub use client::ResourceClient;
pub use entity::ActorEntity;
pub use error::FrameworkError;
pub use message::{ResourceRequest, Response};
