//! # Resource Entities
//!
//! The trait every simulated resource (a bucket, a schema, a table) implements
//! so that a single [`ResourceActor`](crate::framework::ResourceActor) loop can
//! own and mutate it.

use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A resource that can be owned by a [`ResourceActor`](crate::framework::ResourceActor).
///
/// Resources are addressed by caller-chosen identifiers (bucket names,
/// qualified table names) rather than generated ones, because the services
/// being simulated let the client pick the name and reject duplicates.
///
/// # Associated Types
/// - `Create`: payload used to build a new instance.
/// - `Action`: resource-specific operations (put object, scan table, ...).
/// - `Context`: dependencies injected when the actor loop starts. Use `()`
///   when the resource needs nothing.
/// - `Error`: the domain error surfaced to clients. It travels boxed inside
///   [`FrameworkError::EntityError`](crate::framework::FrameworkError) and
///   client wrappers downcast it back.
#[async_trait]
pub trait ActorEntity: Send + Sync + Sized + 'static {
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;
    type Create: Send + Sync + Debug;
    type Action: Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;
    type Context: Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build the resource from its id and creation payload.
    fn from_create_params(id: Self::Id, params: Self::Create) -> Result<Self, Self::Error>;

    /// Runs after construction, before the resource becomes visible.
    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Runs before removal. Returning an error keeps the resource in place.
    async fn on_delete(&self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: Self::Action,
        ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}
