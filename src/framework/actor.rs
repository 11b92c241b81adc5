//! # Resource Actor
//!
//! The event loop that owns a collection of resources and applies requests to
//! them one at a time.

use crate::framework::client::ResourceClient;
use crate::framework::entity::ActorEntity;
use crate::framework::error::FrameworkError;
use crate::framework::message::ResourceRequest;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Owns every resource of one kind.
///
/// Requests are handled strictly in arrival order, so resource state needs no
/// locking: the loop in [`ResourceActor::run`] is its only mutator.
pub struct ResourceActor<T: ActorEntity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
}

impl<T: ActorEntity> ResourceActor<T> {
    pub fn new(buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
        };
        (actor, ResourceClient::new(sender))
    }

    /// Runs until every client has been dropped.
    ///
    /// `context` is handed to every hook, which lets a resource reach other
    /// actors that were created after this one.
    pub async fn run(mut self, context: T::Context) {
        let entity_type = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or("Unknown");
        info!(entity_type, "Actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create {
                    id,
                    params,
                    respond_to,
                } => {
                    debug!(entity_type, %id, ?params, "Create");
                    if self.store.contains_key(&id) {
                        warn!(entity_type, %id, "Already exists");
                        let _ = respond_to.send(Err(FrameworkError::AlreadyExists(id.to_string())));
                        continue;
                    }
                    let created = match T::from_create_params(id.clone(), params) {
                        Ok(mut item) => match item.on_create(&context).await {
                            Ok(()) => Ok(item),
                            Err(e) => Err(e),
                        },
                        Err(e) => Err(e),
                    };
                    match created {
                        Ok(item) => {
                            self.store.insert(id.clone(), item);
                            info!(entity_type, %id, size = self.store.len(), "Created");
                            let _ = respond_to.send(Ok(()));
                        }
                        Err(e) => {
                            warn!(entity_type, %id, error = %e, "Create failed");
                            let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                        }
                    }
                }
                ResourceRequest::Exists { id, respond_to } => {
                    let found = self.store.contains_key(&id);
                    debug!(entity_type, %id, found, "Exists");
                    let _ = respond_to.send(Ok(found));
                }
                ResourceRequest::Delete { id, respond_to } => {
                    debug!(entity_type, %id, "Delete");
                    let Some(item) = self.store.get(&id) else {
                        warn!(entity_type, %id, "Not found");
                        let _ = respond_to.send(Err(FrameworkError::NotFound(id.to_string())));
                        continue;
                    };
                    if let Err(e) = item.on_delete(&context).await {
                        warn!(entity_type, %id, error = %e, "on_delete refused");
                        let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                        continue;
                    }
                    self.store.remove(&id);
                    info!(entity_type, %id, size = self.store.len(), "Deleted");
                    let _ = respond_to.send(Ok(()));
                }
                ResourceRequest::Action {
                    id,
                    action,
                    respond_to,
                } => {
                    debug!(entity_type, %id, ?action, "Action");
                    let Some(item) = self.store.get_mut(&id) else {
                        warn!(entity_type, %id, "Not found");
                        let _ = respond_to.send(Err(FrameworkError::NotFound(id.to_string())));
                        continue;
                    };
                    let result = item.handle_action(action, &context).await;
                    match &result {
                        Ok(_) => debug!(entity_type, %id, "Action ok"),
                        Err(e) => warn!(entity_type, %id, error = %e, "Action failed"),
                    }
                    let _ = respond_to
                        .send(result.map_err(|e| FrameworkError::EntityError(Box::new(e))));
                }
            }
        }

        info!(entity_type, size = self.store.len(), "Shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct Counter {
        value: u32,
        locked: bool,
    }

    #[derive(Debug)]
    struct CounterCreate {
        start: u32,
    }

    #[derive(Debug)]
    enum CounterAction {
        Add(u32),
        Lock,
    }

    #[derive(Debug, thiserror::Error, PartialEq)]
    enum CounterError {
        #[error("start must be below 100")]
        TooLarge,
        #[error("counter is locked")]
        Locked,
    }

    #[async_trait]
    impl ActorEntity for Counter {
        type Id = String;
        type Create = CounterCreate;
        type Action = CounterAction;
        type ActionResult = u32;
        type Context = ();
        type Error = CounterError;

        fn from_create_params(_id: String, params: CounterCreate) -> Result<Self, CounterError> {
            if params.start >= 100 {
                return Err(CounterError::TooLarge);
            }
            Ok(Self {
                value: params.start,
                locked: false,
            })
        }

        async fn on_delete(&self, _ctx: &()) -> Result<(), CounterError> {
            if self.locked {
                return Err(CounterError::Locked);
            }
            Ok(())
        }

        async fn handle_action(&mut self, action: CounterAction, _ctx: &()) -> Result<u32, CounterError> {
            match action {
                CounterAction::Add(n) => {
                    self.value += n;
                    Ok(self.value)
                }
                CounterAction::Lock => {
                    self.locked = true;
                    Ok(self.value)
                }
            }
        }
    }

    #[tokio::test]
    async fn test_create_action_delete_cycle() {
        let (actor, client) = ResourceActor::<Counter>::new(8);
        let handle = tokio::spawn(actor.run(()));

        client.create("c1".into(), CounterCreate { start: 5 }).await.unwrap();
        assert!(client.exists("c1".into()).await.unwrap());
        assert_eq!(client.perform_action("c1".into(), CounterAction::Add(3)).await.unwrap(), 8);

        client.delete("c1".into()).await.unwrap();
        assert!(!client.exists("c1".into()).await.unwrap());

        drop(client);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_rejected() {
        let (actor, client) = ResourceActor::<Counter>::new(8);
        tokio::spawn(actor.run(()));

        client.create("c1".into(), CounterCreate { start: 1 }).await.unwrap();
        let err = client.create("c1".into(), CounterCreate { start: 2 }).await.unwrap_err();
        assert!(matches!(err, FrameworkError::AlreadyExists(id) if id == "c1"));
    }

    #[tokio::test]
    async fn test_entity_errors_reach_the_client() {
        let (actor, client) = ResourceActor::<Counter>::new(8);
        tokio::spawn(actor.run(()));

        let err = client.create("big".into(), CounterCreate { start: 500 }).await.unwrap_err();
        assert_eq!(err.into_entity_error::<CounterError>().unwrap(), CounterError::TooLarge);

        client.create("c2".into(), CounterCreate { start: 0 }).await.unwrap();
        client.perform_action("c2".into(), CounterAction::Lock).await.unwrap();
        let err = client.delete("c2".into()).await.unwrap_err();
        assert_eq!(err.into_entity_error::<CounterError>().unwrap(), CounterError::Locked);
        assert!(client.exists("c2".into()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_resource_is_not_found() {
        let (actor, client) = ResourceActor::<Counter>::new(8);
        tokio::spawn(actor.run(()));

        let err = client.perform_action("nope".into(), CounterAction::Add(1)).await.unwrap_err();
        assert!(matches!(err, FrameworkError::NotFound(_)));
    }
}
