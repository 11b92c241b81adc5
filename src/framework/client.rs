//! # Resource Client
//!
//! The cheap, cloneable handle used to talk to a [`ResourceActor`](crate::framework::ResourceActor).

use crate::framework::entity::ActorEntity;
use crate::framework::error::FrameworkError;
use crate::framework::message::{ResourceRequest, Response};
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

/// Sends requests to an actor and awaits the answer.
///
/// Holds only the channel sender, so clones share the same actor. Dropping
/// every clone ends the actor loop.
pub struct ResourceClient<T: ActorEntity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

impl<T: ActorEntity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: ActorEntity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    /// Build a request around a fresh reply channel, send it, wait for the reply.
    async fn call<R>(
        &self,
        build: impl FnOnce(Response<R>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, reply) = oneshot::channel();
        let request = build(respond_to);
        trace!(verb = request.verb(), id = %request.id(), "Sending request");
        self.sender
            .send(request)
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        reply.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(&self, id: T::Id, params: T::Create) -> Result<(), FrameworkError> {
        self.call(|respond_to| ResourceRequest::Create {
            id,
            params,
            respond_to,
        })
        .await
    }

    pub async fn exists(&self, id: T::Id) -> Result<bool, FrameworkError> {
        self.call(|respond_to| ResourceRequest::Exists { id, respond_to })
            .await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), FrameworkError> {
        self.call(|respond_to| ResourceRequest::Delete { id, respond_to })
            .await
    }

    pub async fn perform_action(
        &self,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError> {
        self.call(|respond_to| ResourceRequest::Action {
            id,
            action,
            respond_to,
        })
        .await
    }
}
