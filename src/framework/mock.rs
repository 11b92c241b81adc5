//! # Channel-level Mocks
//!
//! Utilities for testing client wrappers without spawning a
//! [`ResourceActor`](crate::framework::ResourceActor).
//!
//! [`create_mock_client`] hands back a real [`ResourceClient`] together with
//! the receiving end of its channel. The test plays the actor: it pulls the
//! next request with one of the `expect_*` helpers, asserts on it, and answers
//! through the responder. This makes error injection trivial.
//!
//! ```rust,ignore
//! let (client, mut receiver) = create_mock_client::<Bucket>(8);
//! let store = SimulatedObjectStore::from_client(client);
//! let task = tokio::spawn(async move { store.delete_bucket("demo").await });
//!
//! let (id, responder) = expect_delete(&mut receiver).await.unwrap();
//! assert_eq!(id, "demo");
//! responder.send(Ok(())).unwrap();
//! ```

use crate::framework::{ActorEntity, FrameworkError, ResourceClient, ResourceRequest, Response};
use tokio::sync::mpsc;

/// A client wired to a channel the test reads from.
pub fn create_mock_client<T: ActorEntity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Next message must be a `Create`.
pub async fn expect_create<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Create, Response<()>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create {
            id,
            params,
            respond_to,
        }) => Some((id, params, respond_to)),
        _ => None,
    }
}

/// Next message must be a `Delete`.
pub async fn expect_delete<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Response<()>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Delete { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Next message must be an `Action`.
pub async fn expect_action<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Response<T::ActionResult>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action {
            id,
            action,
            respond_to,
        }) => Some((id, action, respond_to)),
        _ => None,
    }
}

/// Wrap a domain error the way the actor loop would before answering.
pub fn entity_error<E>(error: E) -> FrameworkError
where
    E: std::error::Error + Send + Sync + 'static,
{
    FrameworkError::EntityError(Box::new(error))
}
