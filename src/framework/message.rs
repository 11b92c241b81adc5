//! # Resource Messages
//!
//! The request envelope carried from [`ResourceClient`](crate::framework::ResourceClient)
//! to [`ResourceActor`](crate::framework::ResourceActor).

use crate::framework::entity::ActorEntity;
use crate::framework::error::FrameworkError;
use tokio::sync::oneshot;

/// One-shot channel the actor answers on.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// A request for the actor.
///
/// The lifecycle verbs (`Create`, `Exists`, `Delete`) are shared by every
/// resource; everything else a resource can do goes through `Action` with the
/// resource's own [`ActorEntity::Action`] payload.
#[derive(Debug)]
pub enum ResourceRequest<T: ActorEntity> {
    Create {
        id: T::Id,
        params: T::Create,
        respond_to: Response<()>,
    },
    Exists {
        id: T::Id,
        respond_to: Response<bool>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<()>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}

impl<T: ActorEntity> ResourceRequest<T> {
    /// Resource the request is addressed to.
    pub fn id(&self) -> &T::Id {
        match self {
            ResourceRequest::Create { id, .. }
            | ResourceRequest::Exists { id, .. }
            | ResourceRequest::Delete { id, .. }
            | ResourceRequest::Action { id, .. } => id,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            ResourceRequest::Create { .. } => "create",
            ResourceRequest::Exists { .. } => "exists",
            ResourceRequest::Delete { .. } => "delete",
            ResourceRequest::Action { .. } => "action",
        }
    }
}
