//! Errors raised by the actor plumbing itself, as opposed to the resources it hosts.

/// Errors that can occur between a [`ResourceClient`](crate::framework::ResourceClient)
/// and its actor.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),
    #[error("Entity error: {0}")]
    EntityError(Box<dyn std::error::Error + Send + Sync>),
}

impl FrameworkError {
    /// Recover the resource's own error type, if that is what this wraps.
    pub fn into_entity_error<E>(self) -> Result<E, Self>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match self {
            FrameworkError::EntityError(inner) => match inner.downcast::<E>() {
                Ok(e) => Ok(*e),
                Err(other) => Err(FrameworkError::EntityError(other)),
            },
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("bucket is locked")]
    struct Locked;

    #[test]
    fn entity_error_downcasts_to_original_type() {
        let err = FrameworkError::EntityError(Box::new(Locked));
        assert_eq!(err.into_entity_error::<Locked>().unwrap(), Locked);
    }

    #[test]
    fn plumbing_errors_are_returned_unchanged() {
        let err = FrameworkError::NotFound("b1".into());
        let back = err.into_entity_error::<Locked>().unwrap_err();
        assert!(matches!(back, FrameworkError::NotFound(id) if id == "b1"));
    }
}
