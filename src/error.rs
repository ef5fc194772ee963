//! Error types for the dispatcher and its infrastructure.

/// Failure of an asynchronous dispatch pass, as reported by its future.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError<E> {
    #[error("Subscriber handler failed: {0}")]
    Handler(E),

    #[error("Dispatch task panicked: {message}")]
    Panicked { message: String },

    #[error("Dispatch task was dropped before it completed")]
    Cancelled,
}

impl<E> DispatchError<E> {
    /// Returns the handler error, if the pass was aborted by one.
    pub fn handler_error(&self) -> Option<&E> {
        match self {
            DispatchError::Handler(e) => Some(e),
            _ => None,
        }
    }

    /// Consumes the error and returns the handler error, if any.
    pub fn into_handler_error(self) -> Option<E> {
        match self {
            DispatchError::Handler(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Invalid value for config key \"{key}\": {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Configuration error: {msg}")]
    ConfigurationError { msg: String },

    #[error("Failed to build executor runtime: {0}")]
    RuntimeBuild(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_handler_error_accessors() {
        let err = DispatchError::Handler(Boom);
        assert_eq!(err.handler_error(), Some(&Boom));
        assert_eq!(err.to_string(), "Subscriber handler failed: boom");
        assert_eq!(err.into_handler_error(), Some(Boom));

        let err: DispatchError<Boom> = DispatchError::Cancelled;
        assert!(err.handler_error().is_none());
        assert!(err.into_handler_error().is_none());
    }

    #[test]
    fn test_panicked_message() {
        let err: DispatchError<Boom> = DispatchError::Panicked {
            message: "index out of bounds".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Dispatch task panicked: index out of bounds"
        );
    }
}
