//! Error types for the run loop.

pub mod unified;

pub use unified::ErrorCategory;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Primary error type for all run loop operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("No active run: events can only be published inside a run loop")]
    NoActiveRun,

    #[error("Event channel closed: the run loop is no longer receiving events")]
    ChannelClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Producer task failed: {0}")]
    Task(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl RuntimeError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Engine(_) => ErrorCategory::Engine,
            Self::NoActiveRun | Self::ChannelClosed => ErrorCategory::ContextMisuse,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Configuration(_) | Self::Io(_) => ErrorCategory::Configuration,
            Self::Task(_) => ErrorCategory::Task,
            Self::InvalidArgument(_) => ErrorCategory::InvalidInput,
        }
    }

    /// Whether this error ends the run it was raised in.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Engine | ErrorCategory::Task
        )
    }
}

impl From<toml::de::Error> for RuntimeError {
    fn from(error: toml::de::Error) -> Self {
        Self::Configuration(error.to_string())
    }
}

/// Failure reported by the computation engine that drives a run.
///
/// Cheap to clone so the same error can ride inside a `RunError` event and
/// still be handed back to whoever awaits the run.
#[derive(Clone)]
pub struct EngineError {
    inner: Arc<dyn std::error::Error + Send + Sync + 'static>,
}

#[derive(Debug, Error)]
#[error("{0}")]
struct MessageError(String);

impl EngineError {
    /// Wrap any error raised by the engine.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Build an engine error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(MessageError(message.into()))
    }

    /// Rendered messages of this error and every source below it, outermost first.
    pub fn cause_chain(&self) -> Vec<String> {
        let mut chain = vec![self.inner.to_string()];
        let mut current = self.inner.source();
        while let Some(cause) = current {
            chain.push(cause.to_string());
            current = cause.source();
        }
        chain
    }

    /// Attempt to view the wrapped error as a concrete type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Whether both handles point at the same underlying error.
    pub fn ptr_eq(&self, other: &EngineError) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync + 'static>> for EngineError {
    fn from(error: Box<dyn std::error::Error + Send + Sync + 'static>) -> Self {
        Self {
            inner: Arc::from(error),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("node 'planner' failed")]
    struct NodeFailure {
        #[source]
        source: std::io::Error,
    }

    #[test]
    fn cause_chain_walks_sources() {
        let err = EngineError::new(NodeFailure {
            source: std::io::Error::new(std::io::ErrorKind::Other, "socket reset"),
        });
        assert_eq!(
            err.cause_chain(),
            vec!["node 'planner' failed".to_string(), "socket reset".to_string()]
        );
    }

    #[test]
    fn downcast_recovers_concrete_error() {
        let err = EngineError::new(NodeFailure {
            source: std::io::Error::new(std::io::ErrorKind::Other, "x"),
        });
        assert!(err.downcast_ref::<NodeFailure>().is_some());
        assert!(err.downcast_ref::<std::io::Error>().is_none());
    }

    #[test]
    fn clones_share_the_same_error() {
        let err = EngineError::msg("boom");
        let copy = err.clone();
        assert!(err.ptr_eq(&copy));
        assert!(!err.ptr_eq(&EngineError::msg("boom")));
    }

    #[test]
    fn engine_errors_are_fatal() {
        let err = RuntimeError::from(EngineError::msg("boom"));
        assert_eq!(err.category(), ErrorCategory::Engine);
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "Engine error: boom");
        assert!(!RuntimeError::NoActiveRun.is_fatal());
    }
}
