use std::fmt;
use thiserror::Error;

/// Errors the publisher contract can surface.
#[derive(Debug)]
pub enum BusError {
    UnknownTopic(String),

    Marshal(String),

    ContextCancelled,

    Exhausted {
        topic: String,
        attempts: u32,
        source: String,
    },
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTopic(topic) => {
                write!(f, "no producer configured for topic '{topic}'")
            }
            Self::Marshal(msg) => write!(f, "failed to marshal message: {msg}"),
            Self::ContextCancelled => write!(f, "context cancelled"),
            Self::Exhausted {
                topic,
                attempts,
                source,
            } => write!(
                f,
                "publish exhausted after {attempts} attempts to topic '{topic}': {source}"
            ),
        }
    }
}

impl std::error::Error for BusError {}

pub type BusResult<T> = Result<T, BusError>;

/// Errors a consumer handler may return. `Transient` retries with backoff;
/// `Protocol` also retries (it will fail again, landing the poison message
/// on the DLQ).
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}
