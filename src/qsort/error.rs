use std::any::Any;

use thiserror::Error;

/// Errors surfaced by a top-level sort call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    /// A thread panicked while sorting, typically inside a user `Ord` impl.
    #[error("sort panicked: {message}")]
    Panicked { message: String },

    /// A chunk's result slot was dropped before any thread sorted it.
    #[error("chunk was dropped before it was sorted")]
    ChunkAbandoned,
}

impl SortError {
    /// Convert a caught panic payload into a `SortError`.
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        let payload = match payload.downcast::<SortError>() {
            Ok(err) => return *err,
            Err(other) => other,
        };
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        SortError::Panicked { message }
    }
}

/// Errors from parsing sort configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid worker count '{0}'")]
    InvalidWorkerCount(String),
}
