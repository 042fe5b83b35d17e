// pipewright-core/src/error.rs
// Crate-wide error type

use crate::payload::PayloadShape;
use thiserror::Error;

/// Errors raised while assembling a pipeline or talking to a document store.
///
/// The first six variants are construction-time errors: they are raised
/// synchronously by the call that violates a builder invariant and are never
/// retryable. The remaining variants belong to the store boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage '{0}' already exists")]
    DuplicateStageName(String),

    #[error("stage '{0}' does not exist")]
    UnknownStageName(String),

    #[error("cannot merge {incoming} payload into {existing} payload: scalar payloads never merge")]
    UnmergeablePayload {
        existing: PayloadShape,
        incoming: PayloadShape,
    },

    #[error("cannot merge {incoming} payload into {existing} payload")]
    IncompatiblePayloadShapes {
        existing: PayloadShape,
        incoming: PayloadShape,
    },

    #[error("malformed arguments: {0}")]
    MalformedArguments(String),

    #[error("no stage priority left after {0}")]
    TooManyStages(u32),

    /// Failure reported by the store driver, passed through untouched.
    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("no document matched the filter")]
    DocumentNotFound,

    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    #[error("client has been shut down")]
    ClientClosed,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Wrap a driver error so it reaches the caller unchanged.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PipelineError::Store(Box::new(err))
    }

    /// True for the errors raised while declaring or mutating stages.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            PipelineError::DuplicateStageName(_)
                | PipelineError::UnknownStageName(_)
                | PipelineError::UnmergeablePayload { .. }
                | PipelineError::IncompatiblePayloadShapes { .. }
                | PipelineError::MalformedArguments(_)
                | PipelineError::TooManyStages(_)
        )
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
