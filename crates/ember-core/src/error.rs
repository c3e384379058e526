//! Error types for Ember

use thiserror::Error;

/// The main error type for Ember operations
#[derive(Debug, Error)]
pub enum EmberError {
    #[error("unsupported primitive topology: {0}")]
    UnsupportedTopology(String),

    #[error("emitter not found: {0}")]
    EmitterNotFound(u64),

    #[error("composition not found: {0}")]
    CompositionNotFound(u64),

    #[error("emitter {emitter} does not belong to composition {composition}")]
    NotACompositionMember { emitter: u64, composition: u64 },
}

/// Result type alias for Ember operations
pub type Result<T> = std::result::Result<T, EmberError>;
