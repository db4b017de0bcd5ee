//! Error types for model-hub identity handling.

use thiserror::Error;

/// Errors raised while building or parsing shared types.
#[derive(Debug, Error)]
pub enum TypesError {
    /// An identifier string was empty.
    #[error("entity id must not be empty")]
    EmptyId,

    /// An entity did not serialize to a JSON object.
    #[error("entity {entity} did not serialize to an object")]
    NotAnObject {
        /// Type name of the offending entity.
        entity: &'static str,
    },

    /// JSON conversion failed.
    #[error("json conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}
