//! Error types for model-hub client operations.

use hub_core::CacheError;
use hub_types::{EntityId, TypesError};
use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned by gateways, handles and the registry.
#[derive(Debug, Error)]
pub enum HubError {
    /// A handle was used before its cache or gateway was bound.
    #[error("{dependency} is missing from the model {entity}")]
    MissingDependency {
        /// The missing collaborator.
        dependency: &'static str,
        /// Entity type name.
        entity: &'static str,
    },

    /// `patch` was called with no field names.
    #[error("patch of {entity} needs at least one field name")]
    EmptyPatch {
        /// Entity type name.
        entity: &'static str,
    },

    /// `patch` named a field the entity does not have.
    #[error("{entity} has no field named {field:?}")]
    UnknownField {
        /// The offending field name.
        field: String,
        /// Entity type name.
        entity: &'static str,
    },

    /// A cache comparison needed an entity that is not cached.
    #[error("{entity} {id} is not cached")]
    NotCached {
        /// Entity type name.
        entity: &'static str,
        /// The id that was looked up.
        id: EntityId,
    },

    /// Network or HTTP failure, passed through unchanged.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Cache failure, including rejection of a coalesced read.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Entity (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A detached gateway task panicked or was aborted.
    #[error("gateway task failed: {0}")]
    Task(String),
}

impl HubError {
    /// Whether this is a binding/configuration problem.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingDependency { .. })
    }

    /// Whether this error was raised before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyPatch { .. } | Self::UnknownField { .. })
    }
}

impl From<TypesError> for HubError {
    fn from(e: TypesError) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for HubError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
