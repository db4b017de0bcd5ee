//! Error types for the entity cache.

use hub_types::{EntityId, TypesError};
use thiserror::Error;

/// Errors surfaced by [`EntityCache`](crate::EntityCache) reads and writes.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backing a subscription was dropped.
    #[error("entity cache closed")]
    Closed,

    /// The in-flight fetch this caller was waiting on failed.
    #[error("fetch of {id} failed: {reason}")]
    FetchFailed {
        /// The id whose fetch failed.
        id: EntityId,
        /// Display form of the underlying error.
        reason: String,
    },

    /// A local patch produced a record that no longer fits the entity type.
    #[error("record conversion failed: {0}")]
    Conversion(#[from] TypesError),
}
