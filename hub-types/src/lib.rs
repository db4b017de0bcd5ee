//! # hub-types
//!
//! Foundational types shared by every model-hub crate:
//! - [`EntityId`] - identity of a synchronized record
//! - [`FieldDescriptor`], [`FieldKind`] - per-type field semantics
//! - [`Entity`] - the trait a domain type implements to be synchronized
//! - [`TypesError`] - error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod entity;
mod error;
mod field;
mod id;

pub use entity::{Entity, Record};
pub use error::TypesError;
pub use field::{FieldDescriptor, FieldKind};
pub use id::EntityId;
