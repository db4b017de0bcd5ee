//! # hub-client
//!
//! Client-side entity synchronization for model-hub.
//!
//! This is the library applications use to create, read, update, patch,
//! delete and list typed entities against a REST resource while sharing one
//! in-memory cache per entity type.
//!
//! ## Features
//!
//! - **Entity handles**: [`EntityHandle`] owns one entity's values and is
//!   updated in place with the authoritative server result
//! - **Request coalescing**: concurrent reads of the same id share one call
//! - **Live views**: every observer of an id sees each cache write
//! - **Transport abstraction**: pluggable transport layer (HTTP, mock)
//!
//! ## Example
//!
//! ```ignore
//! use model_hub_client::{FetchStrategy, HubConfig, HubRegistry};
//!
//! let registry = HubRegistry::http(HubConfig::default())?;
//! registry.register::<Product>();
//!
//! let mut product = registry.handle(Product::default());
//! product.read(5, FetchStrategy::StoreThenApi).await?;
//! product.name = Some("renamed".into());
//! let changed = product.changed_fields()?;
//! product.patch(&changed.iter().map(String::as_str).collect::<Vec<_>>()).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod handle;
pub mod registry;
pub mod transport;

pub use config::{ApiConfig, ConfigError, HubConfig};
pub use error::HubError;
pub use gateway::RemoteGateway;
pub use handle::{EntityHandle, FetchStrategy};
pub use registry::{Binding, HubRegistry};
pub use transport::{HttpTransport, Method, MockTransport, Request, Transport, TransportError};

pub use hub_core::{EntityCache, FetchClaim, LoadTicket, Subscription, ValueComparator};
pub use hub_types::{Entity, EntityId, FieldDescriptor, FieldKind, Record};
