//! # hub-core
//!
//! Local logic for model-hub: nothing in this crate talks to the network.
//!
//! - [`compare`] - generic clone, shallow diff, structural equality and
//!   descriptor-driven copy over entity records
//! - [`date`] - lenient date-string coercion used by the copy engine
//! - [`cache`] - the per-type in-memory [`EntityCache`] with live
//!   subscriptions and in-flight fetch tracking
//!
//! The network side lives in `hub-client`, which writes successful
//! responses into the cache defined here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod compare;
pub mod date;
mod error;

pub use cache::{EntityCache, FetchClaim, LoadTicket, Subscription};
pub use compare::ValueComparator;
pub use date::{coerce_date, parse_date};
pub use error::CacheError;
