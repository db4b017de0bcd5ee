//! Transport abstraction for model-hub.
//!
//! This module provides a pluggable transport layer that abstracts the
//! underlying HTTP client (reqwest, mock for testing).
//!
//! # Design
//!
//! A transport executes one JSON [`Request`] and returns the decoded JSON
//! response body:
//! - a 2xx response yields its body (`null` when empty)
//! - any other status is a [`TransportError::Status`]
//! - connection problems are [`TransportError::Connection`] or
//!   [`TransportError::Timeout`]
//!
//! Retries and authentication belong to the transport, not to the gateway.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_json(json!({"id": 5, "name": "a"}));
//! let body = transport.execute(Request::get("http://host/items/5")).await?;
//! ```

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The request could not be built or sent.
    #[error("request failed: {0}")]
    Request(String),
}

/// HTTP method of a REST call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Full update.
    Put,
    /// Partial update.
    Patch,
    /// Delete.
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A single REST call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute URI.
    pub uri: String,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl Request {
    /// A request without a body.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            body: None,
        }
    }

    /// `GET uri`.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::Get, uri)
    }

    /// `DELETE uri`.
    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new(Method::Delete, uri)
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Transport trait for executing REST calls.
///
/// Implementations handle the underlying HTTP mechanism
/// (reqwest, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `request` and return the decoded response body.
    ///
    /// An empty success body decodes to [`Value::Null`].
    async fn execute(&self, request: Request) -> Result<Value, TransportError>;
}
