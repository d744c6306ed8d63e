//! Error types for building, dispatching and interpreting requests.
//!
//! # Design
//! Each failure kind has its own type so a caller can tell where a call went
//! wrong without string matching:
//! - `BuildError` comes back synchronously from the builder call that caused it.
//! - `DispatchError` means the transport call never completed.
//! - `ResponseRejection` means the call completed with a non-2xx status. Only
//!   the `receive_*` helpers produce it.
//! - `DecodeError` means a 2xx body could not be deserialized.
//!
//! `RestError` aggregates all four for the async entry points.

use thiserror::Error;
use url::Url;

use crate::http::HttpMethod;

/// Errors raised while assembling a `RestRequest`.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The seed URI could not be parsed as an absolute URI.
    #[error("invalid URI {uri:?}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    /// The seed URI is absolute but has no hierarchical path (e.g. `mailto:`).
    #[error("URI {uri} cannot carry path segments")]
    NotABase { uri: String },

    /// A path segment is `.` or `..`, which URI normalization would remove.
    #[error("path segment {segment:?} contains a dot segment")]
    DotSegment { segment: String },

    /// The header was already added to this request.
    #[error("header {name:?} has already been added")]
    DuplicateHeader { name: String },

    #[error("invalid header name {name:?}")]
    InvalidHeaderName { name: String },

    #[error("invalid value for header {name:?}")]
    InvalidHeaderValue { name: String },

    #[error("header {name:?} has no values")]
    EmptyHeader { name: String },

    /// A cancellation handle is already attached to this request.
    #[error("a cancellation token is already attached")]
    CancellationAlreadySet,

    /// A value passed as a field record did not serialize to an object.
    #[error("expected a record with named fields, found {found}")]
    NotARecord { found: &'static str },

    #[error("failed to serialize fields: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures reported by a `Transport`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    /// The wire request could not be constructed or was refused locally.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response body could not be read to completion.
    #[error("failed to read response body: {0}")]
    Body(String),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_builder() || err.is_request() {
            Self::InvalidRequest(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Other(Box::new(err))
        }
    }
}

/// Why a dispatch did not complete.
#[derive(Debug, Error)]
pub enum DispatchFailure {
    #[error("request was cancelled")]
    Cancelled,

    /// The JSON body could not be serialized.
    #[error("failed to serialize request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The transport call for a request did not complete.
#[derive(Debug, Error)]
#[error("failed to execute {method} request to {url}: {cause}")]
pub struct DispatchError {
    pub method: HttpMethod,
    pub url: Url,
    #[source]
    pub cause: DispatchFailure,
}

impl DispatchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause, DispatchFailure::Cancelled)
    }
}

/// The call completed but the status was outside the 2xx range.
#[derive(Debug, Error)]
#[error("[{method}]{url} returned HTTP {status}: {body}")]
pub struct ResponseRejection {
    pub method: HttpMethod,
    pub url: Url,
    pub status: u16,
    /// Response body read as text, empty if it could not be captured.
    pub body: String,
}

/// A 2xx response body could not be deserialized into the requested type.
#[derive(Debug, Error)]
#[error("[{method}]{url} returned HTTP {status} with an undecodable body: {source}")]
pub struct DecodeError {
    pub method: HttpMethod,
    pub url: Url,
    pub status: u16,
    #[source]
    pub source: serde_json::Error,
}

/// Top-level error for every request operation.
#[derive(Debug, Error)]
pub enum RestError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Rejected(#[from] ResponseRejection),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl RestError {
    /// The HTTP status of the exchange, if one completed.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Rejected(e) => Some(e.status),
            Self::Decode(e) => Some(e.status),
            Self::Build(_) | Self::Dispatch(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Dispatch(e) if e.is_cancelled())
    }
}
