//! Fluent request building and dispatch on top of a pluggable HTTP transport.
//!
//! # Overview
//! A `RestRequest` accumulates a URI (path segments, query parameters),
//! headers and an optional cancellation token through chained `with_*`
//! calls. A `RestClient` sends it as GET/HEAD/DELETE/POST/PUT/PATCH, with an
//! optional JSON or raw body, through a shared `Transport`. `ReceiveExt`
//! turns the pending response into text, bytes or a deserialized value.
//!
//! ```rust,ignore
//! use rest_request::{ReceiveExt, RestClient, RestRequest};
//!
//! let client = RestClient::with_default_transport()?;
//! let request = RestRequest::from_uri("https://example.com")?
//!     .with_path_segments(["api", "entity"])?
//!     .with_query_values("tag", ["red", "blue"])
//!     .with_bearer_token(token)?;
//! let entities: Vec<Entity> = client.get(&request).receive_json().await?;
//! ```
//!
//! # Design
//! - Builders are values: each call consumes the request and returns the
//!   extended one. Header names are unique; adding one twice is an error.
//! - Dispatch only fails when the exchange did not complete. Non-2xx
//!   statuses become errors in the `receive_*` helpers, never earlier.
//! - The transport handle is owned by the client; there is no global.

pub mod client;
pub mod codec;
pub mod error;
pub mod fields;
pub mod http;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{RestClient, RestClientBuilder};
pub use codec::JsonCodec;
pub use error::{
    BuildError, DecodeError, DispatchError, DispatchFailure, ResponseRejection, RestError,
    TransportError,
};
pub use fields::{FieldSet, FieldValue, Fields};
pub use http::{Body, CompletionMode, HttpMethod, HttpRequest, HttpResponse};
pub use request::{RestRequest, UrlExt};
pub use response::{ReceiveExt, RestResponse};
pub use tokio_util::sync::CancellationToken;
pub use transport::{ReqwestTransport, ReqwestTransportBuilder, Transport};
