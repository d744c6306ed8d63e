//! Wire-level HTTP types exchanged with the transport.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! dispatcher assembles an `HttpRequest` from a `RestRequest` and hands it to
//! a `Transport`; the transport returns an `HttpResponse`. Nothing in this
//! module performs I/O.
//!
//! Headers are kept as an ordered list of `(name, value)` pairs so a name
//! with several values maps to several entries in the order they were added.

use bytes::Bytes;
use strum::{Display, EnumString};
use url::Url;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Delete,
    Post,
    Put,
    Patch,
}

impl HttpMethod {
    /// How much of the response the transport has to wait for.
    ///
    /// `HEAD` responses never carry a body, so only the headers are awaited.
    pub fn completion_mode(self) -> CompletionMode {
        match self {
            Self::Head => CompletionMode::HeadersOnly,
            _ => CompletionMode::FullBody,
        }
    }
}

/// Completion semantics requested from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Resolve as soon as the status line and headers are available.
    HeadersOnly,
    /// Resolve once the whole body has been read.
    FullBody,
}

/// A request payload together with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub content: Bytes,
    pub content_type: Option<String>,
}

impl Body {
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
            content_type: None,
        }
    }

    /// A UTF-8 text payload sent as `text/plain; charset=utf-8`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text.into()).with_content_type("text/plain; charset=utf-8")
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// An HTTP request described as plain data.
///
/// Built by `RestRequest::create_request_message`. A `Transport` is
/// responsible for putting it on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl HttpRequest {
    /// Values of every header entry named `name`, compared case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data, as returned by a `Transport`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}
