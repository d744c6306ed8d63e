//! Fluent builder for the URI, headers and cancellation of one request.
//!
//! # Design
//! `RestRequest` is a plain value. Every `with_*` method consumes the request
//! and returns the extended one, so branching a partially built request is an
//! explicit `clone()` and two branches never share state. The request is
//! append-only: nothing removes or edits a segment, parameter or header once
//! it has been added.
//!
//! The final URI is produced on demand by `uri()`. Path segments are appended
//! through `url::PathSegmentsMut` after dropping every trailing empty segment
//! of the base, so exactly one `/` separates the existing path from the new
//! segments however many slashes the base ends with. Query pairs are
//! form-urlencoded after any query the seed URI already had, in insertion
//! order.

use std::fmt;
use std::str::FromStr;

use reqwest::header::{HeaderName, HeaderValue};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::BuildError;
use crate::fields::{FieldSet, FieldValue, Fields};
use crate::http::{Body, HttpMethod, HttpRequest};

const AUTHORIZATION: &str = "Authorization";
const CONTENT_TYPE: &str = "content-type";

/// The accumulated, not-yet-sent description of one HTTP request.
#[derive(Debug, Clone)]
pub struct RestRequest {
    base: Url,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    headers: Vec<(String, Vec<String>)>,
    cancellation: Option<CancellationToken>,
}

impl RestRequest {
    /// Parses `uri` and seeds a request with it.
    ///
    /// Fails if `uri` is not absolute or has no hierarchical path.
    pub fn from_uri(uri: &str) -> Result<Self, BuildError> {
        let url = Url::parse(uri).map_err(|source| BuildError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;
        Self::from_url(url)
    }

    pub fn from_url(url: Url) -> Result<Self, BuildError> {
        if url.cannot_be_a_base() {
            return Err(BuildError::NotABase {
                uri: url.to_string(),
            });
        }
        Ok(Self {
            base: url,
            segments: Vec::new(),
            query: Vec::new(),
            headers: Vec::new(),
            cancellation: None,
        })
    }

    // -----------------------------------------------------------------------
    // Path
    // -----------------------------------------------------------------------

    /// Appends a path segment.
    ///
    /// Leading and trailing slashes on `segment` are ignored; an interior
    /// slash splits it into several segments. Segments are raw text and are
    /// never treated as already percent-encoded, so `%` is always escaped.
    ///
    /// A `.` or `..` piece is rejected, since URI normalization would
    /// silently drop or resolve it.
    pub fn with_path_segment(self, segment: impl FieldValue) -> Result<Self, BuildError> {
        self.with_path_segments([segment])
    }

    /// Appends several segments in order. Nothing is appended if any of them
    /// is rejected.
    pub fn with_path_segments<I>(mut self, segments: I) -> Result<Self, BuildError>
    where
        I: IntoIterator,
        I::Item: FieldValue,
    {
        let mut appended = Vec::new();
        for segment in segments {
            let raw = segment.field_value().unwrap_or_default();
            if split_segment(&raw).any(|piece| piece == "." || piece == "..") {
                return Err(BuildError::DotSegment { segment: raw });
            }
            appended.extend(split_segment(&raw).map(str::to_string));
        }
        self.segments.append(&mut appended);
        Ok(self)
    }

    // -----------------------------------------------------------------------
    // Query
    // -----------------------------------------------------------------------

    /// Appends `key=value`. An absent value appends `key=`.
    pub fn with_query_parameter(mut self, key: impl Into<String>, value: impl FieldValue) -> Self {
        self.query
            .push((key.into(), value.field_value().unwrap_or_default()));
        self
    }

    /// Appends one `key=value` entry per value, in order.
    pub fn with_query_values<I>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: FieldValue,
    {
        let key = key.into();
        for value in values {
            self.query
                .push((key.clone(), value.field_value().unwrap_or_default()));
        }
        self
    }

    /// Appends one query parameter per field.
    pub fn with_query_parameters(mut self, fields: impl Fields) -> Self {
        for (key, value) in fields.fields() {
            self.query.push((key, value.unwrap_or_default()));
        }
        self
    }

    /// Appends one query parameter per top-level field of a serde record.
    pub fn with_query_object<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, BuildError> {
        let fields = FieldSet::from_serialize(value)?;
        Ok(self.with_query_parameters(fields))
    }

    // -----------------------------------------------------------------------
    // Headers
    // -----------------------------------------------------------------------

    /// Adds a header with a single value.
    ///
    /// Fails if a header with the same name (ignoring ASCII case) was already
    /// added, or if the name or value is not valid on the wire.
    pub fn with_header(self, key: impl Into<String>, value: impl FieldValue) -> Result<Self, BuildError> {
        self.with_header_values(key, [value])
    }

    /// Adds a header carrying each of `values`, in order. At least one value
    /// is required.
    pub fn with_header_values<I>(mut self, key: impl Into<String>, values: I) -> Result<Self, BuildError>
    where
        I: IntoIterator,
        I::Item: FieldValue,
    {
        let name = key.into();
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(BuildError::InvalidHeaderName { name });
        }
        if self.header(&name).is_some() {
            return Err(BuildError::DuplicateHeader { name });
        }

        let mut rendered = Vec::new();
        for value in values {
            let value = value.field_value().unwrap_or_default();
            if HeaderValue::from_str(&value).is_err() {
                return Err(BuildError::InvalidHeaderValue { name });
            }
            rendered.push(value);
        }
        if rendered.is_empty() {
            return Err(BuildError::EmptyHeader { name });
        }
        self.headers.push((name, rendered));
        Ok(self)
    }

    /// Adds one header per field, failing on the first invalid or repeated name.
    pub fn with_headers(self, fields: impl Fields) -> Result<Self, BuildError> {
        fields
            .fields()
            .into_iter()
            .try_fold(self, |request, (key, value)| request.with_header(key, value))
    }

    pub fn with_headers_object<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, BuildError> {
        let fields = FieldSet::from_serialize(value)?;
        self.with_headers(fields)
    }

    /// Adds `Authorization: bearer {token}`.
    pub fn with_bearer_token(self, token: impl fmt::Display) -> Result<Self, BuildError> {
        self.with_header(AUTHORIZATION, format!("bearer {token}"))
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Attaches the token a dispatch of this request observes.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Result<Self, BuildError> {
        if self.cancellation.is_some() {
            return Err(BuildError::CancellationAlreadySet);
        }
        self.cancellation = Some(token);
        Ok(self)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The URI the request was seeded with.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The final URI: base, appended path segments and appended query.
    pub fn uri(&self) -> Url {
        let mut url = self.base.clone();
        if !self.segments.is_empty() {
            let trailing_empty = url
                .path_segments()
                .map_or(0, |base| base.rev().take_while(|s| s.is_empty()).count());
            if let Ok(mut path) = url.path_segments_mut() {
                for _ in 0..trailing_empty {
                    path.pop_if_empty();
                }
                path.extend(&self.segments);
            }
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        url
    }

    /// Path segments appended after the base path.
    pub fn path_segments(&self) -> &[String] {
        &self.segments
    }

    /// Query pairs appended after the base query.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &[(String, Vec<String>)] {
        &self.headers
    }

    /// Values of the header `name`, compared ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Assembles the wire request for `method`.
    ///
    /// Each header value becomes its own entry, in insertion order. A body
    /// with a content type adds a `content-type` header unless one was set
    /// explicitly.
    pub fn create_request_message(&self, method: HttpMethod, body: Option<Body>) -> HttpRequest {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.clone(), v.clone())))
            .collect();

        if let Some(content_type) = body.as_ref().and_then(|b| b.content_type.clone()) {
            if self.header(CONTENT_TYPE).is_none() {
                headers.push((CONTENT_TYPE.to_string(), content_type));
            }
        }

        HttpRequest {
            method,
            url: self.uri(),
            headers,
            body,
        }
    }
}

/// Two requests are equal when they target the same URI with the same
/// headers. Attached cancellation tokens are not compared.
/// The non-empty pieces of a segment split on `/`.
fn split_segment(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('/').filter(|piece| !piece.is_empty())
}

impl PartialEq for RestRequest {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.segments == other.segments
            && self.query == other.query
            && self.headers == other.headers
    }
}

impl FromStr for RestRequest {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}

impl TryFrom<&str> for RestRequest {
    type Error = BuildError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_uri(value)
    }
}

impl TryFrom<Url> for RestRequest {
    type Error = BuildError;

    fn try_from(value: Url) -> Result<Self, Self::Error> {
        Self::from_url(value)
    }
}

/// Starts a `RestRequest` from an already parsed URL.
pub trait UrlExt {
    fn into_rest_request(self) -> Result<RestRequest, BuildError>;
}

impl UrlExt for Url {
    fn into_rest_request(self) -> Result<RestRequest, BuildError> {
        RestRequest::from_url(self)
    }
}
