//! Interpretation of completed exchanges.
//!
//! # Design
//! A dispatch succeeds whenever the transport completed the exchange, no
//! matter the status. Status interpretation happens here and only when the
//! caller asks for it: `receive_json`, `receive_string` and `receive_stream`
//! turn a non-2xx status into a `ResponseRejection`, while `receive` hands
//! the raw response back untouched.

use std::future::Future;

use bytes::buf::Reader;
use bytes::{Buf, Bytes};
use serde::de::DeserializeOwned;
use tracing::warn;
use url::Url;

use crate::codec::JsonCodec;
use crate::error::{DecodeError, ResponseRejection, RestError};
use crate::http::{HttpMethod, HttpResponse};

/// A completed exchange together with the request that produced it.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub method: HttpMethod,
    pub url: Url,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RestResponse {
    pub fn new(method: HttpMethod, url: Url, response: HttpResponse) -> Self {
        Self {
            method,
            url,
            status: response.status,
            headers: response.headers,
            body: response.body,
        }
    }

    /// `true` for any status in `200..=299`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of the header `name`, compared ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        self.json_with(&JsonCodec::default())
    }

    pub fn json_with<T: DeserializeOwned>(&self, codec: &JsonCodec) -> Result<T, DecodeError> {
        codec.decode(&self.body).map_err(|source| DecodeError {
            method: self.method,
            url: self.url.clone(),
            status: self.status,
            source,
        })
    }

    /// Returns the response if its status is 2xx, else a rejection carrying
    /// the status and body text.
    pub fn error_for_status(self) -> Result<Self, ResponseRejection> {
        if self.is_success() {
            return Ok(self);
        }
        let body = self.text();
        warn!(
            http.method = %self.method,
            http.url = %self.url,
            http.status_code = self.status,
            "response rejected"
        );
        Err(ResponseRejection {
            method: self.method,
            url: self.url,
            status: self.status,
            body,
        })
    }

    /// The body as a `std::io::Read` source.
    pub fn into_reader(self) -> Reader<Bytes> {
        self.body.reader()
    }
}

fn json_body<T: DeserializeOwned>(response: RestResponse, codec: &JsonCodec) -> Result<T, RestError> {
    let response = response.error_for_status()?;
    Ok(response.json_with(codec)?)
}

/// Response interpretation for any pending dispatch.
///
/// ```rust,ignore
/// let entity: Entity = client
///     .get(&request)
///     .receive_json()
///     .await?;
/// ```
pub trait ReceiveExt: Future<Output = Result<RestResponse, RestError>> + Send + Sized {
    /// Awaits the response without looking at its status.
    fn receive(self) -> impl Future<Output = Result<RestResponse, RestError>> + Send {
        self
    }

    /// Awaits the response and decodes a 2xx body as `T`.
    fn receive_json<T: DeserializeOwned>(self) -> impl Future<Output = Result<T, RestError>> + Send {
        self.receive_json_with(JsonCodec::default())
    }

    fn receive_json_with<T: DeserializeOwned>(
        self,
        codec: JsonCodec,
    ) -> impl Future<Output = Result<T, RestError>> + Send {
        async move { self.await.and_then(|response| json_body(response, &codec)) }
    }

    /// Awaits the response and returns a 2xx body as text.
    fn receive_string(self) -> impl Future<Output = Result<String, RestError>> + Send {
        async move {
            self.await
                .and_then(|response| Ok(response.error_for_status()?.text()))
        }
    }

    /// Awaits the response and returns a 2xx body as a byte reader.
    fn receive_stream(self) -> impl Future<Output = Result<Reader<Bytes>, RestError>> + Send {
        async move {
            self.await
                .and_then(|response| Ok(response.error_for_status()?.into_reader()))
        }
    }
}

impl<F> ReceiveExt for F where F: Future<Output = Result<RestResponse, RestError>> + Send {}

#[cfg(test)]
mod tests {
    use std::future::ready;
    use std::io::Read;

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Entity {
        id: i64,
    }

    fn response(status: u16, body: &'static str) -> RestResponse {
        RestResponse {
            method: HttpMethod::Get,
            url: Url::parse("https://example.com/api/entity/1").unwrap(),
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    fn pending(status: u16, body: &'static str) -> impl Future<Output = Result<RestResponse, RestError>> + Send {
        ready(Ok(response(status, body)))
    }

    #[tokio::test]
    async fn receive_json_decodes_success() {
        let entity: Entity = pending(200, r#"{"id":1}"#).receive_json().await.unwrap();
        assert_eq!(entity, Entity { id: 1 });
    }

    #[tokio::test]
    async fn receive_string_returns_body_text() {
        let text = pending(200, r#"{"id":1}"#).receive_string().await.unwrap();
        assert_eq!(text, r#"{"id":1}"#);
    }

    #[tokio::test]
    async fn receive_passes_error_status_through() {
        let raw = pending(404, "not found").receive().await.unwrap();
        assert_eq!(raw.status, 404);
        assert_eq!(raw.text(), "not found");
    }

    #[tokio::test]
    async fn receive_json_rejects_error_status() {
        let err = pending(404, "not found")
            .receive_json::<Entity>()
            .await
            .unwrap_err();
        match err {
            RestError::Rejected(rejection) => {
                assert_eq!(rejection.status, 404);
                assert_eq!(rejection.body, "not found");
                assert_eq!(rejection.method, HttpMethod::Get);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn receive_string_rejects_error_status() {
        let err = pending(404, "not found").receive_string().await.unwrap_err();
        assert!(matches!(&err, RestError::Rejected(r) if r.status == 404 && r.body == "not found"));
        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test]
    async fn receive_json_reports_decode_failure() {
        let err = pending(200, "not json").receive_json::<Entity>().await.unwrap_err();
        assert!(matches!(err, RestError::Decode(ref e) if e.status == 200));
    }

    #[tokio::test]
    async fn receive_json_with_accepts_empty_body() {
        let codec = JsonCodec::new().empty_body_as_null(true);
        let entity: Option<Entity> = pending(204, "").receive_json_with(codec).await.unwrap();
        assert_eq!(entity, None);
    }

    #[tokio::test]
    async fn receive_stream_reads_body() {
        let mut reader = pending(200, "bytes").receive_stream().await.unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "bytes");
    }

    #[tokio::test]
    async fn receive_stream_rejects_error_status() {
        let err = pending(500, "boom").receive_stream().await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let r = response(200, "");
        assert_eq!(r.header("content-type"), Some("application/json"));
        assert_eq!(r.header("x-missing"), None);
    }

    #[test]
    fn success_range_is_2xx() {
        assert!(response(200, "").is_success());
        assert!(response(299, "").is_success());
        assert!(!response(199, "").is_success());
        assert!(!response(300, "").is_success());
    }
}
