//! Dispatch of built requests through a shared transport.
//!
//! # Design
//! `RestClient` holds the transport handle and the JSON codec and nothing
//! else, so it is cheap to clone and safe to share across tasks. Every verb
//! method funnels into `send`, which assembles the wire request, races the
//! transport call against the request's cancellation token and wraps any
//! failure to complete in a `DispatchError`. Status codes are not judged
//! here; see `ReceiveExt` for that.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument, warn, Span};

use crate::codec::JsonCodec;
use crate::error::{DispatchError, DispatchFailure, RestError, TransportError};
use crate::http::{Body, HttpMethod};
use crate::request::RestRequest;
use crate::response::RestResponse;
use crate::transport::{ReqwestTransport, Transport};

/// Builder for a [`RestClient`].
#[derive(Default)]
pub struct RestClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    json: JsonCodec,
}

impl RestClientBuilder {
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Shares an existing transport handle.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Codec settings used by the `*_json` verbs.
    pub fn json_codec(mut self, codec: JsonCodec) -> Self {
        self.json = codec;
        self
    }

    /// Builds the client, creating a default [`ReqwestTransport`] when no
    /// transport was supplied.
    pub fn build(self) -> Result<RestClient, TransportError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        Ok(RestClient {
            transport,
            json: self.json,
        })
    }
}

/// Executes `RestRequest`s against a transport.
#[derive(Clone)]
pub struct RestClient {
    transport: Arc<dyn Transport>,
    json: JsonCodec,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("json", &self.json)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            json: JsonCodec::default(),
        }
    }

    /// A client over a freshly configured [`ReqwestTransport`].
    pub fn with_default_transport() -> Result<Self, TransportError> {
        Self::builder().build()
    }

    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::default()
    }

    /// A client with the same codec settings that sends through `transport`.
    pub fn with_transport(&self, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            json: self.json.clone(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn json_codec(&self) -> &JsonCodec {
        &self.json
    }

    /// Sends `request` as `method` with an optional body.
    ///
    /// Returns the response for any status code. Fails only if the exchange
    /// did not complete: transport error or cancellation.
    #[instrument(
        name = "rest_dispatch",
        skip(self, request, method, body),
        fields(
            http.method = %method,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
        )
    )]
    pub async fn send(
        &self,
        request: &RestRequest,
        method: HttpMethod,
        body: Option<Body>,
    ) -> Result<RestResponse, RestError> {
        let message = request.create_request_message(method, body);
        let url = message.url.clone();
        Span::current().record("http.url", url.as_str());

        let cancellation = request.cancellation();
        if cancellation.is_some_and(|token| token.is_cancelled()) {
            warn!("request cancelled before dispatch");
            return Err(DispatchError {
                method,
                url,
                cause: DispatchFailure::Cancelled,
            }
            .into());
        }

        debug!(
            headers = message.headers.len(),
            body_bytes = message.body.as_ref().map_or(0, Body::len),
            "dispatching request"
        );

        let exchange = self.transport.send(message, method.completion_mode());
        let outcome = match cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(DispatchFailure::Cancelled),
                result = exchange => result.map_err(DispatchFailure::from),
            },
            None => exchange.await.map_err(DispatchFailure::from),
        };

        match outcome {
            Ok(response) => {
                Span::current().record("http.status_code", response.status);
                debug!(
                    status = response.status,
                    body_bytes = response.body.len(),
                    "response received"
                );
                Ok(RestResponse::new(method, url, response))
            }
            Err(cause) => {
                warn!(error = %cause, "dispatch failed");
                Err(DispatchError { method, url, cause }.into())
            }
        }
    }

    async fn send_json<T>(
        &self,
        request: &RestRequest,
        method: HttpMethod,
        value: &T,
        codec: &JsonCodec,
    ) -> Result<RestResponse, RestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        let body = match codec.encode(value) {
            Ok(body) => body,
            Err(err) => {
                warn!(http.method = %method, error = %err, "request body serialization failed");
                return Err(DispatchError {
                    method,
                    url: request.uri(),
                    cause: DispatchFailure::Encode(err),
                }
                .into());
            }
        };
        self.send(request, method, Some(body)).await
    }

    // -----------------------------------------------------------------------
    // Verbs without a body
    // -----------------------------------------------------------------------

    pub async fn get(&self, request: &RestRequest) -> Result<RestResponse, RestError> {
        self.send(request, HttpMethod::Get, None).await
    }

    /// Sends a `HEAD` request; the transport only waits for the headers.
    pub async fn head(&self, request: &RestRequest) -> Result<RestResponse, RestError> {
        self.send(request, HttpMethod::Head, None).await
    }

    pub async fn delete(&self, request: &RestRequest) -> Result<RestResponse, RestError> {
        self.send(request, HttpMethod::Delete, None).await
    }

    pub async fn post(&self, request: &RestRequest) -> Result<RestResponse, RestError> {
        self.send(request, HttpMethod::Post, None).await
    }

    pub async fn put(&self, request: &RestRequest) -> Result<RestResponse, RestError> {
        self.send(request, HttpMethod::Put, None).await
    }

    pub async fn patch(&self, request: &RestRequest) -> Result<RestResponse, RestError> {
        self.send(request, HttpMethod::Patch, None).await
    }

    // -----------------------------------------------------------------------
    // JSON bodies
    // -----------------------------------------------------------------------

    /// Serializes `body` with the client's codec and sends it as `POST`.
    pub async fn post_json<T>(&self, request: &RestRequest, body: &T) -> Result<RestResponse, RestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send_json(request, HttpMethod::Post, body, &self.json).await
    }

    pub async fn put_json<T>(&self, request: &RestRequest, body: &T) -> Result<RestResponse, RestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send_json(request, HttpMethod::Put, body, &self.json).await
    }

    pub async fn patch_json<T>(&self, request: &RestRequest, body: &T) -> Result<RestResponse, RestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send_json(request, HttpMethod::Patch, body, &self.json).await
    }

    pub async fn delete_json<T>(&self, request: &RestRequest, body: &T) -> Result<RestResponse, RestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send_json(request, HttpMethod::Delete, body, &self.json).await
    }

    /// Like [`post_json`](Self::post_json) with per-call codec settings.
    pub async fn post_json_with<T>(
        &self,
        request: &RestRequest,
        body: &T,
        codec: &JsonCodec,
    ) -> Result<RestResponse, RestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send_json(request, HttpMethod::Post, body, codec).await
    }

    pub async fn put_json_with<T>(
        &self,
        request: &RestRequest,
        body: &T,
        codec: &JsonCodec,
    ) -> Result<RestResponse, RestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send_json(request, HttpMethod::Put, body, codec).await
    }

    pub async fn patch_json_with<T>(
        &self,
        request: &RestRequest,
        body: &T,
        codec: &JsonCodec,
    ) -> Result<RestResponse, RestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send_json(request, HttpMethod::Patch, body, codec).await
    }

    pub async fn delete_json_with<T>(
        &self,
        request: &RestRequest,
        body: &T,
        codec: &JsonCodec,
    ) -> Result<RestResponse, RestError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.send_json(request, HttpMethod::Delete, body, codec).await
    }

    // -----------------------------------------------------------------------
    // Raw bodies
    // -----------------------------------------------------------------------

    pub async fn post_raw(&self, request: &RestRequest, body: Body) -> Result<RestResponse, RestError> {
        self.send(request, HttpMethod::Post, Some(body)).await
    }

    pub async fn put_raw(&self, request: &RestRequest, body: Body) -> Result<RestResponse, RestError> {
        self.send(request, HttpMethod::Put, Some(body)).await
    }

    pub async fn patch_raw(&self, request: &RestRequest, body: Body) -> Result<RestResponse, RestError> {
        self.send(request, HttpMethod::Patch, Some(body)).await
    }

    pub async fn delete_raw(&self, request: &RestRequest, body: Body) -> Result<RestResponse, RestError> {
        self.send(request, HttpMethod::Delete, Some(body)).await
    }
}
