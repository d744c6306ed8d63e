//! The transport boundary and its reqwest implementation.
//!
//! # Design
//! The dispatcher never talks to the network itself. It hands a plain
//! `HttpRequest` to a `Transport` and gets a plain `HttpResponse` back.
//! Connection pooling, TLS and timeouts are the transport's business; a
//! single transport is meant to be shared through an `Arc` across any number
//! of concurrent dispatches.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::http::{CompletionMode, HttpMethod, HttpRequest, HttpResponse};

const DEFAULT_USER_AGENT: &str = concat!("rest-request/", env!("CARGO_PKG_VERSION"));

/// Sends one wire request and returns the wire response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a single attempt. Any status code is a completed call; only
    /// a failure to complete the exchange is an error.
    async fn send(&self, request: HttpRequest, mode: CompletionMode) -> Result<HttpResponse, TransportError>;
}

/// A `Transport` backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::builder().build()
    }

    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest, mode: CompletionMode) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(reqwest_method(request.method), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body.content);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = match mode {
            CompletionMode::HeadersOnly => Bytes::new(),
            CompletionMode::FullBody => response.bytes().await?,
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Configuration for a [`ReqwestTransport`].
#[derive(Debug, Default)]
pub struct ReqwestTransportBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    pool_max_idle_per_host: Option<usize>,
}

impl ReqwestTransportBuilder {
    /// Total time allowed for one exchange. Unset means no limit.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, TransportError> {
        let mut builder = reqwest::Client::builder().user_agent(
            self.user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        );
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(max) = self.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }
        Ok(ReqwestTransport::from_client(builder.build()?))
    }
}
