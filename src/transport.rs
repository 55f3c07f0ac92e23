use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, TidepoolError, classify};

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A fully-formed HTTP request handed to an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and fully-read body of a response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Pluggable HTTP layer.
///
/// Connection pooling, TLS and proxies live behind this trait. The client
/// only needs one round trip per call.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Default transport backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose requests time out after `timeout`
    /// (zero disables the limit).
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TidepoolError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap a caller-configured `reqwest::Client`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TidepoolError {
    if err.is_timeout() {
        // reqwest does not report the configured limit.
        TidepoolError::Timeout(None)
    } else {
        TidepoolError::Transport(anyhow::Error::new(err))
    }
}

/// Serializes payloads, enforces cancellation and the deadline, and routes
/// non-2xx responses through [`classify`].
#[derive(Clone)]
pub(crate) struct Transport {
    inner: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl Transport {
    pub(crate) fn new(inner: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Issue one request and return the body of a 2xx response.
    pub(crate) async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        payload: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let body = payload.map(serde_json::to_vec).transpose()?;

        let mut headers = vec![("Accept".to_string(), CONTENT_TYPE_JSON.to_string())];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()));
        }
        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };

        if cancel.is_cancelled() {
            return Err(TidepoolError::Cancelled);
        }

        debug!(method = %request.method, url = %request.url, "sending request");
        let started = Instant::now();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TidepoolError::Cancelled),
            res = self.send_with_deadline(request) => res?,
        };
        debug!(
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "received response"
        );

        if !(200..=299).contains(&response.status) {
            let err = classify(response.status, &response.body);
            warn!(status = response.status, error = %err, "request failed");
            return Err(err);
        }
        Ok(response.body)
    }

    async fn send_with_deadline(&self, request: HttpRequest) -> Result<HttpResponse> {
        if self.timeout.is_zero() {
            return self.inner.send(request).await;
        }
        match tokio::time::timeout(self.timeout, self.inner.send(request)).await {
            Ok(res) => res.map_err(|e| match e {
                TidepoolError::Timeout(None) => TidepoolError::Timeout(Some(self.timeout)),
                other => other,
            }),
            Err(_) => Err(TidepoolError::Timeout(Some(self.timeout))),
        }
    }
}
