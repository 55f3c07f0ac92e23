use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::config::{ClientBuilder, ClientConfig};
use crate::error::{Result, TidepoolError};
use crate::types::{
    DeleteOptions, Document, HealthResponse, IngestStatus, NamespaceInfo, NamespaceStatus,
    QueryOptions, QueryResponse, Service, UpsertOptions,
};

/// Shared inner state for synchronous wrappers.
///
/// Holds a Tokio runtime that drives the underlying async [`Client`].
struct Inner {
    rt: tokio::runtime::Runtime,
}

/// Blocking/synchronous wrapper around [`Client`].
///
/// This type is only available when the `sync` feature is enabled. It runs all
/// operations on an internal Tokio runtime using `block_on`.
///
/// Note: do not call these blocking APIs from within an existing Tokio runtime,
/// as that panics. In async contexts, use the async [`Client`] directly.
#[derive(Clone)]
pub struct BlockingClient {
    inner: Arc<Inner>,
    client: Client,
}

impl fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingClient")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl BlockingClient {
    /// Build a blocking client from a [`ClientConfig`].
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| TidepoolError::Config(format!("failed to start runtime: {e}")))?;
        let client = Client::from_config(config)?;
        Ok(Self {
            inner: Arc::new(Inner { rt }),
            client,
        })
    }

    /// Build a blocking client from a configured [`ClientBuilder`].
    pub fn from_builder(builder: ClientBuilder) -> Result<Self> {
        Self::from_config(builder.config().clone())
    }

    /// The async client driven by this wrapper.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// A handle whose calls are bound to `token`, see [`Client::with_cancellation`].
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            client: self.client.with_cancellation(token),
        }
    }

    pub fn health(&self, service: Service) -> Result<HealthResponse> {
        self.inner.rt.block_on(self.client.health(service))
    }

    pub fn upsert(&self, docs: &[Document], opts: Option<&UpsertOptions>) -> Result<()> {
        self.inner.rt.block_on(self.client.upsert(docs, opts))
    }

    pub fn query(&self, vector: &[f32], opts: Option<&QueryOptions>) -> Result<QueryResponse> {
        self.inner.rt.block_on(self.client.query(vector, opts))
    }

    pub fn delete(&self, ids: &[String], opts: Option<&DeleteOptions>) -> Result<()> {
        self.inner.rt.block_on(self.client.delete(ids, opts))
    }

    pub fn get_namespace(&self, namespace: &str) -> Result<NamespaceInfo> {
        self.inner.rt.block_on(self.client.get_namespace(namespace))
    }

    pub fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        self.inner.rt.block_on(self.client.list_namespaces())
    }

    pub fn get_namespace_status(&self, namespace: &str) -> Result<NamespaceStatus> {
        self.inner
            .rt
            .block_on(self.client.get_namespace_status(namespace))
    }

    pub fn compact_namespace(&self, namespace: &str) -> Result<()> {
        self.inner
            .rt
            .block_on(self.client.compact_namespace(namespace))
    }

    pub fn status(&self) -> Result<IngestStatus> {
        self.inner.rt.block_on(self.client.status())
    }

    pub fn compact(&self) -> Result<()> {
        self.inner.rt.block_on(self.client.compact())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn blocking(mock: &Arc<MockTransport>) -> BlockingClient {
        let builder = ClientBuilder::new()
            .default_namespace("default")
            .transport(mock.clone());
        BlockingClient::from_builder(builder).unwrap()
    }

    #[test]
    fn blocking_client_debug_wraps_client() {
        let mock = Arc::new(MockTransport::default());
        let debug = format!("{:?}", blocking(&mock));
        assert!(debug.starts_with("BlockingClient"), "{debug}");
        assert!(debug.contains("default_namespace"), "{debug}");
    }

    #[test]
    fn blocking_query_roundtrip() {
        let mock = Arc::new(MockTransport::default());
        mock.respond(200, r#"{"results":[{"id":"a","dist":0.5}]}"#);
        let client = blocking(&mock);

        let resp = client.query(&[0.1], None).unwrap();
        assert_eq!(resp.namespace, "default");
        assert_eq!(resp.results[0].score, 0.5);
        assert_eq!(
            mock.sent()[0].url.as_str(),
            "http://localhost:8080/v1/vectors/default"
        );
    }

    #[test]
    fn blocking_validation_and_cancellation() {
        let mock = Arc::new(MockTransport::default());
        let client = blocking(&mock);
        assert!(client.delete(&[], None).unwrap_err().is_validation());

        let token = CancellationToken::new();
        token.cancel();
        let err = client.with_cancellation(token).compact().unwrap_err();
        assert!(err.is_cancelled());
        assert!(mock.sent().is_empty());
    }
}
