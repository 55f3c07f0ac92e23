use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{ClientBuilder, ClientConfig, ResolvedConfig};
use crate::decode::{decode_namespaces, decode_object, decode_query_response};
use crate::error::{Result, TidepoolError};
use crate::namespace;
use crate::request::{build_delete, build_query, build_upsert};
use crate::transport::{HttpTransport, ReqwestTransport, Transport};
use crate::types::{
    DeleteOptions, Document, HealthResponse, IngestStatus, NamespaceInfo, NamespaceStatus,
    QueryOptions, QueryResponse, Service, UpsertOptions,
};

struct Inner {
    config: ResolvedConfig,
    transport: Transport,
}

/// Client for the Tidepool query and ingest services.
///
/// Cloning is cheap and clones share configuration and transport. Every
/// operation is a single round trip; nothing is retried or cached.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
    cancel: CancellationToken,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("query_url", &self.inner.config.query_url.as_str())
            .field("ingest_url", &self.inner.config.ingest_url.as_str())
            .field("timeout", &self.inner.config.timeout)
            .field("default_namespace", &self.inner.config.default_namespace)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Client {
    /// Client with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Validate `config` and freeze it into a client.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let resolved = ResolvedConfig::from_config(&config)?;
        let http: Arc<dyn HttpTransport> = match config.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(resolved.timeout)?),
        };
        let transport = Transport::new(http, resolved.timeout);
        Ok(Self {
            inner: Arc::new(Inner {
                config: resolved,
                transport,
            }),
            cancel: CancellationToken::new(),
        })
    }

    /// A handle whose calls are bound to `token`.
    ///
    /// Once the token is cancelled, pending calls abort and new calls fail
    /// with [`TidepoolError::Cancelled`] without touching the network.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: token,
        }
    }

    pub fn query_url(&self) -> &Url {
        &self.inner.config.query_url
    }

    pub fn ingest_url(&self) -> &Url {
        &self.inner.config.ingest_url
    }

    pub fn timeout(&self) -> Duration {
        self.inner.config.timeout
    }

    pub fn default_namespace(&self) -> &str {
        &self.inner.config.default_namespace
    }

    /// Check the health of one service.
    pub async fn health(&self, service: Service) -> Result<HealthResponse> {
        let url = endpoint(self.service_url(service), &["health"])?;
        let body = self.send::<()>(Method::GET, url, None).await?;
        decode_object("health response", &body)
    }

    /// Insert or update documents.
    pub async fn upsert(&self, docs: &[Document], opts: Option<&UpsertOptions>) -> Result<()> {
        let payload = build_upsert(docs, opts)?;
        let ns = self.resolve(opts.map(|o| o.namespace.as_str()))?;
        let url = endpoint(&self.inner.config.ingest_url, &["v1", "vectors", &ns])?;
        self.send(Method::POST, url, Some(&payload)).await?;
        Ok(())
    }

    /// Search a namespace by vector, text, or both.
    ///
    /// Pass an empty `vector` for text-only queries.
    pub async fn query(&self, vector: &[f32], opts: Option<&QueryOptions>) -> Result<QueryResponse> {
        let payload = build_query(vector, opts)?;
        let ns = self.resolve(opts.map(|o| o.namespace.as_str()))?;
        let url = endpoint(&self.inner.config.query_url, &["v1", "vectors", &ns])?;
        let body = self.send(Method::POST, url, Some(&payload)).await?;
        decode_query_response(&body, &ns)
    }

    /// Delete documents by id.
    pub async fn delete(&self, ids: &[String], opts: Option<&DeleteOptions>) -> Result<()> {
        let payload = build_delete(ids)?;
        let ns = self.resolve(opts.map(|o| o.namespace.as_str()))?;
        let url = endpoint(&self.inner.config.ingest_url, &["v1", "vectors", &ns])?;
        self.send(Method::DELETE, url, Some(&payload)).await?;
        Ok(())
    }

    /// Fetch namespace metadata. An empty `namespace` means the default.
    pub async fn get_namespace(&self, namespace: &str) -> Result<NamespaceInfo> {
        let ns = self.resolve(Some(namespace))?;
        let url = endpoint(&self.inner.config.query_url, &["v1", "namespaces", &ns])?;
        let body = self.send::<()>(Method::GET, url, None).await?;
        let mut info: NamespaceInfo = decode_object("namespace response", &body)?;
        if info.namespace.is_empty() {
            info.namespace = ns;
        }
        Ok(info)
    }

    /// List every namespace known to the query service.
    pub async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>> {
        let url = endpoint(&self.inner.config.query_url, &["v1", "namespaces"])?;
        let body = self.send::<()>(Method::GET, url, None).await?;
        decode_namespaces(&body)
    }

    /// Compaction state of one namespace on the ingest service.
    pub async fn get_namespace_status(&self, namespace: &str) -> Result<NamespaceStatus> {
        let ns = self.resolve(Some(namespace))?;
        let url = endpoint(
            &self.inner.config.ingest_url,
            &["v1", "namespaces", &ns, "status"],
        )?;
        let body = self.send::<()>(Method::GET, url, None).await?;
        decode_object("namespace status response", &body)
    }

    /// Trigger compaction of one namespace.
    pub async fn compact_namespace(&self, namespace: &str) -> Result<()> {
        let ns = self.resolve(Some(namespace))?;
        let url = endpoint(
            &self.inner.config.ingest_url,
            &["v1", "namespaces", &ns, "compact"],
        )?;
        self.send::<()>(Method::POST, url, None).await?;
        Ok(())
    }

    /// Whole ingest service status.
    pub async fn status(&self) -> Result<IngestStatus> {
        let url = endpoint(&self.inner.config.ingest_url, &["status"])?;
        let body = self.send::<()>(Method::GET, url, None).await?;
        decode_object("status response", &body)
    }

    /// Trigger compaction across the whole ingest service.
    pub async fn compact(&self) -> Result<()> {
        let url = endpoint(&self.inner.config.ingest_url, &["compact"])?;
        self.send::<()>(Method::POST, url, None).await?;
        Ok(())
    }

    fn resolve(&self, per_call: Option<&str>) -> Result<String> {
        namespace::resolve(per_call.unwrap_or(""), &self.inner.config.default_namespace)
    }

    fn service_url(&self, service: Service) -> &Url {
        match service {
            Service::Query => &self.inner.config.query_url,
            Service::Ingest => &self.inner.config.ingest_url,
        }
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        payload: Option<&B>,
    ) -> Result<Vec<u8>> {
        self.inner
            .transport
            .execute(method, url, payload, &self.cancel)
            .await
    }
}

/// Append percent-encoded path segments to a base URL.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| TidepoolError::Config(format!("base URL {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
