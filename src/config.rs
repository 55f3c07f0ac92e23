use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::client::Client;
use crate::error::{Result, TidepoolError};
use crate::transport::{HttpTransport, ReqwestTransport};

pub const DEFAULT_QUERY_URL: &str = "http://localhost:8080";
pub const DEFAULT_INGEST_URL: &str = "http://localhost:8081";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_NAMESPACE: &str = "default";

/// Client configuration.
///
/// Defaults: query service on `localhost:8080`, ingest service on
/// `localhost:8081`, 30 second timeout, namespace `default`, and a `reqwest`
/// transport built from the timeout.
#[derive(Clone)]
pub struct ClientConfig {
    pub query_url: String,
    pub ingest_url: String,
    /// Zero disables the per-request deadline.
    pub timeout: Duration,
    pub default_namespace: String,
    /// Deprecated alias of `default_namespace`, consulted only when that is empty.
    pub namespace: String,
    pub transport: Option<Arc<dyn HttpTransport>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            query_url: DEFAULT_QUERY_URL.to_string(),
            ingest_url: DEFAULT_INGEST_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            namespace: String::new(),
            transport: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("query_url", &self.query_url)
            .field("ingest_url", &self.ingest_url)
            .field("timeout", &self.timeout)
            .field("default_namespace", &self.default_namespace)
            .field("namespace", &self.namespace)
            .field("transport", &self.transport.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl ClientConfig {
    /// The namespace used when a call does not name one.
    pub fn effective_namespace(&self) -> &str {
        if self.default_namespace.is_empty() {
            &self.namespace
        } else {
            &self.default_namespace
        }
    }
}

/// Validated, immutable form of [`ClientConfig`] held by a [`Client`].
#[derive(Clone, Debug)]
pub(crate) struct ResolvedConfig {
    pub(crate) query_url: Url,
    pub(crate) ingest_url: Url,
    pub(crate) timeout: Duration,
    pub(crate) default_namespace: String,
}

impl ResolvedConfig {
    pub(crate) fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            query_url: parse_base_url("query", &config.query_url)?,
            ingest_url: parse_base_url("ingest", &config.ingest_url)?,
            timeout: config.timeout,
            default_namespace: config.effective_namespace().to_string(),
        })
    }
}

fn parse_base_url(service: &str, raw: &str) -> Result<Url> {
    if raw.is_empty() {
        return Err(TidepoolError::Config(format!("{service} base URL is required")));
    }
    let url = Url::parse(raw)
        .map_err(|e| TidepoolError::Config(format!("invalid {service} base URL {raw:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(TidepoolError::Config(format!(
            "{service} base URL {raw:?} cannot carry a path"
        )));
    }
    Ok(url)
}

/// Builder for configuring and constructing a [`Client`].
///
/// Each setter mutates a draft [`ClientConfig`]; [`ClientBuilder::build`]
/// validates it and freezes it into the client.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration record.
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn query_url(mut self, url: impl Into<String>) -> Self {
        self.config.query_url = url.into();
        self
    }

    pub fn ingest_url(mut self, url: impl Into<String>) -> Self {
        self.config.ingest_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.default_namespace = namespace.into();
        self
    }

    /// Sets both the deprecated `namespace` field and `default_namespace`.
    #[deprecated(note = "use `default_namespace`")]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.config.namespace = namespace.clone();
        self.config.default_namespace = namespace;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    /// Use a caller-built `reqwest::Client` for all requests.
    pub fn http_client(self, client: reqwest::Client) -> Self {
        self.transport(Arc::new(ReqwestTransport::from_client(client)))
    }

    /// Apply an arbitrary mutation to the draft configuration.
    pub fn apply(mut self, option: impl FnOnce(&mut ClientConfig)) -> Self {
        option(&mut self.config);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a [`Client`] using the current builder configuration.
    pub fn build(self) -> Result<Client> {
        Client::from_config(self.config)
    }
}
