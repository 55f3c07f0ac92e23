//! Tidepool Rust SDK: typed access to the query and ingest services.

mod decode;
mod request;

pub mod client;
pub mod config;
pub mod error;
pub mod namespace;
#[cfg(feature = "sync")]
pub mod sync;
pub mod transport;
pub mod types;
pub mod validation;

pub use crate::client::Client;
pub use crate::config::{
    ClientBuilder, ClientConfig, DEFAULT_INGEST_URL, DEFAULT_NAMESPACE, DEFAULT_QUERY_URL,
    DEFAULT_TIMEOUT,
};
pub use crate::decode::{decode_namespaces, decode_query_response};
pub use crate::error::{ApiError, ErrorKind, Result, TidepoolError, classify};
pub use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use crate::types::{
    Attributes, CompactionStatus, DeleteOptions, DistanceMetric, Document, FusionMode,
    HealthResponse, IngestStatus, NamespaceInfo, NamespaceStatus, QueryMode, QueryOptions,
    QueryResponse, Service, UpsertOptions, Vector, VectorResult,
};
pub use crate::validation::validate_vector;

#[cfg(feature = "sync")]
pub use crate::sync::BlockingClient;

pub use tokio_util::sync::CancellationToken;
