//! Response normalization.
//!
//! Query and namespace endpoints have answered in several shapes over time.
//! Each shape is a matcher `&[u8] -> Option<T>`, tried in order; the first
//! one that parses wins. Adding a shape means appending a matcher.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::de::IgnoredAny;
use tracing::trace;

use crate::error::{Result, TidepoolError};
use crate::types::{NamespaceInfo, QueryResponse, VectorResult};

type Matcher<T> = (&'static str, fn(&[u8]) -> Option<T>);

fn first_match<T>(what: &str, body: &[u8], matchers: &[Matcher<T>]) -> Result<T> {
    for (shape, matcher) in matchers {
        if let Some(value) = matcher(body) {
            trace!(shape = *shape, "decoded {what}");
            return Ok(value);
        }
    }
    // Distinguish "not JSON" from "JSON of an unknown shape".
    if let Err(e) = serde_json::from_slice::<IgnoredAny>(body) {
        return Err(TidepoolError::Decode(format!("decode {what}: {e}")));
    }
    Err(TidepoolError::Decode(format!(
        "decode {what}: unrecognized response shape"
    )))
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Option<T> {
    serde_json::from_slice(body).ok()
}

/// Results listed under some field, with the namespace the server reports.
struct QueryShape {
    results: Vec<VectorResult>,
    namespace: Option<String>,
}

#[derive(Deserialize)]
struct ResultsField {
    results: Vec<VectorResult>,
    #[serde(default)]
    namespace: Option<String>,
}

#[derive(Deserialize)]
struct VectorsField {
    vectors: Vec<VectorResult>,
    #[serde(default)]
    namespace: Option<String>,
}

const QUERY_SHAPES: &[Matcher<QueryShape>] = &[
    ("bare list", |body| {
        parse::<Vec<VectorResult>>(body).map(|results| QueryShape {
            results,
            namespace: None,
        })
    }),
    ("results field", |body| {
        parse::<ResultsField>(body).map(|r| QueryShape {
            results: r.results,
            namespace: r.namespace,
        })
    }),
    ("vectors field", |body| {
        parse::<VectorsField>(body).map(|r| QueryShape {
            results: r.vectors,
            namespace: r.namespace,
        })
    }),
];

/// Decode a query response body.
///
/// The reported namespace is the server's when present, otherwise
/// `sent_namespace`.
pub fn decode_query_response(body: &[u8], sent_namespace: &str) -> Result<QueryResponse> {
    let shape = first_match("query response", body, QUERY_SHAPES)?;
    let namespace = shape
        .namespace
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| sent_namespace.to_string());
    Ok(QueryResponse {
        results: shape.results,
        namespace,
    })
}

/// A listed namespace record. Unlike [`NamespaceInfo`] the name is required.
#[derive(Deserialize)]
struct ListedNamespace {
    #[serde(alias = "name")]
    namespace: String,
    #[serde(default)]
    approx_count: u64,
    #[serde(default)]
    dimensions: u32,
    #[serde(default)]
    pending_compaction: Option<bool>,
}

impl From<ListedNamespace> for NamespaceInfo {
    fn from(listed: ListedNamespace) -> Self {
        NamespaceInfo {
            namespace: listed.namespace,
            approx_count: listed.approx_count,
            dimensions: listed.dimensions,
            pending_compaction: listed.pending_compaction,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NamespaceEntry {
    Name(String),
    Info(ListedNamespace),
}

impl From<NamespaceEntry> for NamespaceInfo {
    fn from(entry: NamespaceEntry) -> Self {
        match entry {
            NamespaceEntry::Name(name) => NamespaceInfo::named(name),
            NamespaceEntry::Info(listed) => listed.into(),
        }
    }
}

#[derive(Deserialize)]
struct NamespacesField {
    namespaces: Vec<NamespaceEntry>,
}

#[derive(Deserialize)]
struct NamespaceListField {
    namespace_list: Vec<String>,
}

fn names_to_infos(names: Vec<String>) -> Vec<NamespaceInfo> {
    names.into_iter().map(NamespaceInfo::named).collect()
}

// Every listed record must carry a name.
fn all_named(infos: Vec<NamespaceInfo>) -> Option<Vec<NamespaceInfo>> {
    infos
        .iter()
        .all(|info| !info.namespace.is_empty())
        .then_some(infos)
}

const NAMESPACE_SHAPES: &[Matcher<Vec<NamespaceInfo>>] = &[
    ("bare names", |body| {
        parse::<Vec<String>>(body).map(names_to_infos).and_then(all_named)
    }),
    ("bare infos", |body| {
        parse::<Vec<ListedNamespace>>(body)
            .map(|listed| listed.into_iter().map(NamespaceInfo::from).collect())
            .and_then(all_named)
    }),
    ("namespaces field", |body| {
        parse::<NamespacesField>(body)
            .map(|w| w.namespaces.into_iter().map(NamespaceInfo::from).collect())
            .and_then(all_named)
    }),
    ("namespace_list field", |body| {
        parse::<NamespaceListField>(body)
            .map(|w| names_to_infos(w.namespace_list))
            .and_then(all_named)
    }),
];

/// Decode a namespace listing. Names-only shapes fill in just the name.
pub fn decode_namespaces(body: &[u8]) -> Result<Vec<NamespaceInfo>> {
    first_match("namespaces response", body, NAMESPACE_SHAPES)
}

/// Decode a single-object response such as status or namespace info.
pub(crate) fn decode_object<T: DeserializeOwned>(what: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| TidepoolError::Decode(format!("decode {what}: {e}")))
}
