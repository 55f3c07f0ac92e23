use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TidepoolError;

pub type Vector = Vec<f32>;
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// One unit of upsert.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_vector(mut self, vector: Vector) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

/// A single ranked query hit.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VectorResult {
    pub id: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

#[derive(Deserialize)]
struct RawVectorResult {
    id: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    dist: Option<f32>,
    #[serde(default)]
    distance: Option<f32>,
    #[serde(default)]
    vector: Option<Vector>,
    #[serde(default)]
    attributes: Option<Attributes>,
}

// Older servers report `dist` or `distance` instead of `score`.
impl<'de> Deserialize<'de> for VectorResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawVectorResult::deserialize(deserializer)?;
        Ok(VectorResult {
            id: raw.id,
            score: raw.score.or(raw.dist).or(raw.distance).unwrap_or(0.0),
            vector: raw.vector,
            attributes: raw.attributes,
        })
    }
}

/// Ranked results plus the namespace that was actually queried.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<VectorResult>,
    pub namespace: String,
}

/// Namespace metadata returned by the query service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    #[serde(default, alias = "name")]
    pub namespace: String,
    #[serde(default)]
    pub approx_count: u64,
    #[serde(default)]
    pub dimensions: u32,
    /// `None` means the server did not report the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_compaction: Option<bool>,
}

impl NamespaceInfo {
    /// Minimal record for listings that only carry names.
    pub fn named(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }
}

/// Write-ahead-log and segment counters reported by the ingest service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompactionStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub wal_files: u64,
    #[serde(default)]
    pub wal_entries: u64,
    #[serde(default)]
    pub segments: u64,
    #[serde(default)]
    pub total_vecs: u64,
    #[serde(default)]
    pub dimensions: u32,
}

/// Per-namespace compaction state.
pub type NamespaceStatus = CompactionStatus;
/// Whole ingest service state.
pub type IngestStatus = CompactionStatus;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub status: String,
}

/// Which backend service a call targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    Query,
    Ingest,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Query => "query",
            Service::Ingest => "ingest",
        }
    }
}

impl FromStr for Service {
    type Err = TidepoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "query" => Ok(Service::Query),
            "ingest" => Ok(Service::Ingest),
            _ => Err(TidepoolError::Validation(format!("unknown service {s:?}"))),
        }
    }
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $what:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TidepoolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(TidepoolError::Validation(format!(
                        concat!("invalid ", $what, " {:?}"),
                        s
                    ))),
                }
            }
        }
    };
}

wire_enum!(
    /// Distance function used by the backend.
    DistanceMetric, "distance metric" {
        Cosine => "cosine_distance",
        Euclidean => "euclidean_squared",
        DotProduct => "dot_product",
    }
);

wire_enum!(
    /// Retrieval strategy for a query.
    QueryMode, "query mode" {
        Vector => "vector",
        Text => "text",
        Hybrid => "hybrid",
    }
);

wire_enum!(
    /// How vector and text rankings are combined in hybrid mode.
    FusionMode, "fusion mode" {
        Blend => "blend",
        Rrf => "rrf",
    }
);

#[derive(Clone, Debug, Default)]
pub struct UpsertOptions {
    /// Empty means the client's default namespace.
    pub namespace: String,
    pub distance_metric: Option<DistanceMetric>,
}

#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    /// Empty means the client's default namespace.
    pub namespace: String,
    /// Zero leaves the result count to the server.
    pub top_k: i32,
    pub ef_search: u32,
    pub nprobe: u32,
    pub distance_metric: Option<DistanceMetric>,
    pub include_vectors: bool,
    pub filters: Option<Attributes>,
    pub text: Option<String>,
    /// Inferred from the supplied vector and text when unset.
    pub mode: Option<QueryMode>,
    /// Clamped into `[0, 1]`.
    pub alpha: Option<f32>,
    pub fusion: Option<FusionMode>,
    pub rrf_k: Option<i32>,
}

#[derive(Clone, Debug, Default)]
pub struct DeleteOptions {
    /// Empty means the client's default namespace.
    pub namespace: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_of(json: &str) -> f32 {
        serde_json::from_str::<VectorResult>(json).unwrap().score
    }

    #[test]
    fn score_aliases_in_priority_order() {
        assert_eq!(score_of(r#"{"id":"a","score":0.4}"#), 0.4);
        assert_eq!(score_of(r#"{"id":"a","dist":0.5}"#), 0.5);
        assert_eq!(score_of(r#"{"id":"a","distance":0.6}"#), 0.6);
        assert_eq!(score_of(r#"{"id":"a"}"#), 0.0);
        assert_eq!(score_of(r#"{"id":"a","dist":0.5,"score":0.4}"#), 0.4);
        assert_eq!(score_of(r#"{"id":"a","distance":0.6,"dist":0.5}"#), 0.5);
    }

    #[test]
    fn result_keeps_vector_and_attributes() {
        let r: VectorResult =
            serde_json::from_str(r#"{"id":"a","score":1,"vector":[1,2],"attributes":{"k":"v"}}"#)
                .unwrap();
        assert_eq!(r.vector, Some(vec![1.0, 2.0]));
        assert_eq!(r.attributes.unwrap()["k"], "v");
    }

    #[test]
    fn document_omits_absent_fields() {
        let doc = Document::new("doc-1");
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"id":"doc-1"}"#);

        let doc = Document::new("doc-2").with_vector(vec![0.5]).with_text("hi");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["vector"], serde_json::json!([0.5]));
        assert_eq!(value["text"], "hi");
        assert!(value.get("attributes").is_none());
    }

    #[test]
    fn pending_compaction_is_tri_state() {
        let absent: NamespaceInfo = serde_json::from_str(r#"{"namespace":"a"}"#).unwrap();
        assert_eq!(absent.pending_compaction, None);
        let reported: NamespaceInfo =
            serde_json::from_str(r#"{"namespace":"a","pending_compaction":false}"#).unwrap();
        assert_eq!(reported.pending_compaction, Some(false));
    }

    #[test]
    fn status_parses_last_run() {
        let status: CompactionStatus = serde_json::from_str(
            r#"{"last_run":"2025-01-01T00:00:00Z","wal_files":1,"wal_entries":2,"segments":3,"total_vecs":4,"dimensions":5}"#,
        )
        .unwrap();
        assert!(status.last_run.is_some());
        assert_eq!(status.wal_entries, 2);
        assert_eq!(status.dimensions, 5);

        let bare: CompactionStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(bare.last_run, None);
    }

    #[test]
    fn wire_enums_parse_and_reject() {
        assert_eq!("hybrid".parse::<QueryMode>().unwrap(), QueryMode::Hybrid);
        assert_eq!("rrf".parse::<FusionMode>().unwrap(), FusionMode::Rrf);
        assert_eq!(
            "dot_product".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::DotProduct
        );
        assert!("invalid".parse::<QueryMode>().unwrap_err().is_validation());
        assert!("invalid".parse::<FusionMode>().unwrap_err().is_validation());
        assert!("l2".parse::<DistanceMetric>().unwrap_err().is_validation());
    }

    #[test]
    fn service_parse_is_case_insensitive() {
        assert_eq!("Query".parse::<Service>().unwrap(), Service::Query);
        assert_eq!("INGEST".parse::<Service>().unwrap(), Service::Ingest);
        assert!("admin".parse::<Service>().unwrap_err().is_validation());
    }
}
