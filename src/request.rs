//! Wire payloads for the write and query endpoints.
//!
//! Every builder validates its input completely before returning, so an
//! invalid call never reaches the transport. Optional fields are left out of
//! the serialized payload rather than sent as `null`.

use serde::Serialize;

use crate::error::{Result, TidepoolError};
use crate::types::{
    Attributes, DistanceMetric, Document, FusionMode, QueryMode, QueryOptions, UpsertOptions,
};
use crate::validation::validate_vector;

#[derive(Debug, Serialize)]
pub(crate) struct UpsertRequest<'a> {
    vectors: &'a [Document],
    #[serde(skip_serializing_if = "Option::is_none")]
    distance_metric: Option<DistanceMetric>,
}

pub(crate) fn build_upsert<'a>(
    docs: &'a [Document],
    opts: Option<&UpsertOptions>,
) -> Result<UpsertRequest<'a>> {
    if docs.is_empty() {
        return Err(TidepoolError::Validation("no documents provided".into()));
    }
    for (i, doc) in docs.iter().enumerate() {
        if doc.id.is_empty() {
            return Err(TidepoolError::Validation(format!(
                "document at index {i} has an empty id"
            )));
        }
        if let Some(vector) = &doc.vector {
            validate_vector(vector, None).map_err(|e| match e {
                TidepoolError::Validation(msg) => {
                    TidepoolError::Validation(format!("document {:?}: {msg}", doc.id))
                }
                other => other,
            })?;
        }
    }

    Ok(UpsertRequest {
        vectors: docs,
        distance_metric: opts.and_then(|o| o.distance_metric),
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    vector: Option<&'a [f32]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    mode: QueryMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ef_search: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nprobe: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance_metric: Option<DistanceMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_vectors: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<&'a Attributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alpha: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fusion: Option<FusionMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rrf_k: Option<i32>,
}

pub(crate) fn build_query<'a>(
    vector: &'a [f32],
    opts: Option<&'a QueryOptions>,
) -> Result<QueryRequest<'a>> {
    let vector = (!vector.is_empty()).then_some(vector);
    let text = opts
        .and_then(|o| o.text.as_deref())
        .filter(|t| !t.is_empty());

    if let Some(o) = opts {
        if o.top_k < 0 {
            return Err(TidepoolError::Validation(format!(
                "top_k must be >= 0, got {}",
                o.top_k
            )));
        }
        if let Some(k) = o.rrf_k {
            if k <= 0 {
                return Err(TidepoolError::Validation(format!(
                    "rrf_k must be > 0, got {k}"
                )));
            }
        }
        if o.alpha.is_some_and(f32::is_nan) {
            return Err(TidepoolError::Validation("alpha must be a number".into()));
        }
    }

    let mode = opts
        .and_then(|o| o.mode)
        .unwrap_or_else(|| infer_mode(vector.is_some(), text.is_some()));

    let needs_vector = matches!(mode, QueryMode::Vector | QueryMode::Hybrid);
    let needs_text = matches!(mode, QueryMode::Text | QueryMode::Hybrid);
    if needs_vector && vector.is_none() {
        return Err(TidepoolError::Validation(format!(
            "vector is required for {mode} queries"
        )));
    }
    if needs_text && text.is_none() {
        return Err(TidepoolError::Validation(format!(
            "text is required for {mode} queries"
        )));
    }
    if let Some(v) = vector {
        validate_vector(v, None)?;
    }

    Ok(QueryRequest {
        vector,
        text,
        mode,
        top_k: opts.map(|o| o.top_k).filter(|k| *k > 0),
        ef_search: opts.map(|o| o.ef_search).filter(|v| *v > 0),
        nprobe: opts.map(|o| o.nprobe).filter(|v| *v > 0),
        distance_metric: opts.and_then(|o| o.distance_metric),
        include_vectors: opts.map(|o| o.include_vectors),
        filters: opts.and_then(|o| o.filters.as_ref()).filter(|f| !f.is_empty()),
        alpha: opts.and_then(|o| o.alpha).map(|a| a.clamp(0.0, 1.0)),
        fusion: opts.and_then(|o| o.fusion),
        rrf_k: opts.and_then(|o| o.rrf_k),
    })
}

fn infer_mode(has_vector: bool, has_text: bool) -> QueryMode {
    match (has_vector, has_text) {
        (true, true) => QueryMode::Hybrid,
        (false, true) => QueryMode::Text,
        _ => QueryMode::Vector,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteRequest<'a> {
    ids: &'a [String],
}

pub(crate) fn build_delete(ids: &[String]) -> Result<DeleteRequest<'_>> {
    if ids.is_empty() {
        return Err(TidepoolError::Validation("no ids provided".into()));
    }
    Ok(DeleteRequest { ids })
}
