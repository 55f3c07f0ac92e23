use crate::error::{Result, TidepoolError};

/// Pick the namespace a call targets.
///
/// A non-empty per-call value always wins; an empty one means "use the
/// default". Fails when neither is set, the backend is never asked.
pub fn resolve(per_call: &str, configured_default: &str) -> Result<String> {
    if !per_call.is_empty() {
        return Ok(per_call.to_string());
    }
    if !configured_default.is_empty() {
        return Ok(configured_default.to_string());
    }
    Err(TidepoolError::Validation("namespace is required".into()))
}
