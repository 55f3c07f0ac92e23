use crate::error::{Result, TidepoolError};

/// Check that a vector is non-empty, finite and, when `expected_dims` is
/// given, exactly that long.
pub fn validate_vector(vector: &[f32], expected_dims: Option<usize>) -> Result<()> {
    if vector.is_empty() {
        return Err(TidepoolError::Validation("vector cannot be empty".into()));
    }
    if let Some(dims) = expected_dims {
        if dims > 0 && vector.len() != dims {
            return Err(TidepoolError::Validation(format!(
                "expected {dims} dimensions, got {}",
                vector.len()
            )));
        }
    }
    if let Some(pos) = vector.iter().position(|v| !v.is_finite()) {
        return Err(TidepoolError::Validation(format!(
            "invalid value at index {pos}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_vector;

    #[test]
    fn rejects_empty() {
        assert!(validate_vector(&[], None).unwrap_err().is_validation());
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let err = validate_vector(&[0.1, 0.2], Some(3)).unwrap_err();
        assert!(err.to_string().contains("expected 3 dimensions, got 2"));
    }

    #[test]
    fn rejects_non_finite() {
        assert!(validate_vector(&[f32::NAN], None).is_err());
        assert!(validate_vector(&[0.0, f32::INFINITY], None).is_err());
        assert!(validate_vector(&[f32::NEG_INFINITY], None).is_err());
    }

    #[test]
    fn accepts_valid() {
        assert!(validate_vector(&[0.1, 0.2], Some(2)).is_ok());
        assert!(validate_vector(&[0.1, 0.2], None).is_ok());
    }
}
