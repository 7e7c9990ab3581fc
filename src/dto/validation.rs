//! Validation helpers for DTOs.

use validator::ValidationError;

/// Rejects strings that are empty once surrounding whitespace is removed.
///
/// # Examples
///
/// ```ignore
/// validate_not_blank("s3cret") // Ok
/// validate_not_blank("   ")    // Err
/// ```
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("value must not be blank".into());
        return Err(err);
    }
    Ok(())
}
