//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Validates a display name.
///
/// Requirements:
/// - 2-50 characters after trimming
/// - Not made only of whitespace
pub fn validate_person_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("name_blank"));
    }

    let len = trimmed.chars().count();
    if !(2..=50).contains(&len) {
        return Err(ValidationError::new("name_invalid_length"));
    }

    Ok(())
}

/// Validates a subject code: exactly five ASCII alphanumeric characters.
pub fn validate_subject_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != 5 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new("subject_code_invalid"));
    }
    Ok(())
}
