/// Input validation utilities
use crate::error::BoxError;
use regex::Regex;

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"
    ).unwrap();
}

pub fn validate_email_address(email: &str) -> Result<(), BoxError> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(BoxError::Validation(format!(
            "Invalid email address: {}",
            email
        )))
    }
}

/// Returns the trimmed value, or a validation error naming the missing field
pub fn require<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, BoxError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BoxError::Validation(format!("{} is required", field)))
}
