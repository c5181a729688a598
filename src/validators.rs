/// Input validation for signup fields
///
/// Length limits guard against oversized payloads; the email regex is the
/// practical RFC 5322 subset.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MAX_USERNAME_LENGTH: usize = 32;
pub const MIN_PASSWORD_LENGTH: usize = 6;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates an email address, returning the trimmed form.
pub fn is_valid_email(email: &str) -> Result<String, AppError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Email is required".to_string()));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(AppError::BadRequest("Email is too long".to_string()));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(AppError::BadRequest("Email has invalid format".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a username, returning the trimmed form.
pub fn is_valid_username(username: &str) -> Result<String, AppError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Username is required".to_string()));
    }

    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(AppError::BadRequest("Username is too long".to_string()));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(AppError::BadRequest(
            "Username contains invalid characters".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

/// Validates a candidate password before hashing.
pub fn is_valid_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::BadRequest("Password is required".to_string()));
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    Ok(())
}
