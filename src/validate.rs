use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Username must be 3-50 characters. No trimming or case folding:
/// usernames compare exactly everywhere.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if len < 3 {
        return Err(AppError::Validation(
            "Username must be at least 3 characters long".into(),
        ));
    }
    if len > 50 {
        return Err(AppError::Validation(
            "Username cannot exceed 50 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if email.chars().count() > 100 {
        return Err(AppError::Validation("Email cannot exceed 100 characters".into()));
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation("Invalid Email Address format".into()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters long".into(),
        ));
    }
    Ok(())
}
