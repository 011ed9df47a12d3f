// src/validation.rs
//
// Field checks run before anything is written. Each returns the cleaned value.

use std::sync::OnceLock;

use mongodb::bson::oid::ObjectId;
use regex::Regex;

use crate::error::{ApiError, ApiResult};

pub const TITLE_MAX: usize = 40;
pub const DESCRIPTION_MAX: usize = 150;
pub const NAME_MAX: usize = 60;
pub const EMAIL_MAX: usize = 60;

fn email_pattern() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

fn required(raw: &str, field: &str, max: usize) -> ApiResult<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(ApiError::Validation(format!(
            "{field} cannot be longer than {max} characters"
        )));
    }
    Ok(value.to_string())
}

pub fn title(raw: &str) -> ApiResult<String> {
    required(raw, "Title", TITLE_MAX)
}

/// Absent descriptions become empty.
pub fn description(raw: Option<&str>) -> ApiResult<String> {
    let value = raw.unwrap_or_default().trim();
    if value.chars().count() > DESCRIPTION_MAX {
        return Err(ApiError::Validation(format!(
            "Description cannot be longer than {DESCRIPTION_MAX} characters"
        )));
    }
    Ok(value.to_string())
}

pub fn name(raw: &str) -> ApiResult<String> {
    required(raw, "Name", NAME_MAX)
}

pub fn email(raw: &str) -> ApiResult<String> {
    let value = required(raw, "Email", EMAIL_MAX)?;
    match email_pattern() {
        Some(pattern) if pattern.is_match(&value) => Ok(value),
        _ => Err(ApiError::Validation("Email is not a valid address".to_string())),
    }
}

pub fn password(raw: &str) -> ApiResult<&str> {
    if raw.is_empty() {
        return Err(ApiError::Validation("Password is required".to_string()));
    }
    Ok(raw)
}

/// Profile images are stored as URLs; an empty string clears the image.
pub fn profile_image(raw: &str) -> ApiResult<String> {
    let value = raw.trim();
    if value.is_empty() || value.starts_with("http://") || value.starts_with("https://") {
        Ok(value.to_string())
    } else {
        Err(ApiError::Validation(
            "Profile image must be an http(s) URL".to_string(),
        ))
    }
}

/// Parse a hex id from a path or body. `what` names it in the error.
pub fn object_id(raw: &str, what: &str) -> ApiResult<ObjectId> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ApiError::Validation(format!("Invalid {what} id")))
}

pub fn object_ids(raw: &[String], what: &str) -> ApiResult<Vec<ObjectId>> {
    raw.iter().map(|id| object_id(id, what)).collect()
}
