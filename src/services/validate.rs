//! Field checks shared by the content services

use crate::error::FieldErrors;

/// Longest accepted title or name
pub const MAX_TITLE_LEN: usize = 255;

/// Trimmed required text; records an error when blank or too long
pub fn required(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("{} is required", field));
    } else if value.chars().count() > MAX_TITLE_LEN {
        errors.add(field, format!("{} must be at most {} characters", field, MAX_TITLE_LEN));
    }
    value.to_string()
}

/// Trimmed optional text; blank becomes `None`
pub fn optional(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Optional date, either `YYYY-MM-DD` or RFC 3339
pub fn optional_date(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    let value = optional(value)?;
    let valid = chrono::NaiveDate::parse_from_str(&value, "%Y-%m-%d").is_ok()
        || chrono::DateTime::parse_from_rfc3339(&value).is_ok();
    if !valid {
        errors.add(field, format!("{} must be a date (YYYY-MM-DD)", field));
    }
    Some(value)
}

/// Optional absolute http(s) URL
pub fn optional_url(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    let value = optional(value)?;
    match url::Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        _ => errors.add(field, format!("{} must be an http or https URL", field)),
    }
    Some(value)
}

/// Optional link that may also be a site-relative path such as `/ppdb`
pub fn optional_link(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    match optional(value) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => Some(path),
        other => optional_url(errors, field, other),
    }
}

pub fn optional_email(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    let value = optional(value)?;
    let valid = value
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'))
        .unwrap_or(false);
    if !valid {
        errors.add(field, format!("{} must be an email address", field));
    }
    Some(value)
}
