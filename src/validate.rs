use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// One failed rule, attributed to the input field that broke it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Runs a rule and pushes its failure, if any. Forms call this once per
/// rule and check `errors.is_empty()` before building their projection.
pub fn check(errors: &mut Vec<FieldError>, outcome: Option<FieldError>) {
    if let Some(e) = outcome {
        errors.push(e);
    }
}

pub fn required(field: &'static str, value: &str) -> Option<FieldError> {
    if value.trim().is_empty() {
        Some(FieldError::new(field, format!("{field} is required")))
    } else {
        None
    }
}

pub fn max_len(field: &'static str, value: &str, max: usize) -> Option<FieldError> {
    if value.chars().count() > max {
        Some(FieldError::new(
            field,
            format!("{field} must be at most {max} characters"),
        ))
    } else {
        None
    }
}

pub fn min_len(field: &'static str, value: &str, min: usize) -> Option<FieldError> {
    if value.chars().count() < min {
        Some(FieldError::new(
            field,
            format!("{field} must be at least {min} characters"),
        ))
    } else {
        None
    }
}

pub fn email(field: &'static str, value: &str) -> Option<FieldError> {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    if EMAIL_RE.is_match(value) {
        None
    } else {
        Some(FieldError::new(field, "Invalid email address"))
    }
}

/// Accepts absolute http/https URLs and local references (`/projects`,
/// `#`, `./demo`). Portfolio links routinely point at page anchors, so
/// this rule is deliberately lenient about relative forms.
pub fn url(field: &'static str, value: &str) -> Option<FieldError> {
    if value.starts_with('/') || value.starts_with('#') || value.starts_with('.') {
        return None;
    }
    match url::Url::parse(value) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => None,
        _ => Some(FieldError::new(field, "Invalid link")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_blank_and_whitespace() {
        assert!(required("title", "").is_some());
        assert!(required("title", "   ").is_some());
        assert!(required("title", "Simple Calculator").is_none());
    }

    #[test]
    fn max_len_bounds_inclusive() {
        assert!(max_len("title", &"x".repeat(100), 100).is_none());
        assert!(max_len("title", &"x".repeat(101), 100).is_some());
    }

    #[test]
    fn min_len_enforces_password_floor() {
        assert!(min_len("password", "short", 8).is_some());
        assert!(min_len("password", "12345678", 8).is_none());
    }

    #[test]
    fn email_accepts_plain_addresses() {
        assert!(email("email", "admin@example.com").is_none());
        assert!(email("email", "not-an-email").is_some());
        assert!(email("email", "two@at@example.com").is_some());
        assert!(email("email", "spaces in@example.com").is_some());
    }

    #[test]
    fn url_accepts_http_https_and_local_references() {
        assert!(url("link", "https://github.com/me/calc").is_none());
        assert!(url("link", "http://example.com").is_none());
        assert!(url("link", "#").is_none());
        assert!(url("link", "/projects/3").is_none());
        assert!(url("link", "./demo").is_none());
        assert!(url("link", "ftp://example.com").is_some());
        assert!(url("link", "javascript:alert(1)").is_some());
        assert!(url("link", "not a link").is_some());
    }

    #[test]
    fn field_error_serializes_field_and_message() {
        let e = FieldError::new("email", "Invalid email address");
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"field\":\"email\""));
        assert!(json.contains("Invalid email address"));
    }
}
