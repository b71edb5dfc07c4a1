//! Error body types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Message for a missing required field.
pub const FIELD_REQUIRED: &str = "This field is required.";

/// Message for a blank string field.
pub const FIELD_BLANK: &str = "This field may not be blank.";

/// Message for an explicit `null` on a non-nullable field.
pub const FIELD_NULL: &str = "This field may not be null.";

/// Message attached to `non_field_errors` for rejected credentials.
pub const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

/// Key for errors not tied to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request body failed validation
    ValidationError,
    /// Email and password did not match an active user
    InvalidCredentials,
    /// Missing, invalid, expired or revoked token
    AuthenticationRequired,
    /// The resource does not exist or is not owned by the caller
    NotFound,
    /// Unexpected server-side failure
    InternalError,
}

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Creates an empty set of field errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates field errors holding one message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Records a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Returns true if no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the messages recorded against a field.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Returns the field names that have errors.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns `Ok(value)` if no errors were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Per-field validation messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

/// Top-level error body: `{"error": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

impl ErrorBody {
    /// Creates an error body without field details.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code,
                message: message.into(),
                fields: None,
            },
        }
    }

    /// Creates an error body with per-field messages.
    pub fn with_fields(code: ErrorCode, message: impl Into<String>, fields: FieldErrors) -> Self {
        Self {
            error: ErrorDetail {
                code,
                message: message.into(),
                fields: Some(fields),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody::with_fields(
            ErrorCode::ValidationError,
            "Invalid input",
            FieldErrors::single("title", FIELD_REQUIRED),
        );

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "validation_error");
        assert_eq!(json["error"]["message"], "Invalid input");
        assert_eq!(json["error"]["fields"]["title"][0], FIELD_REQUIRED);
    }

    #[test]
    fn test_fields_omitted_when_absent() {
        let body = ErrorBody::new(ErrorCode::NotFound, "Not found");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "not_found");
        assert!(json["error"].get("fields").is_none());
    }

    #[test]
    fn test_field_errors_accumulate() {
        let mut errors = FieldErrors::new();
        assert!(errors.is_empty());

        errors.add("password", "too short");
        errors.add("password", "too common");
        errors.add("email", FIELD_REQUIRED);

        assert_eq!(errors.get("password").unwrap().len(), 2);
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email", "password"]);
        assert!(errors.into_result(()).is_err());
    }
}
