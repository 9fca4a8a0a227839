use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use serde::Serialize;
use sqlx::Error as SqlxError;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum ShelfError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Misconfigured: {0}")]
    Misconfigured(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Image upload failed: {0}")]
    Upload(String),

    /// Local write failed after a remote write; the remote record was removed again.
    #[error("Local write failed, remote record {key} rolled back: {cause}")]
    RolledBack { key: String, cause: String },

    /// Local write failed and removing the remote record failed too.
    #[error("Local write failed and remote rollback of {key} failed: {cause}; rollback: {rollback}")]
    RollbackFailed {
        key: String,
        cause: String,
        rollback: String,
    },

    /// The remote write went through but the local mirror did not.
    #[error("Remote store updated but local store was not: {0}")]
    PartialFailure(String),

    #[error("Ractor error: {0}")]
    RactorError(String),
}

/// Per-field validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record an error; the first message for a field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<(), ShelfError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ShelfError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl IntoResponse for ShelfError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            ShelfError::NotAuthenticated => {
                return Redirect::to("/login").into_response();
            }
            ShelfError::Validation(fields) => {
                let body = ApiErrorBody {
                    code: "VALIDATION_FAILED".to_string(),
                    message: "One or more fields are invalid.".to_string(),
                    fields: Some(fields),
                };
                (StatusCode::UNPROCESSABLE_ENTITY, body)
            }
            ShelfError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody::new("INVALID_CREDENTIALS", "Incorrect email or password."),
            ),
            ShelfError::InsufficientFunds => (
                StatusCode::CONFLICT,
                ApiErrorBody::new("INSUFFICIENT_FUNDS", "Insufficient funds."),
            ),
            ShelfError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ApiErrorBody::new("NOT_FOUND", format!("{what} not found.")),
            ),
            ShelfError::Base64(_) | ShelfError::Json(_) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new("BAD_REQUEST", "Malformed request payload."),
            ),
            ShelfError::Reqwest(_)
            | ShelfError::UrlParse(_)
            | ShelfError::Remote(_)
            | ShelfError::Upload(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody::new("REMOTE_UNAVAILABLE", "The remote store is unavailable."),
            ),
            ShelfError::RolledBack { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody::new(
                    "LOCAL_WRITE_FAILED",
                    "Error saving book to local database; the remote copy was removed.",
                ),
            ),
            ShelfError::RollbackFailed { .. } | ShelfError::PartialFailure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody::new(
                    "OUT_OF_SYNC",
                    "Local and remote stores disagree for this record.",
                ),
            ),
            internal @ (ShelfError::DatabaseError(_)
            | ShelfError::Io(_)
            | ShelfError::Config(_)
            | ShelfError::Misconfigured(_)
            | ShelfError::RactorError(_)) => {
                // the response carries no detail
                error!(error = %internal, "request failed with an internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody::new("INTERNAL_ERROR", "An internal server error occurred."),
                )
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl ApiErrorBody {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            fields: None,
        }
    }
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
