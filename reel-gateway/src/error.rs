//! Feathers-style HTTP errors.
//!
//! Every failure leaves the gateway as JSON of the shape
//! `{"name", "message", "code", "className"}`.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reel_blob::BlobError;
use serde_json::json;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,         // 400
    NotFound,           // 404
    PreconditionFailed, // 412
    PayloadTooLarge,    // 413
    GeneralError,       // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::PreconditionFailed => 412,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::GeneralError => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PreconditionFailed => "PreconditionFailed",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
            ErrorKind::GeneralError => "GeneralError",
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotFound => "not-found",
            ErrorKind::PreconditionFailed => "precondition-failed",
            ErrorKind::PayloadTooLarge => "payload-too-large",
            ErrorKind::GeneralError => "general-error",
        }
    }
}

#[derive(Debug)]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn precondition_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreconditionFailed, msg)
    }
    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "name": self.kind.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.kind.class_name(),
        })
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind.name(), self.code(), self.message)
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<BlobError> for GatewayError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound { key } => Self::not_found(format!("Object not found: {key}")),
            BlobError::Invalid { message } => Self::bad_request(message),
            BlobError::TooLarge { max_bytes } => Self::payload_too_large(format!(
                "Object exceeds maximum size of {max_bytes} bytes"
            )),
            // Store failures carry the underlying message to the caller
            other => {
                let message = other.to_string();
                Self::general_error(message).with_source(other)
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if self.kind == ErrorKind::GeneralError {
            tracing::error!(error = %self, source = ?self.source, "Request failed");
        }
        let status =
            StatusCode::from_u16(self.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_errors_map_to_http_kinds() {
        let not_found: GatewayError = BlobError::not_found("a.mp4").into();
        assert_eq!(not_found.code(), 404);
        assert!(not_found.message.to_lowercase().contains("not found"));

        let too_large: GatewayError = BlobError::TooLarge { max_bytes: 10 }.into();
        assert_eq!(too_large.code(), 413);

        let invalid: GatewayError = BlobError::invalid("empty key").into();
        assert_eq!(invalid.kind, ErrorKind::BadRequest);
    }

    #[test]
    fn store_failures_embed_underlying_message() {
        let err: GatewayError = BlobError::backend(std::io::Error::other("quota exceeded")).into();
        assert_eq!(err.code(), 500);
        assert!(err.message.contains("quota exceeded"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn json_shape_is_feathers_like() {
        let body = GatewayError::bad_request("Missing fileName or contentType").to_json();
        assert_eq!(body["name"], "BadRequest");
        assert_eq!(body["code"], 400);
        assert_eq!(body["className"], "bad-request");
        assert_eq!(body["message"], "Missing fileName or contentType");
    }
}
