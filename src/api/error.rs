//! API error handling module.

#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::WalkError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Link source error: {0}")]
    UpstreamError(String),}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::UpstreamError(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<WalkError> for ApiError {
    fn from(err: WalkError) -> Self {
        match err {
            WalkError::Fetch(e) => ApiError::UpstreamError(e.to_string()),
            WalkError::InvalidTitle(_) | WalkError::InvalidBranchFactor(_) => {
                ApiError::ValidationError(err.to_string())
            }
            WalkError::NoSeed
            | WalkError::NoLinksAvailable
            | WalkError::NotResumable
            | WalkError::Superseded => ApiError::Conflict(err.to_string()),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::FetchError;

    #[test]
    fn test_error_types() {
        let err = ApiError::ValidationError("Invalid input".to_string());
        assert!(err.to_string().contains("Invalid input"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = ApiError::NotFound("Node not found".to_string());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_walk_error_mapping() {
        let err = ApiError::from(WalkError::Fetch(FetchError::Status(503)));
        assert!(matches!(err, ApiError::UpstreamError(_)));

        let err = ApiError::from(WalkError::InvalidBranchFactor(99));
        assert!(matches!(err, ApiError::ValidationError(_)));

        let err = ApiError::from(WalkError::NotResumable);
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_error_response() {
        let response = ErrorResponse {
            success: false,
            error: "Test error".to_string(),
            code: "TEST_ERROR".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("success"));
        assert!(json.contains("error"));
        assert!(json.contains("code"));
    }
}
