use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Error taxonomy translated to HTTP at the request boundary. Internal detail
/// is logged, never returned to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Authentication(String),
    #[error("Account is not verified yet")]
    NeedsVerification,
    #[error("{0}")]
    Authorization(String),
    #[error("Something went wrong")]
    Dependency(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "needsVerification", skip_serializing_if = "Option::is_none")]
    pub needs_verification: Option<bool>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::NeedsVerification | ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Dependency(e) = &self {
            error!(error = %e, "request failed on a dependency");
        }
        let body = ErrorBody {
            message: self.to_string(),
            needs_verification: matches!(self, ApiError::NeedsVerification).then_some(true),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Authentication("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::NeedsVerification.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Authorization("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Dependency(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn needs_verification_carries_flag() {
        let body = ErrorBody {
            message: ApiError::NeedsVerification.to_string(),
            needs_verification: Some(true),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"needsVerification\":true"));
    }

    #[test]
    fn plain_errors_omit_flag() {
        let body = ErrorBody {
            message: "Invalid email or password".into(),
            needs_verification: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("needsVerification"));
    }

    #[test]
    fn dependency_hides_internal_detail() {
        let err = ApiError::Dependency(anyhow::anyhow!("connection refused to 10.0.0.3"));
        assert_eq!(err.to_string(), "Something went wrong");
    }
}
