/// API Error types
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nesttag_core::BoxError;
use nesttag_core::auth::AuthError;
use serde_json::json;
use tracing::{debug, error, warn};

/// API Error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg) => msg,
            // Details stay in the logs
            ApiError::Internal(_) => "Internal server error".to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Convert nesttag-core errors to API errors
impl From<BoxError> for ApiError {
    fn from(err: BoxError) -> Self {
        if err.is_client_error() {
            debug!(error = %err, "Request rejected");
        } else {
            error!(error = %err, "Request failed");
        }

        match err {
            BoxError::Validation(msg) => ApiError::BadRequest(msg),
            BoxError::NotFound(msg) => ApiError::NotFound(msg),
            BoxError::Forbidden(msg) => ApiError::Forbidden(msg),
            BoxError::NotAuthorized(_) => {
                ApiError::Unauthorized("Incorrect email or password".to_string())
            }
            BoxError::UserNotFound(_) => ApiError::NotFound("User not found".to_string()),
            BoxError::GroupNotFound(_) => {
                ApiError::NotFound("The specified group was not found".to_string())
            }
            BoxError::UsernameExists(_) => {
                ApiError::Conflict("Username already exists".to_string())
            }
            BoxError::InvalidPassword(_) => {
                ApiError::BadRequest("Password does not meet the requirements".to_string())
            }
            BoxError::UserNotConfirmed(_) => {
                ApiError::BadRequest("User is not confirmed".to_string())
            }
            BoxError::CodeMismatch(_) => {
                ApiError::BadRequest("Invalid verification code".to_string())
            }
            BoxError::ExpiredCode(_) => {
                ApiError::BadRequest("Verification code has expired".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Every authentication or authorization failure looks the same to clients
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        warn!(reason = %err, "Authentication failed");
        ApiError::Unauthorized("Authentication required".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (BoxError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (BoxError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (BoxError::UserNotFound("x".into()), StatusCode::NOT_FOUND),
            (BoxError::GroupNotFound("x".into()), StatusCode::NOT_FOUND),
            (BoxError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (BoxError::NotAuthorized("x".into()), StatusCode::UNAUTHORIZED),
            (BoxError::UsernameExists("x".into()), StatusCode::CONFLICT),
            (BoxError::InvalidPassword("x".into()), StatusCode::BAD_REQUEST),
            (BoxError::UserNotConfirmed("x".into()), StatusCode::BAD_REQUEST),
            (BoxError::CodeMismatch("x".into()), StatusCode::BAD_REQUEST),
            (BoxError::ExpiredCode("x".into()), StatusCode::BAD_REQUEST),
            (BoxError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (BoxError::Signing("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let response = ApiError::from(BoxError::Database("table missing".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_errors_are_unauthorized() {
        let err = ApiError::from(AuthError::Forbidden("admins".into()));
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Authentication required"));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
