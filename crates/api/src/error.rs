use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hive_services::auth::AuthError;
use hive_services::coordinator::AccountError;
use hive_services::dao::base::DaoError;
use serde::Serialize;
use tracing::error;
use validator::ValidationErrors;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    InvalidState(String),
    Validation(String),
    Dependency(String),
    Retryable(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    message: String,
}

impl ApiError {
    fn into_parts(self) -> (StatusCode, &'static str, String) {
        let status = self.status();
        let (kind, message) = match self {
            ApiError::NotFound(msg) => ("not_found", msg),
            ApiError::BadRequest(msg) => ("bad_request", msg),
            ApiError::Unauthorized(msg) => ("unauthorized", msg),
            ApiError::Forbidden(msg) => ("forbidden", msg),
            ApiError::Conflict(msg) => ("conflict", msg),
            ApiError::InvalidState(msg) => ("invalid_state", msg),
            ApiError::Validation(msg) => ("validation", msg),
            ApiError::Dependency(msg) => ("dependency_failure", msg),
            ApiError::Retryable(msg) => ("retryable", msg),
            ApiError::Internal(msg) => ("internal", msg),
        };
        (status, kind, message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::InvalidState(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Dependency(_) => StatusCode::BAD_GATEWAY,
            ApiError::Retryable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.into_parts();
        let body = ErrorResponse {
            success: false,
            error: error_type.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound(msg) => ApiError::NotFound(msg),
            // Raw duplicate-key text names indexes and values; never echo it.
            DaoError::DuplicateKey(_) => {
                ApiError::Conflict("The resource already exists".to_string())
            }
            DaoError::Conflict(msg) => ApiError::Conflict(msg),
            DaoError::Forbidden(msg) => ApiError::Forbidden(msg),
            DaoError::InvalidState(msg) => ApiError::InvalidState(msg),
            DaoError::Validation(msg) => ApiError::Validation(msg),
            DaoError::Dependency(msg) => ApiError::Dependency(msg),
            DaoError::Retryable(msg) => ApiError::Retryable(msg),
            DaoError::Mongo(e) => {
                error!(%e, "Database error");
                ApiError::Internal("Internal server error".to_string())
            }
            DaoError::BsonSer(e) => {
                error!(%e, "BSON serialization error");
                ApiError::Internal("Internal server error".to_string())
            }
            DaoError::BsonDe(e) => {
                error!(%e, "BSON deserialization error");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
            AuthError::InvalidToken(_) => ApiError::Unauthorized("Invalid token".to_string()),
            AuthError::HashError(msg) => {
                error!(%msg, "Password hashing failed");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Dao(e) => e.into(),
            AccountError::Auth(e) => e.into(),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}
