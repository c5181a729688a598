/// Unified Error Handling
///
/// Every handler returns `Result<HttpResponse, AppError>` and failures
/// terminate the request with a structured `{code, message}` body. There is
/// a single propagation channel: domain code raises `AppError`, the actix
/// `ResponseError` impl logs it and shapes the HTTP response.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Central error type for the whole application.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Missing or malformed input.
    BadRequest(String),
    /// Bad credentials, bad/expired/unregistered refresh token, missing or
    /// invalid access token.
    Unauthorized(String),
    /// Authenticated but not entitled to the resource.
    Forbidden(String),
    NotFound(String),
    /// Duplicate unique key.
    Conflict(String),
    /// Unexpected or configuration errors. The message is logged but never
    /// sent to the client.
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "{}", msg),
            AppError::Unauthorized(msg) => write!(f, "{}", msg),
            AppError::Forbidden(msg) => write!(f, "{}", msg),
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::Conflict(msg) => write!(f, "{}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let error_msg = err.to_string();

        if error_msg.contains("duplicate key") || error_msg.contains("unique constraint") {
            AppError::Conflict("Duplicate entry".to_string())
        } else if matches!(err, sqlx::Error::RowNotFound) {
            AppError::NotFound("Record not found".to_string())
        } else {
            AppError::Internal(error_msg)
        }
    }
}

/// Error response body sent to clients.
#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
            }
            AppError::Unauthorized(msg) => {
                tracing::warn!(error = %msg, "Authorization failure");
            }
            other => {
                tracing::warn!(error = %other, code = other.code(), "Request failed");
            }
        }

        HttpResponse::build(self.status_code()).json(ErrorBody {
            code: self.code().to_string(),
            message: self.public_message(),
        })
    }
}
