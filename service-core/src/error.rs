use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NOT_FOUND_MESSAGE: &str = "resource not found";
pub const UNPROCESSABLE_MESSAGE: &str = "unprocessable";
pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "method not allowed";
const INTERNAL_MESSAGE: &str = "internal server error";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Unauthorized ({code}): {message}")]
    Unauthorized { code: &'static str, message: String },

    #[error("Forbidden ({code}): {message}")]
    Forbidden { code: &'static str, message: String },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Service Unavailable")]
    ServiceUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    /// 404 with the default message.
    pub fn not_found() -> Self {
        AppError::NotFound(NOT_FOUND_MESSAGE.to_string())
    }

    /// 422 with the default message.
    pub fn unprocessable() -> Self {
        AppError::Unprocessable(UNPROCESSABLE_MESSAGE.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::Unprocessable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_) | AppError::DatabaseError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

/// Body of every failed response: `{success:false, error:<status>, message}`.
/// Authentication failures also carry a machine-readable `code`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (code, message) = match self {
            AppError::ValidationError(err) => (None, err.to_string()),
            AppError::NotFound(msg) | AppError::Unprocessable(msg) => (None, msg),
            AppError::MethodNotAllowed => (None, METHOD_NOT_ALLOWED_MESSAGE.to_string()),
            AppError::Unauthorized { code, message } | AppError::Forbidden { code, message } => {
                (Some(code.to_string()), message)
            }
            AppError::ServiceUnavailable => (None, "service unavailable".to_string()),
            AppError::InternalError(err)
            | AppError::DatabaseError(err)
            | AppError::ConfigError(err) => {
                // Internal causes stay in the logs.
                tracing::error!(error = ?err, "Request failed with internal error");
                (None, INTERNAL_MESSAGE.to_string())
            }
        };

        (
            status,
            Json(ErrorEnvelope {
                success: false,
                error: status.as_u16(),
                code,
                message,
            }),
        )
            .into_response()
    }
}
