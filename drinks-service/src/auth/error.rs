use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;
use thiserror::Error;

/// Why a request failed authentication or authorization.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header is expected.")]
    MissingToken,

    #[error("Unable to find the appropriate key.")]
    InvalidHeader,

    #[error("Unable to parse authentication token.")]
    InvalidSignature,

    #[error("Token expired.")]
    ExpiredToken,

    #[error("Incorrect claims. Please check the audience and issuer.")]
    InvalidClaims,

    #[error("Permissions not included in JWT.")]
    MalformedClaims,

    #[error("Permission not found.")]
    InsufficientScope,
}

impl AuthError {
    /// Machine-readable code sent in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "authorization_header_missing",
            AuthError::InvalidHeader => "invalid_header",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ExpiredToken => "token_expired",
            AuthError::InvalidClaims | AuthError::MalformedClaims => "invalid_claims",
            AuthError::InsufficientScope => "unauthorized",
        }
    }

    /// 401 when the caller could not be identified, 403 when they were but
    /// the token doesn't grant the action.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MalformedClaims | AuthError::InsufficientScope => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let code = err.code();
        let message = err.to_string();
        if err.status() == StatusCode::FORBIDDEN {
            AppError::Forbidden { code, message }
        } else {
            AppError::Unauthorized { code, message }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
