use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use std::sync::Arc;

use crate::auth::{check_permissions, AuthError, Claims, TokenVerifier};

/// State for one guarded route: the verifier plus the permission it needs.
#[derive(Clone)]
pub struct PermissionGuard {
    pub verifier: Arc<TokenVerifier>,
    pub permission: &'static str,
}

impl PermissionGuard {
    pub fn new(verifier: Arc<TokenVerifier>, permission: &'static str) -> Self {
        Self {
            verifier,
            permission,
        }
    }
}

/// Verifies the bearer token and checks the route's permission before the
/// handler runs. Verified claims are stored in request extensions.
pub async fn permission_guard(
    State(guard): State<PermissionGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let claims = guard
        .verifier
        .verify_header(req.headers().get(header::AUTHORIZATION))
        .and_then(|claims| {
            check_permissions(&claims, guard.permission)?;
            Ok(claims)
        })
        .map_err(|e| {
            tracing::warn!(
                method = %method,
                path = %path,
                required_permission = guard.permission,
                code = e.code(),
                "Request rejected: {}",
                e
            );
            e
        })?;

    tracing::debug!(
        subject = claims.sub.as_deref().unwrap_or("unknown"),
        permission = guard.permission,
        "Permission granted"
    );

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Claims of the caller on a guarded route.
pub struct AuthClaims(pub Claims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<Claims>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Auth claims missing from request extensions"
            ))
        })?;

        Ok(AuthClaims(claims.clone()))
    }
}
