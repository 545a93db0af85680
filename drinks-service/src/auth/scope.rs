use crate::auth::{AuthError, Claims};

/// Exact-match membership of `permission` in the token's `permissions`.
pub fn check_permissions(claims: &Claims, permission: &str) -> Result<(), AuthError> {
    let granted = claims
        .permissions
        .as_ref()
        .ok_or(AuthError::MalformedClaims)?;

    if granted.iter().any(|p| p == permission) {
        Ok(())
    } else {
        Err(AuthError::InsufficientScope)
    }
}
