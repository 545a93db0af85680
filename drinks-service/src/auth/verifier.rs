use axum::http::HeaderValue;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::auth::{AuthError, KeyStore};
use crate::config::AuthConfig;

/// Claims this service reads from a verified access token. `aud` and `iss`
/// are checked by [`Validation`] and not kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Option<String>,
    pub exp: i64,
    pub permissions: Option<Vec<String>>,
}

/// Verifies RS256 bearer tokens against the trusted key set.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<KeyStore>,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(keys: Arc<KeyStore>, config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;
        validation.set_audience(&[&config.audience]);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);

        Self { keys, validation }
    }

    /// Full check of an `Authorization` header value.
    pub fn verify_header(&self, value: Option<&HeaderValue>) -> Result<Claims, AuthError> {
        let token = bearer_token(value)?;
        self.verify(token)
    }

    /// Header, then signature, then claims.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidHeader)?;
        if !self.validation.algorithms.contains(&header.alg) {
            return Err(AuthError::InvalidHeader);
        }
        let kid = header.kid.ok_or(AuthError::InvalidHeader)?;

        let keys = self.keys.current();
        let key = keys.get(&kid).ok_or(AuthError::InvalidHeader)?;

        let data = decode::<Claims>(token, key, &self.validation).map_err(classify)?;
        Ok(data.claims)
    }
}

/// Extracts the token from `Bearer <token>`. Anything else, including a
/// missing header, is `MissingToken`.
pub fn bearer_token(value: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let value = value
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MissingToken)?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::MissingToken),
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::Json(_) => AuthError::InvalidClaims,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => AuthError::InvalidHeader,
        _ => AuthError::InvalidSignature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bearer_in_any_case() {
        let value = HeaderValue::from_static("bearer abc.def.ghi");
        assert_eq!(bearer_token(Some(&value)), Ok("abc.def.ghi"));

        let value = HeaderValue::from_static("Bearer abc.def.ghi");
        assert_eq!(bearer_token(Some(&value)), Ok("abc.def.ghi"));
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        assert_eq!(bearer_token(None), Err(AuthError::MissingToken));

        for raw in ["Bearer", "Basic abc", "Bearer a b", "abc.def.ghi", ""] {
            let value = HeaderValue::from_static(raw);
            assert_eq!(
                bearer_token(Some(&value)),
                Err(AuthError::MissingToken),
                "header {:?}",
                raw
            );
        }
    }
}
