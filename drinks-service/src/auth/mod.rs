//! Bearer-token authentication and permission checks.
//!
//! A request is verified by [`TokenVerifier`] (header shape, key id,
//! signature, expiry, audience, issuer) and then authorized by
//! [`check_permissions`] against one required permission string.

pub mod error;
pub mod keys;
pub mod scope;
pub mod verifier;

pub use error::AuthError;
pub use keys::{spawn_refresh, KeyError, KeySource, KeyStore, SigningKeys};
pub use scope::check_permissions;
pub use verifier::{bearer_token, Claims, TokenVerifier};

/// Permission strings checked by the drink routes.
pub mod permissions {
    pub const GET_DRINKS_DETAIL: &str = "get:drinks-detail";
    pub const POST_DRINKS: &str = "post:drinks";
    pub const PATCH_DRINKS: &str = "patch:drinks";
    pub const DELETE_DRINKS: &str = "delete:drinks";
}
