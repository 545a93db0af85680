pub mod permission;

pub use permission::{permission_guard, AuthClaims, PermissionGuard};
