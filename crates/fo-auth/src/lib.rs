//! # fo-auth
//!
//! Authentication and authorization for FieldOps.
//!
//! ## Features
//!
//! - JWT bearer tokens carrying the user's roles and permission codes
//! - argon2id password hashing
//! - The permission catalog and the built-in roles
//! - `CurrentUser`, the acting user handed to contracts and services

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permissions;

pub use jwt::{extract_bearer_token, Claims, IssuedToken, JwtError, JwtService};
pub use middleware::{AuthError, AuthResult, Authenticator, RequestHeaders};
pub use password::{PasswordError, PasswordHasher};
pub use permissions::{builtin_roles, catalog, is_known_permission, CurrentUser, PermissionDef, RoleDefinition};
