//! Authentication and authorization
//!
//! Bearer JWT verification and realm-role checks

pub mod middleware;
pub mod jwt;

pub use jwt::{BearerToken, Claims, JwtService};
pub use middleware::require_any_role;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token")]
    InvalidToken,
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
}
