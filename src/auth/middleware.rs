//! Authentication middleware

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use super::{AuthError, BearerToken, Claims};
use crate::presentation::routes::AppState;
use crate::shared::AppError;

/// JWT authentication middleware.
///
/// Verifies the bearer token and stores its claims and raw value in the request extensions.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())
        .ok_or(AppError::Authentication(AuthError::MissingToken))?;

    let claims = app_state
        .jwt
        .verify_token(&token)
        .map_err(AppError::Authentication)?;

    tracing::debug!(sub = %claims.sub, "authenticated request");

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}

/// Extracts a bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|auth_header| {
            auth_header
                .strip_prefix("Bearer ")
                .or_else(|| auth_header.strip_prefix("bearer "))
        })
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Fails with 403 unless the caller holds one of the roles
pub fn require_any_role(claims: &Claims, roles: &[&str]) -> Result<(), AppError> {
    if roles.iter().any(|role| claims.has_role(role)) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Missing required role: one of {}",
            roles.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::claims_for;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert("authorization", HeaderValue::from_static("Basic xyz"));
        assert!(extract_bearer_token(&headers).is_none());
    }

    #[test]
    fn test_require_any_role() {
        let claims = claims_for("u", "i", &["system"]);
        assert!(require_any_role(&claims, &["system", "staff"]).is_ok());
        assert!(matches!(
            require_any_role(&claims, &["manage_accounts"]),
            Err(AppError::Forbidden(_))
        ));
    }
}
