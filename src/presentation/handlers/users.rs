//! User profile and terms of use

use axum::{extract::State, response::Json, Extension};
use serde_json::Value;
use tracing::instrument;

use crate::auth::{BearerToken, Claims};
use crate::presentation::routes::AppState;
use crate::shared::AppResult;

/// `POST /v1/users`: refreshes the caller's profile in auth-api
#[instrument(skip_all, fields(sub = %claims.sub))]
pub async fn update_profile(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(token): Extension<BearerToken>,
) -> AppResult<Json<Value>> {
    let user = app_state.accounts.update_user_profile(token.as_str()).await?;
    Ok(Json(user))
}

/// `GET /v1/users/tos`
pub async fn terms_of_use(
    State(app_state): State<AppState>,
    Extension(token): Extension<BearerToken>,
) -> AppResult<Json<Value>> {
    let terms = app_state.accounts.user_terms(token.as_str()).await?;
    Ok(Json(terms))
}

/// `PATCH /v1/users/tos`
#[instrument(skip_all)]
pub async fn update_terms_of_use(
    State(app_state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Json(payload): Json<Value>,
) -> AppResult<Json<Value>> {
    let terms = app_state.accounts.update_user_terms(token.as_str(), &payload).await?;
    Ok(Json(terms))
}
