//! Account endpoints, proxied to auth-api

use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use serde_json::Value;
use tracing::{info, instrument};

use crate::auth::BearerToken;
use crate::presentation::dto::AccountSearchQuery;
use crate::presentation::routes::AppState;
use crate::shared::AppResult;

/// `GET /v1/accounts?name=`
#[instrument(skip(app_state))]
pub async fn search_accounts(
    State(app_state): State<AppState>,
    Query(query): Query<AccountSearchQuery>,
) -> AppResult<Json<Value>> {
    let accounts = app_state.accounts.search(query.name.as_deref()).await?;
    Ok(Json(accounts))
}

/// `GET /v1/user/accounts`
pub async fn user_accounts(
    State(app_state): State<AppState>,
    Extension(token): Extension<BearerToken>,
) -> AppResult<Json<Value>> {
    let accounts = app_state.accounts.user_accounts(token.as_str()).await?;
    Ok(Json(accounts))
}

/// `POST /v1/user/accounts`
#[instrument(skip_all)]
pub async fn create_account(
    State(app_state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Json(payload): Json<Value>,
) -> AppResult<Json<Value>> {
    info!("🏢 creating account");
    let account = app_state.accounts.create(token.as_str(), &payload).await?;
    Ok(Json(account))
}
