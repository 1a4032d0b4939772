//! Business endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{Datelike, Utc};
use serde_json::Value;
use tracing::{info, instrument};

use crate::auth::{require_any_role, Claims};
use crate::presentation::dto::{AuthEntityRequest, TasksResponse};
use crate::presentation::routes::AppState;
use crate::shared::constants::roles;
use crate::shared::AppResult;

/// `GET /v1/business/token/{token}`: the business an emailed link points at
#[instrument(skip_all)]
pub async fn business_by_token(
    State(app_state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<Value>> {
    let business = app_state.businesses.details_for_token(&token).await?;
    Ok(Json(business))
}

/// `GET /v1/business/{identifier}`
#[instrument(skip(app_state))]
pub async fn business_details(
    State(app_state): State<AppState>,
    Path(identifier): Path<String>,
) -> AppResult<Json<Value>> {
    let details = app_state.businesses.details_with_offices(&identifier).await?;
    Ok(Json(details))
}

/// `POST /v1/business/auth`
#[instrument(skip_all, fields(sub = %claims.sub))]
pub async fn create_auth_entity(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<AuthEntityRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    require_any_role(&claims, &[roles::MANAGE_ACCOUNTS, roles::ACCOUNT_HOLDER])?;

    let entity = app_state
        .businesses
        .create_auth_entity(request.business_identifier.as_deref())
        .await?;
    info!("🆕 auth entity created");
    Ok((StatusCode::CREATED, Json(entity)))
}

/// `GET /v1/business/{identifier}/tasks`
#[instrument(skip(app_state))]
pub async fn pending_tasks(
    State(app_state): State<AppState>,
    Path(identifier): Path<String>,
) -> AppResult<Json<TasksResponse>> {
    let tasks = app_state
        .businesses
        .pending_tasks(&identifier, Utc::now().year())
        .await?;
    Ok(Json(TasksResponse { tasks }))
}
