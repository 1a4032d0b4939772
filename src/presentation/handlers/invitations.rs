//! Staff invitation endpoints

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use tracing::instrument;

use crate::auth::{require_any_role, Claims};
use crate::presentation::dto::InvitationSearchQuery;
use crate::presentation::routes::AppState;
use crate::shared::constants::roles;
use crate::shared::types::{InvitationId, Page, PaginationParams};
use crate::shared::AppResult;

const INVITATION_ROLES: [&str; 2] = [roles::SYSTEM, roles::STAFF];

/// `GET /v1/invitations?text&status&page&limit`
#[instrument(skip(app_state, claims))]
pub async fn search_invitations(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<InvitationSearchQuery>,
) -> AppResult<Json<Page<Value>>> {
    require_any_role(&claims, &INVITATION_ROLES)?;

    let params = PaginationParams::from_query(query.page, query.limit);
    let page = app_state
        .invitations
        .search(query.text, query.status.as_deref(), params)
        .await?;
    Ok(Json(page))
}

/// `DELETE /v1/invitations/{id}`: expires the invitation
#[instrument(skip(app_state, claims))]
pub async fn expire_invitation(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(invitation_id): Path<InvitationId>,
) -> AppResult<Json<Value>> {
    require_any_role(&claims, &INVITATION_ROLES)?;

    app_state.invitations.expire(invitation_id).await?;
    Ok(Json(json!({})))
}
