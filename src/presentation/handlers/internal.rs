//! System-only endpoints driven by the paid-filing job

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::auth::{require_any_role, Claims};
use crate::presentation::dto::CompleteFilingRequest;
use crate::presentation::routes::AppState;
use crate::shared::constants::roles;
use crate::shared::types::FilingId;
use crate::shared::AppResult;

fn filing_id(raw: &str) -> AppResult<FilingId> {
    raw.parse()
        .map_err(|_| crate::validation_error!("Invalid filing id: {}", raw))
}

/// `GET /v1/internal/filings/{status}`
#[instrument(skip(app_state, claims))]
pub async fn filings_by_status(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(status): Path<String>,
) -> AppResult<Json<Value>> {
    require_any_role(&claims, &[roles::SYSTEM])?;

    let filings = app_state.businesses.filings_with_registry_business(&status).await?;
    Ok(Json(filings))
}

/// `PATCH /v1/internal/filings/{id}`: completes the filing with its registry event ids
#[instrument(skip(app_state, claims, request))]
pub async fn complete_filing(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(filing): Path<String>,
    Json(request): Json<CompleteFilingRequest>,
) -> AppResult<Json<Value>> {
    require_any_role(&claims, &[roles::SYSTEM])?;
    let id = filing_id(&filing)?;

    let filing = app_state
        .filings
        .complete_filing(id, &request.colin_event_ids)
        .await?;
    let business = app_state.filings.business_of(&filing).await?;
    info!("🏁 filing {} completed with events {:?}", filing.id, request.colin_event_ids);

    let view = app_state.filings.serialize(&filing, &business.identifier).await?;
    Ok(Json(view))
}

/// `POST /v1/internal/filings/{id}/notify`
#[instrument(skip(app_state, claims))]
pub async fn notify(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(filing): Path<String>,
) -> AppResult<Json<Value>> {
    require_any_role(&claims, &[roles::SYSTEM])?;
    let id = filing_id(&filing)?;

    app_state.notifications.send_filing_complete_email(id).await?;
    Ok(Json(json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filing_id() {
        assert_eq!(filing_id("42").unwrap(), 42);
        assert!(filing_id("paid").is_err());
    }
}
