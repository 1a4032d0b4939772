//! Annual report filing endpoints

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::Value;
use tracing::{info, instrument};

use crate::auth::{BearerToken, Claims};
use crate::business::services::FilingSubmission;
use crate::presentation::routes::AppState;
use crate::shared::constants::http::ACCOUNT_ID_HEADER;
use crate::shared::types::FilingId;
use crate::shared::AppResult;

fn account_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(ACCOUNT_ID_HEADER).and_then(|value| value.to_str().ok())
}

/// `GET /v1/business/{identifier}/filings`
#[instrument(skip(app_state, claims, token))]
pub async fn list_filings(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(token): Extension<BearerToken>,
    Path(identifier): Path<String>,
) -> AppResult<Json<Value>> {
    let business = app_state.businesses.find_by_identifier(&identifier).await?;
    app_state.filings.authorize(&claims, token.as_str(), &identifier).await?;

    let filings = app_state.filings.list_for_business(&business).await?;
    Ok(Json(filings))
}

/// `GET /v1/business/{identifier}/filings/{id}`
#[instrument(skip(app_state, claims, token))]
pub async fn get_filing(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(token): Extension<BearerToken>,
    Path((identifier, filing_id)): Path<(String, FilingId)>,
) -> AppResult<Json<Value>> {
    let business = app_state.businesses.find_by_identifier(&identifier).await?;
    app_state.filings.authorize(&claims, token.as_str(), &identifier).await?;

    let filing = app_state.filings.find_for_business(&business, filing_id).await?;
    let view = app_state.filings.serialize(&filing, &business.identifier).await?;
    Ok(Json(view))
}

/// `POST /v1/business/{identifier}/filings`
#[instrument(skip_all, fields(identifier = %identifier))]
pub async fn create_filing(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(token): Extension<BearerToken>,
    Path(identifier): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> AppResult<(StatusCode, Json<Value>)> {
    submit(&app_state, &claims, &token, &identifier, None, &headers, payload).await
}

/// `POST|PUT /v1/business/{identifier}/filings/{id}`
#[instrument(skip_all, fields(identifier = %identifier, filing_id))]
pub async fn update_filing(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(token): Extension<BearerToken>,
    Path((identifier, filing_id)): Path<(String, FilingId)>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> AppResult<(StatusCode, Json<Value>)> {
    tracing::Span::current().record("filing_id", filing_id);
    submit(&app_state, &claims, &token, &identifier, Some(filing_id), &headers, payload).await
}

async fn submit(
    app_state: &AppState,
    claims: &Claims,
    token: &BearerToken,
    identifier: &str,
    filing_id: Option<FilingId>,
    headers: &HeaderMap,
    payload: Value,
) -> AppResult<(StatusCode, Json<Value>)> {
    let filing = app_state
        .filings
        .submit(FilingSubmission {
            identifier,
            filing_id,
            account_id: account_id(headers),
            payload,
            claims,
            token: token.as_str(),
        })
        .await?;

    info!("📝 filing {} saved as {}", filing.id, filing.status);
    let view = app_state.filings.serialize(&filing, identifier).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /v1/business/{identifier}/filings/{id}/payment`: the invoice as pay-api reports it
#[instrument(skip(app_state, token))]
pub async fn payment_details(
    State(app_state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Path((identifier, filing_id)): Path<(String, FilingId)>,
) -> AppResult<Json<Value>> {
    let business = app_state.businesses.find_by_identifier(&identifier).await?;
    let filing = app_state.filings.find_for_business(&business, filing_id).await?;

    let payment = app_state.filings.get_payment_data(filing.id, token.as_str()).await?;
    Ok(Json(payment))
}

/// `PUT /v1/business/{identifier}/filings/{id}/payment`: refreshes the payment status
#[instrument(skip(app_state, claims, token))]
pub async fn refresh_payment(
    State(app_state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(token): Extension<BearerToken>,
    Path((identifier, filing_id)): Path<(String, FilingId)>,
) -> AppResult<Json<Value>> {
    let business = app_state.businesses.find_by_identifier(&identifier).await?;
    app_state.filings.authorize(&claims, token.as_str(), &identifier).await?;
    let filing = app_state.filings.find_for_business(&business, filing_id).await?;

    let filing = app_state.filings.update_payment_data(filing.id, token.as_str()).await?;
    let view = app_state.filings.serialize(&filing, &business.identifier).await?;
    Ok(Json(view))
}

/// `GET /v1/business/{identifier}/filings/{id}/reports/{type}`: a PDF
#[instrument(skip(app_state, token))]
pub async fn filing_report(
    State(app_state): State<AppState>,
    Extension(token): Extension<BearerToken>,
    Path((identifier, filing_id, report_type)): Path<(String, FilingId, String)>,
) -> AppResult<Response> {
    let document = app_state
        .reports
        .document(&identifier, filing_id, &report_type, token.as_str())
        .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.file_name),
            ),
        ],
        document.content,
    )
        .into_response())
}
