//! Invitation persistence

use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, instrument};

use super::db_error;
use crate::business::domain::{Invitation, InvitationStatus};
use crate::shared::types::{BusinessId, InvitationId, PaginationParams};
use crate::shared::AppResult;

const INVITATION_COLUMNS: &str = "id, recipients, message, sent_date, expiration_date, token, status, \
     additional_message, business_id";

/// Filters for the staff invitation search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvitationSearch {
    /// Matches identifier or legal name (substring) or recipients (whole value), case-insensitively
    pub text: Option<String>,
    pub status: Option<InvitationStatus>,
}

/// Invitation joined with the public fields of its business
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvitationSearchRow {
    #[sqlx(flatten)]
    pub invitation: Invitation,
    pub legal_name: String,
    pub legal_type: String,
    pub identifier: String,
    pub tax_id: Option<String>,
}

impl InvitationSearchRow {
    /// Business view merged with the invitation view
    pub fn json(&self) -> Value {
        let mut item = serde_json::json!({
            "legalName": self.legal_name,
            "legalType": self.legal_type,
            "identifier": self.identifier,
            "taxId": self.tax_id,
        });
        if let (Some(target), Value::Object(invitation)) = (item.as_object_mut(), self.invitation.json()) {
            target.extend(invitation);
        }
        item
    }
}

#[derive(Debug, Clone)]
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: InvitationId) -> AppResult<Option<Invitation>> {
        sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    #[instrument(skip(self, token))]
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<Invitation>> {
        sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    /// Most recent SENT invitation of a business
    #[instrument(skip(self))]
    pub async fn find_active_by_business(&self, business_id: BusinessId) -> AppResult<Option<Invitation>> {
        sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE business_id = $1 AND status = $2 \
             ORDER BY id DESC LIMIT 1"
        ))
        .bind(business_id)
        .bind(InvitationStatus::Sent.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    #[instrument(skip(self, invitation), fields(invitation_id = invitation.id))]
    pub async fn update_status(&self, invitation: &Invitation) -> AppResult<()> {
        sqlx::query("UPDATE invitations SET status = $2, expiration_date = $3 WHERE id = $1")
            .bind(invitation.id)
            .bind(invitation.status.as_str())
            .bind(invitation.expiration_date)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Newest first, one page at a time; returns the page and the total match count
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        search: &InvitationSearch,
        params: PaginationParams,
    ) -> AppResult<(Vec<InvitationSearchRow>, i64)> {
        let pattern = search.text.as_ref().map(|text| format!("%{}%", text));
        let status = search.status.map(|s| s.as_str().to_string());

        const FILTER: &str = r#"
            FROM invitations i
            JOIN business b ON b.id = i.business_id
            WHERE ($1::text IS NULL
                   OR b.identifier ILIKE $1
                   OR b.legal_name ILIKE $1
                   OR i.recipients ILIKE $2)
              AND ($3::text IS NULL OR i.status = $3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {FILTER}"))
            .bind(&pattern)
            .bind(&search.text)
            .bind(&status)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let rows = sqlx::query_as::<_, InvitationSearchRow>(&format!(
            r#"
            SELECT i.id, i.recipients, i.message, i.sent_date, i.expiration_date, i.token, i.status,
                   i.additional_message, i.business_id,
                   b.legal_name, b.legal_type, b.identifier, b.tax_id
            {FILTER}
            ORDER BY i.id DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(&pattern)
        .bind(&search.text)
        .bind(&status)
        .bind(params.limit as i64)
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        info!("🔍 invitation search matched {} (page of {})", total, rows.len());
        Ok((rows, total))
    }
}
