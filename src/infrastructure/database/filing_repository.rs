//! Filing persistence, including the registry event ids attached on completion

use sqlx::PgPool;
use tracing::{info, instrument};

use super::db_error;
use crate::business::domain::{Filing, FilingStatus, NewFiling};
use crate::shared::types::{BusinessId, FilingId};
use crate::shared::AppResult;

const FILING_COLUMNS: &str = "id, fiscal_year, filing_json, filing_date, completion_date, status, invoice_id, \
     payment_status_code, payment_completion_date, payment_account, business_id, submitter_id";

#[derive(Debug, Clone)]
pub struct FilingRepository {
    pool: PgPool,
}

impl FilingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: FilingId) -> AppResult<Option<Filing>> {
        sqlx::query_as::<_, Filing>(&format!("SELECT {FILING_COLUMNS} FROM filing WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    #[instrument(skip(self))]
    pub async fn find_by_business(&self, business_id: BusinessId) -> AppResult<Vec<Filing>> {
        sqlx::query_as::<_, Filing>(&format!(
            "SELECT {FILING_COLUMNS} FROM filing WHERE business_id = $1 ORDER BY filing_date DESC"
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    #[instrument(skip(self))]
    pub async fn find_by_business_and_statuses(
        &self,
        business_id: BusinessId,
        statuses: &[FilingStatus],
    ) -> AppResult<Vec<Filing>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        sqlx::query_as::<_, Filing>(&format!(
            "SELECT {FILING_COLUMNS} FROM filing WHERE business_id = $1 AND status = ANY($2) \
             ORDER BY filing_date DESC"
        ))
        .bind(business_id)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    #[instrument(skip(self))]
    pub async fn find_by_status(&self, status: FilingStatus) -> AppResult<Vec<Filing>> {
        sqlx::query_as::<_, Filing>(&format!(
            "SELECT {FILING_COLUMNS} FROM filing WHERE status = $1 ORDER BY filing_date"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    #[instrument(skip(self, new_filing), fields(business_id = new_filing.business_id))]
    pub async fn create(&self, new_filing: &NewFiling) -> AppResult<Filing> {
        let filing = sqlx::query_as::<_, Filing>(&format!(
            r#"
            INSERT INTO filing (fiscal_year, filing_json, status, business_id, submitter_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {FILING_COLUMNS}
            "#
        ))
        .bind(new_filing.fiscal_year)
        .bind(&new_filing.filing_json)
        .bind(FilingStatus::Draft.as_str())
        .bind(new_filing.business_id)
        .bind(new_filing.submitter_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        info!("📝 filing {} created", filing.id);
        Ok(filing)
    }

    /// Persists every mutable column of the filing
    #[instrument(skip(self, filing), fields(filing_id = filing.id))]
    pub async fn update(&self, filing: &Filing) -> AppResult<Filing> {
        sqlx::query_as::<_, Filing>(&format!(
            r#"
            UPDATE filing SET
                fiscal_year = $2,
                filing_json = $3,
                completion_date = $4,
                status = $5,
                invoice_id = $6,
                payment_status_code = $7,
                payment_completion_date = $8,
                payment_account = $9,
                submitter_id = $10
            WHERE id = $1
            RETURNING {FILING_COLUMNS}
            "#
        ))
        .bind(filing.id)
        .bind(filing.fiscal_year)
        .bind(&filing.filing_json)
        .bind(filing.completion_date)
        .bind(filing.status.as_str())
        .bind(filing.invoice_id)
        .bind(&filing.payment_status_code)
        .bind(filing.payment_completion_date)
        .bind(&filing.payment_account)
        .bind(filing.submitter_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    /// Stores the completed filing and its registry event ids in one transaction
    #[instrument(skip(self, filing), fields(filing_id = filing.id))]
    pub async fn save_completion(&self, filing: &Filing, colin_event_ids: &[i32]) -> AppResult<Filing> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        for event_id in colin_event_ids {
            sqlx::query(
                "INSERT INTO colin_event_id (colin_event_id, filing_id) VALUES ($1, $2) \
                 ON CONFLICT (colin_event_id) DO NOTHING",
            )
            .bind(event_id)
            .bind(filing.id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        let saved = sqlx::query_as::<_, Filing>(&format!(
            "UPDATE filing SET status = $2, completion_date = $3 WHERE id = $1 RETURNING {FILING_COLUMNS}"
        ))
        .bind(filing.id)
        .bind(filing.status.as_str())
        .bind(filing.completion_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        info!("✅ filing {} completed with {} registry events", saved.id, colin_event_ids.len());
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn colin_event_ids(&self, filing_id: FilingId) -> AppResult<Vec<i32>> {
        sqlx::query_scalar::<_, i32>(
            "SELECT colin_event_id FROM colin_event_id WHERE filing_id = $1 ORDER BY colin_event_id",
        )
        .bind(filing_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }
}
