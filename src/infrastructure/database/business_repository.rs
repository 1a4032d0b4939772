//! Business persistence

use sqlx::PgPool;
use tracing::{info, instrument};

use super::db_error;
use crate::business::domain::{Business, BusinessUpsert, ReminderWindow};
use crate::shared::types::BusinessId;
use crate::shared::AppResult;

const BUSINESS_COLUMNS: &str = "id, legal_name, legal_type, identifier, tax_id, email, founding_date, \
     last_ar_reminder_year, ar_reminder_flag, state, op_state, corp_class";

#[derive(Debug, Clone)]
pub struct BusinessRepository {
    pool: PgPool,
}

impl BusinessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<Business>> {
        sqlx::query_as::<_, Business>(&format!(
            "SELECT {BUSINESS_COLUMNS} FROM business WHERE identifier = $1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: BusinessId) -> AppResult<Option<Business>> {
        sqlx::query_as::<_, Business>(&format!("SELECT {BUSINESS_COLUMNS} FROM business WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    /// Active, opted-in businesses whose anniversary falls in the window and that
    /// have not been reminded this year, oldest first
    #[instrument(skip(self, window))]
    pub async fn find_due_for_reminder(
        &self,
        window: &ReminderWindow,
        current_year: i32,
        limit: i64,
    ) -> AppResult<Vec<Business>> {
        let businesses = sqlx::query_as::<_, Business>(&format!(
            r#"
            SELECT {BUSINESS_COLUMNS}
            FROM business
            WHERE state = 'ACT'
              AND ar_reminder_flag = TRUE
              AND to_char(founding_date AT TIME ZONE 'UTC', 'MM-DD') = ANY($1)
              AND (last_ar_reminder_year IS NULL OR last_ar_reminder_year < $2)
            ORDER BY founding_date
            LIMIT $3
            "#
        ))
        .bind(window.month_days())
        .bind(current_year)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        info!("🔍 {} businesses in reminder window", businesses.len());
        Ok(businesses)
    }

    #[instrument(skip(self))]
    pub async fn update_last_ar_reminder_year(&self, id: BusinessId, year: i32) -> AppResult<()> {
        sqlx::query("UPDATE business SET last_ar_reminder_year = $2 WHERE id = $1")
            .bind(id)
            .bind(year)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Inserts or refreshes a business from the registry warehouse.
    ///
    /// Legal type and founding date are only written on insert.
    #[instrument(skip(self, upsert), fields(identifier = %upsert.identifier))]
    pub async fn upsert(&self, upsert: &BusinessUpsert) -> AppResult<Business> {
        sqlx::query_as::<_, Business>(&format!(
            r#"
            INSERT INTO business
                (identifier, legal_name, legal_type, email, founding_date,
                 ar_reminder_flag, state, tax_id, corp_class)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (identifier) DO UPDATE SET
                legal_name = EXCLUDED.legal_name,
                email = EXCLUDED.email,
                ar_reminder_flag = EXCLUDED.ar_reminder_flag,
                state = EXCLUDED.state,
                tax_id = EXCLUDED.tax_id,
                corp_class = EXCLUDED.corp_class
            RETURNING {BUSINESS_COLUMNS}
            "#
        ))
        .bind(&upsert.identifier)
        .bind(&upsert.legal_name)
        .bind(&upsert.legal_type)
        .bind(&upsert.email)
        .bind(upsert.founding_date)
        .bind(upsert.ar_reminder_flag)
        .bind(&upsert.state)
        .bind(&upsert.tax_id)
        .bind(&upsert.corp_class)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }
}
