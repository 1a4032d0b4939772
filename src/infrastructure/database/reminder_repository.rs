//! Annual report reminder persistence

use sqlx::PgPool;
use tracing::{info, instrument};

use super::db_error;
use crate::business::domain::{AnnualReportReminder, NewReminder, ReminderStatus};
use crate::shared::AppResult;

const REMINDER_COLUMNS: &str = "id, recipient, message, sent_date, status, fiscal_year, token, business_id";

#[derive(Debug, Clone)]
pub struct ReminderRepository {
    pool: PgPool,
}

impl ReminderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, token))]
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<AnnualReportReminder>> {
        sqlx::query_as::<_, AnnualReportReminder>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM ar_reminders WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    /// Records a sent reminder and advances the business bookkeeping year together
    #[instrument(skip(self, reminder), fields(business_id = reminder.business_id))]
    pub async fn record_sent(&self, reminder: &NewReminder) -> AppResult<AnnualReportReminder> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let saved = sqlx::query_as::<_, AnnualReportReminder>(&format!(
            r#"
            INSERT INTO ar_reminders (recipient, message, sent_date, status, fiscal_year, token, business_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REMINDER_COLUMNS}
            "#
        ))
        .bind(&reminder.recipient)
        .bind(&reminder.message)
        .bind(reminder.sent_date)
        .bind(ReminderStatus::Sent.as_str())
        .bind(reminder.fiscal_year)
        .bind(&reminder.token)
        .bind(reminder.business_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query("UPDATE business SET last_ar_reminder_year = $2 WHERE id = $1")
            .bind(reminder.business_id)
            .bind(reminder.fiscal_year)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        info!("📬 reminder {} recorded for fiscal year {}", saved.id, saved.fiscal_year);
        Ok(saved)
    }
}
