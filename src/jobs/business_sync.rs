//! Registry warehouse sync
//!
//! Copies corporations with an upcoming anniversary from the COLIN warehouse
//! into the local `business` table so the reminder job can find them.

use std::time::Duration;

use chrono::{NaiveDateTime, TimeZone, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info, instrument};

use crate::business::domain::reminder::ReminderWindow;
use crate::business::domain::BusinessUpsert;
use crate::infrastructure::config::Config;
use crate::infrastructure::Database;
use crate::shared::constants::jobs::{NON_PROD_EMAIL, SYNC_BATCH_SIZE};
use crate::shared::{AppError, AppResult};

/// One corporation as the warehouse describes it
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct WarehouseCorporation {
    pub corp_num: String,
    pub corp_typ_cd: String,
    pub recognition_dts: NaiveDateTime,
    pub admin_email: Option<String>,
    pub send_ar_ind: Option<String>,
    pub bn_15: Option<String>,
    pub corp_state: Option<String>,
    pub corp_name: String,
    pub corp_class: Option<String>,
}

const CORPORATIONS_IN_WINDOW: &str = r#"
    SELECT c.corp_num, c.corp_typ_cd, c.recognition_dts, c.admin_email, c.send_ar_ind, c.bn_15,
           s.state_typ_cd AS corp_state,
           cn.corp_nme AS corp_name,
           ct.corp_class AS corp_class
    FROM colin.corporation c
    JOIN colin.corp_state s ON s.corp_num = c.corp_num AND s.end_event_id IS NULL
    JOIN colin.corp_name cn ON cn.corp_num = c.corp_num AND cn.end_event_id IS NULL
    JOIN colin.corp_type ct ON ct.corp_typ_cd = c.corp_typ_cd
    WHERE ct.corp_class IN ('BC', 'XPRO')
      AND c.admin_email IS NOT NULL
      AND c.recognition_dts IS NOT NULL
      AND c.corp_typ_cd IN ('BC', 'C', 'ULC', 'CC', 'CCC')
      AND to_char(c.recognition_dts, 'MM-DD') = ANY($1)
    ORDER BY c.recognition_dts
    LIMIT $2
"#;

/// Opens the read-only warehouse pool
pub async fn connect_warehouse(config: &Config) -> AppResult<PgPool> {
    let url = config
        .warehouse
        .url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::Configuration("WAREHOUSE_URL is not set".to_string()))?;

    PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
        .connect(url)
        .await
        .map_err(|e| {
            error!("❌ warehouse connection failed: {}", e);
            AppError::Database(e)
        })
}

/// Local identifier: BC companies carry the `BC` prefix
pub fn business_identifier(corp_num: &str, corp_type: &str) -> String {
    if corp_type == "BC" && !corp_num.starts_with("BC") {
        format!("BC{}", corp_num)
    } else {
        corp_num.to_string()
    }
}

/// Maps a warehouse row to the local business record
pub fn to_upsert(row: &WarehouseCorporation, is_production: bool) -> BusinessUpsert {
    let email = if is_production {
        row.admin_email.clone().unwrap_or_default()
    } else {
        NON_PROD_EMAIL.to_string()
    };

    BusinessUpsert {
        identifier: business_identifier(&row.corp_num, &row.corp_typ_cd),
        legal_name: row.corp_name.clone(),
        legal_type: row.corp_typ_cd.clone(),
        email,
        founding_date: Utc.from_utc_datetime(&row.recognition_dts),
        ar_reminder_flag: row.send_ar_ind.as_deref() != Some("N"),
        state: row.corp_state.clone(),
        tax_id: row.bn_15.clone(),
        corp_class: row.corp_class.clone(),
    }
}

/// Syncs one batch; returns how many businesses were written
#[instrument(skip(warehouse, database, config))]
pub async fn run(warehouse: &PgPool, database: &Database, config: &Config) -> AppResult<usize> {
    let window = ReminderWindow::starting(Utc::now().date_naive());
    let rows = sqlx::query_as::<_, WarehouseCorporation>(CORPORATIONS_IN_WINDOW)
        .bind(window.month_days())
        .bind(SYNC_BATCH_SIZE)
        .fetch_all(warehouse)
        .await
        .map_err(AppError::Database)?;
    info!("🔄 {} businesses to update", rows.len());

    let is_production = config.environment.is_production();
    let mut synced = 0;
    for row in &rows {
        match database.businesses.upsert(&to_upsert(row, is_production)).await {
            Ok(business) => {
                synced += 1;
                info!("✅ synced {}", business.identifier);
            }
            Err(e) => error!("❌ sync of {} failed: {}", row.corp_num, e),
        }
    }
    Ok(synced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row() -> WarehouseCorporation {
        WarehouseCorporation {
            corp_num: "0871234".into(),
            corp_typ_cd: "BC".into(),
            recognition_dts: NaiveDate::from_ymd_opt(2012, 5, 14).unwrap().and_hms_opt(9, 0, 0).unwrap(),
            admin_email: Some("admin@acme.ca".into()),
            send_ar_ind: Some("Y".into()),
            bn_15: Some("123456789BC0001".into()),
            corp_state: Some("ACT".into()),
            corp_name: "ACME LTD.".into(),
            corp_class: Some("BC".into()),
        }
    }

    #[test]
    fn test_business_identifier() {
        assert_eq!(business_identifier("0871234", "BC"), "BC0871234");
        assert_eq!(business_identifier("BC0871234", "BC"), "BC0871234");
        assert_eq!(business_identifier("C0871234", "C"), "C0871234");
    }

    #[test]
    fn test_upsert_in_production_keeps_admin_email() {
        let upsert = to_upsert(&row(), true);
        assert_eq!(upsert.identifier, "BC0871234");
        assert_eq!(upsert.email, "admin@acme.ca");
        assert!(upsert.ar_reminder_flag);
        assert_eq!(upsert.tax_id.as_deref(), Some("123456789BC0001"));
        assert_eq!(upsert.founding_date, Utc.with_ymd_and_hms(2012, 5, 14, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_upsert_outside_production_masks_email() {
        let mut corp = row();
        corp.send_ar_ind = Some("N".into());
        let upsert = to_upsert(&corp, false);
        assert_eq!(upsert.email, NON_PROD_EMAIL);
        assert!(!upsert.ar_reminder_flag);

        corp.send_ar_ind = None;
        assert!(to_upsert(&corp, false).ar_reminder_flag);
    }
}
