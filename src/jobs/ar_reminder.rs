//! Annual report reminder job
//!
//! Picks the businesses whose founding anniversary is coming up, works out the
//! year they owe, and emails a reminder with a one-time access link. Each
//! business is handled on its own; a failure is logged and the run moves on.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::business::domain::reminder::{decide, next_reminder_year, select_due, ReminderDecision, ReminderWindow};
use crate::business::domain::{Business, NewReminder};
use crate::business::services::{BusinessService, NotificationService};
use crate::infrastructure::Database;
use crate::shared::constants::jobs::REMINDER_BATCH_SIZE;
use crate::shared::{AppError, AppResult};

/// The steps of a reminder run that touch the outside world
#[async_trait]
pub trait ReminderBackend: Send + Sync {
    async fn due_businesses(&self, today: NaiveDate) -> AppResult<Vec<Business>>;

    /// `nextARYear` according to the registry
    async fn registry_next_ar_year(&self, business: &Business) -> AppResult<i32>;

    async fn defer(&self, business: &Business, year: i32) -> AppResult<()>;

    async fn send(&self, business: &Business, fiscal_year: i32) -> AppResult<NewReminder>;

    /// Stores the reminder and the bookkeeping year together
    async fn record(&self, reminder: &NewReminder) -> AppResult<()>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReminderRunSummary {
    pub sent: usize,
    pub deferred: usize,
    pub failed: usize,
}

/// One pass over the due businesses
#[instrument(skip(backend))]
pub async fn run<B: ReminderBackend + ?Sized>(backend: &B, today: NaiveDate) -> AppResult<ReminderRunSummary> {
    let businesses = backend.due_businesses(today).await?;
    info!("⏰ {} businesses due for a reminder", businesses.len());

    let mut summary = ReminderRunSummary::default();
    for business in &businesses {
        match remind(backend, business, today.year()).await {
            Ok(ReminderDecision::Send { .. }) => summary.sent += 1,
            Ok(ReminderDecision::Defer { .. }) => summary.deferred += 1,
            Err(e) => {
                summary.failed += 1;
                error!("❌ reminder for {} failed: {}", business.identifier, e);
            }
        }
    }

    info!(
        "✅ reminder run done: {} sent, {} deferred, {} failed",
        summary.sent, summary.deferred, summary.failed
    );
    Ok(summary)
}

async fn remind<B: ReminderBackend + ?Sized>(backend: &B, business: &Business, current_year: i32) -> AppResult<ReminderDecision> {
    let next_ar_year = match next_reminder_year(business.last_ar_reminder_year) {
        Some(year) => year,
        None => backend.registry_next_ar_year(business).await?,
    };
    info!("{}: last reminder {:?}, next AR year {}", business.identifier, business.last_ar_reminder_year, next_ar_year);

    let decision = decide(next_ar_year, current_year);
    match decision {
        ReminderDecision::Defer { bookkeeping_year } => backend.defer(business, bookkeeping_year).await?,
        ReminderDecision::Send { fiscal_year } => {
            let reminder = backend.send(business, fiscal_year).await?;
            backend.record(&reminder).await?;
        }
    }
    Ok(decision)
}

/// Database, registry and notify-api backed reminders
pub struct LiveReminders {
    database: Database,
    businesses: BusinessService,
    notifications: NotificationService,
    notify_token: String,
}

impl LiveReminders {
    pub fn new(database: Database, businesses: BusinessService, notifications: NotificationService, notify_token: String) -> Self {
        Self { database, businesses, notifications, notify_token }
    }
}

#[async_trait]
impl ReminderBackend for LiveReminders {
    async fn due_businesses(&self, today: NaiveDate) -> AppResult<Vec<Business>> {
        let candidates = self
            .database
            .businesses
            .find_due_for_reminder(&ReminderWindow::starting(today), today.year(), REMINDER_BATCH_SIZE)
            .await?;
        let due = select_due(candidates, today);
        debug!("{} businesses due for a reminder", due.len());
        Ok(due)
    }

    async fn registry_next_ar_year(&self, business: &Business) -> AppResult<i32> {
        let registry = self.businesses.registry_business(business).await?;
        registry
            .get("nextARYear")
            .and_then(Value::as_i64)
            .and_then(|year| i32::try_from(year).ok())
            .ok_or_else(|| AppError::Internal(format!("no nextARYear for {}", business.identifier)))
    }

    async fn defer(&self, business: &Business, year: i32) -> AppResult<()> {
        self.database.businesses.update_last_ar_reminder_year(business.id, year).await
    }

    async fn send(&self, business: &Business, fiscal_year: i32) -> AppResult<NewReminder> {
        self.notifications
            .send_reminder(&self.notify_token, business, fiscal_year)
            .await
    }

    async fn record(&self, reminder: &NewReminder) -> AppResult<()> {
        self.database.reminders.record_sent(reminder).await.map(|_| ())
    }
}

/// Today in UTC, as the reminder window sees it
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        businesses: Vec<Business>,
        failing_identifier: Option<String>,
        registry_year: i32,
        deferred: Mutex<Vec<(i32, i32)>>,
        recorded: Mutex<Vec<NewReminder>>,
    }

    #[async_trait]
    impl ReminderBackend for FakeBackend {
        async fn due_businesses(&self, _today: NaiveDate) -> AppResult<Vec<Business>> {
            Ok(self.businesses.clone())
        }

        async fn registry_next_ar_year(&self, _business: &Business) -> AppResult<i32> {
            Ok(self.registry_year)
        }

        async fn defer(&self, business: &Business, year: i32) -> AppResult<()> {
            self.deferred.lock().unwrap().push((business.id, year));
            Ok(())
        }

        async fn send(&self, business: &Business, fiscal_year: i32) -> AppResult<NewReminder> {
            if self.failing_identifier.as_deref() == Some(business.identifier.as_str()) {
                return Err(AppError::external(axum::http::StatusCode::BAD_GATEWAY, "notify down"));
            }
            Ok(NewReminder {
                business_id: business.id,
                recipient: business.email.clone().unwrap_or_default(),
                message: "<p/>".into(),
                token: "abc".into(),
                fiscal_year,
                sent_date: Utc::now(),
            })
        }

        async fn record(&self, reminder: &NewReminder) -> AppResult<()> {
            self.recorded.lock().unwrap().push(reminder.clone());
            Ok(())
        }
    }

    fn business(id: i32, last_ar_reminder_year: Option<i32>) -> Business {
        Business {
            id,
            legal_name: format!("Company {id}"),
            legal_type: "BC".into(),
            identifier: format!("BC{id:07}"),
            tax_id: None,
            email: Some(format!("c{id}@example.com")),
            founding_date: Utc.with_ymd_and_hms(2015, 5, 12, 0, 0, 0).unwrap(),
            last_ar_reminder_year,
            ar_reminder_flag: true,
            state: Some("ACT".into()),
            op_state: None,
            corp_class: Some("BC".into()),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    #[tokio::test]
    async fn test_run_continues_past_failing_business() {
        let backend = FakeBackend {
            businesses: vec![business(1, Some(2022)), business(2, Some(2022)), business(3, Some(2022))],
            failing_identifier: Some("BC0000002".into()),
            ..Default::default()
        };

        let summary = run(&backend, today()).await.unwrap();
        assert_eq!(summary, ReminderRunSummary { sent: 2, deferred: 0, failed: 1 });

        let recorded = backend.recorded.lock().unwrap();
        assert_eq!(recorded.iter().map(|r| r.business_id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(recorded.iter().all(|r| r.fiscal_year == 2023));
    }

    #[tokio::test]
    async fn test_future_year_is_deferred_without_sending() {
        let backend = FakeBackend {
            businesses: vec![business(1, None)],
            registry_year: 2025,
            ..Default::default()
        };

        let summary = run(&backend, today()).await.unwrap();
        assert_eq!(summary.deferred, 1);
        assert_eq!(*backend.deferred.lock().unwrap(), vec![(1, 2024)]);
        assert!(backend.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registry_year_used_when_never_reminded() {
        let backend = FakeBackend {
            businesses: vec![business(4, None)],
            registry_year: 2024,
            ..Default::default()
        };

        run(&backend, today()).await.unwrap();
        assert_eq!(backend.recorded.lock().unwrap()[0].fiscal_year, 2024);
    }
}
