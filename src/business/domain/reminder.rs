//! Annual report reminder domain model
//!
//! Reminders go to businesses whose founding-date anniversary falls inside a
//! rolling window starting today. The window is expressed as the list of
//! calendar days (`MM-DD`) it covers, so the same rule drives the SQL filter
//! and the in-memory check, including the wrap from December into January.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::business::domain::filing::UnknownStatus;
use crate::business::domain::Business;
use crate::shared::constants::jobs::{REMINDER_BATCH_SIZE, REMINDER_WINDOW_DAYS};
use crate::shared::types::BusinessId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReminderStatus {
    Draft,
    Sent,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Draft => "DRAFT",
            ReminderStatus::Sent => "SENT",
        }
    }
}

impl TryFrom<String> for ReminderStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_uppercase().as_str() {
            "DRAFT" => Ok(ReminderStatus::Draft),
            "SENT" => Ok(ReminderStatus::Sent),
            _ => Err(UnknownStatus(value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct AnnualReportReminder {
    pub id: i32,
    pub recipient: String,
    pub message: Option<String>,
    pub sent_date: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: ReminderStatus,
    pub fiscal_year: i32,
    pub token: Option<String>,
    pub business_id: BusinessId,
}

/// A reminder that was just sent and must be recorded
#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub business_id: BusinessId,
    pub recipient: String,
    pub message: String,
    pub token: String,
    pub fiscal_year: i32,
    pub sent_date: DateTime<Utc>,
}

/// Anniversary window `[start, start + days]`, inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    start: NaiveDate,
    days: i64,
}

impl ReminderWindow {
    pub fn starting(today: NaiveDate) -> Self {
        Self {
            start: today,
            days: REMINDER_WINDOW_DAYS,
        }
    }

    /// Calendar days covered, formatted `MM-DD`.
    ///
    /// Feb 29 anniversaries are celebrated on Feb 28 in common years.
    pub fn month_days(&self) -> Vec<String> {
        let mut days = Vec::with_capacity(self.days as usize + 2);
        for offset in 0..=self.days {
            let date = self.start + Duration::days(offset);
            days.push(date.format("%m-%d").to_string());
            if date.month() == 2 && date.day() == 28 && !is_leap_year(date.year()) {
                days.push("02-29".to_string());
            }
        }
        days
    }

    pub fn contains(&self, founding_date: NaiveDate) -> bool {
        let key = founding_date.format("%m-%d").to_string();
        self.month_days().contains(&key)
    }
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Whether a business should get a reminder today
pub fn is_due(business: &Business, today: NaiveDate) -> bool {
    business.is_active()
        && business.ar_reminder_flag
        && ReminderWindow::starting(today).contains(business.founding_date.date_naive())
        && business
            .last_ar_reminder_year
            .map_or(true, |year| year < today.year())
}

/// Filters candidates down to the due set, oldest founding date first, capped per run
pub fn select_due(mut candidates: Vec<Business>, today: NaiveDate) -> Vec<Business> {
    candidates.retain(|b| is_due(b, today));
    candidates.sort_by_key(|b| b.founding_date);
    candidates.truncate(REMINDER_BATCH_SIZE as usize);
    candidates
}

/// What the reminder job does with one business
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderDecision {
    /// Email the reminder for this fiscal year
    Send { fiscal_year: i32 },
    /// Nothing owed yet; record the current year so the business is not picked again
    Defer { bookkeeping_year: i32 },
}

/// Year to remind for when the local bookkeeping already knows it
pub fn next_reminder_year(last_ar_reminder_year: Option<i32>) -> Option<i32> {
    last_ar_reminder_year.map(|year| year + 1)
}

pub fn decide(next_ar_year: i32, current_year: i32) -> ReminderDecision {
    if next_ar_year > current_year {
        ReminderDecision::Defer { bookkeeping_year: current_year }
    } else {
        ReminderDecision::Send { fiscal_year: next_ar_year }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn business(id: i32, founding: NaiveDate) -> Business {
        Business {
            id,
            legal_name: format!("Company {id}"),
            legal_type: "BC".into(),
            identifier: format!("BC{id:07}"),
            tax_id: None,
            email: Some(format!("c{id}@example.com")),
            founding_date: Utc.from_utc_datetime(&founding.and_hms_opt(8, 0, 0).unwrap()),
            last_ar_reminder_year: None,
            ar_reminder_flag: true,
            state: Some("ACT".into()),
            op_state: None,
            corp_class: Some("BC".into()),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_anniversary_five_days_ahead_is_due() {
        let today = date(2024, 5, 10);
        let founded = (today + Duration::days(5)).with_year(2012).unwrap();
        let mut b = business(1, founded);
        assert!(is_due(&b, today));

        b.last_ar_reminder_year = Some(2024);
        assert!(!is_due(&b, today));

        b.last_ar_reminder_year = Some(2023);
        assert!(is_due(&b, today));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let today = date(2024, 5, 10);
        let window = ReminderWindow::starting(today);
        assert!(window.contains(date(2001, 5, 10)));
        assert!(window.contains(date(2001, 5, 24)));
        assert!(!window.contains(date(2001, 5, 25)));
        assert!(!window.contains(date(2001, 5, 9)));
        assert_eq!(window.month_days().len(), 15);
    }

    #[test]
    fn test_window_wraps_year_end() {
        let window = ReminderWindow::starting(date(2023, 12, 25));
        assert!(window.contains(date(2010, 12, 31)));
        assert!(window.contains(date(2010, 1, 8)));
        assert!(!window.contains(date(2010, 1, 9)));
    }

    #[test]
    fn test_leap_day_anniversary_in_common_year() {
        let window = ReminderWindow::starting(date(2023, 2, 20));
        assert!(window.contains(date(2008, 2, 29)));
        let window = ReminderWindow::starting(date(2024, 3, 1));
        assert!(!window.contains(date(2008, 2, 29)));
    }

    #[test]
    fn test_inactive_or_opted_out_is_not_due() {
        let today = date(2024, 5, 10);
        let mut b = business(1, date(2010, 5, 12));
        b.state = Some("HIS".into());
        assert!(!is_due(&b, today));

        let mut b = business(2, date(2010, 5, 12));
        b.ar_reminder_flag = false;
        assert!(!is_due(&b, today));
    }

    #[test]
    fn test_select_due_caps_batch_and_filters_window() {
        let today = date(2024, 5, 10);
        let mut candidates: Vec<Business> = (0..40)
            .map(|i| business(i, date(1990 + (i % 30), 5, 12)))
            .collect();
        candidates.push(business(100, date(2000, 7, 1)));

        let due = select_due(candidates, today);
        assert_eq!(due.len(), 25);
        assert!(due.iter().all(|b| b.id != 100));
        assert!(due.windows(2).all(|w| w[0].founding_date <= w[1].founding_date));
    }

    #[test]
    fn test_decide() {
        assert_eq!(decide(2024, 2024), ReminderDecision::Send { fiscal_year: 2024 });
        assert_eq!(decide(2022, 2024), ReminderDecision::Send { fiscal_year: 2022 });
        assert_eq!(decide(2025, 2024), ReminderDecision::Defer { bookkeeping_year: 2024 });
        assert_eq!(next_reminder_year(Some(2023)), Some(2024));
        assert_eq!(next_reminder_year(None), None);
    }
}
