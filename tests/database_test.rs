//! Repository tests against a live PostgreSQL.
//!
//! Uses `TEST_DATABASE_URL` (or `DATABASE_URL`) and skips when no server answers.

use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde_json::json;

use business_ar_api::business::domain::reminder::select_due;
use business_ar_api::business::domain::{BusinessUpsert, FilingStatus, NewFiling, NewReminder, NewUser, ReminderWindow};
use business_ar_api::{Config, Database};

async fn database() -> Option<Database> {
    let _ = dotenv::dotenv();
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;

    let mut config = Config::default();
    config.database_url = url;
    config.database.acquire_timeout_seconds = 3;

    match Database::new(&config).await {
        Ok(database) => {
            database.migrate().await.ok()?;
            Some(database)
        }
        Err(e) => {
            eprintln!("skipping database test: {}", e);
            None
        }
    }
}

fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default() % 10_000_000)
}

fn upsert(identifier: &str, founding: NaiveDate) -> BusinessUpsert {
    BusinessUpsert {
        identifier: identifier.to_string(),
        legal_name: "Test Holdings Ltd.".to_string(),
        legal_type: "BC".to_string(),
        email: "test@email.com".to_string(),
        founding_date: Utc.from_utc_datetime(&founding.and_hms_opt(8, 0, 0).unwrap()),
        ar_reminder_flag: true,
        state: Some("ACT".to_string()),
        tax_id: None,
        corp_class: Some("BC".to_string()),
    }
}

#[tokio::test]
async fn test_upsert_keeps_legal_type_and_founding_date() {
    let Some(database) = database().await else { return };
    let identifier = unique("BC");

    let first = database
        .businesses
        .upsert(&upsert(&identifier, NaiveDate::from_ymd_opt(2001, 5, 10).unwrap()))
        .await
        .unwrap();

    let mut changed = upsert(&identifier, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
    changed.legal_name = "Renamed Holdings Ltd.".to_string();
    changed.legal_type = "ULC".to_string();
    let second = database.businesses.upsert(&changed).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.legal_name, "Renamed Holdings Ltd.");
    assert_eq!(second.legal_type, "BC");
    assert_eq!(second.founding_date, first.founding_date);
}

#[tokio::test]
async fn test_recorded_reminder_removes_business_from_window() {
    let Some(database) = database().await else { return };
    let today = Utc::now().date_naive();
    let identifier = unique("BC");
    let business = database.businesses.upsert(&upsert(&identifier, today)).await.unwrap();
    let year = today.year();

    let window = ReminderWindow::starting(today);
    let due = database.businesses.find_due_for_reminder(&window, year, 10_000).await.unwrap();
    assert!(due.iter().any(|b| b.id == business.id));

    let token = unique("tok");
    let reminder = database
        .reminders
        .record_sent(&NewReminder {
            business_id: business.id,
            recipient: "test@email.com".to_string(),
            message: "<p>reminder</p>".to_string(),
            token: token.clone(),
            fiscal_year: year,
            sent_date: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(reminder.fiscal_year, year);

    let found = database.reminders.find_by_token(&token).await.unwrap().unwrap();
    assert_eq!(found.business_id, business.id);

    let due = database.businesses.find_due_for_reminder(&window, year, 10_000).await.unwrap();
    assert!(!due.iter().any(|b| b.id == business.id));
}

async fn delete_businesses(database: &Database, prefix: &str) {
    sqlx::query("DELETE FROM business WHERE identifier LIKE $1")
        .bind(format!("{}%", prefix))
        .execute(database.pool())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_due_set_is_capped_ordered_and_filtered() {
    let Some(database) = database().await else { return };
    const PREFIX: &str = "RWDUE";
    delete_businesses(&database, PREFIX).await;

    let today = Utc::now().date_naive();
    // an anniversary that exists in every year
    let mut anniversary = today + Duration::days(2);
    if anniversary.month() == 2 && anniversary.day() == 29 {
        anniversary = anniversary + Duration::days(1);
    }
    let in_window = |year: i32| anniversary.with_year(year).unwrap();

    for i in 0..30 {
        database
            .businesses
            .upsert(&upsert(&format!("{}{:02}", PREFIX, i), in_window(1900 + i)))
            .await
            .unwrap();
    }

    let mut outside = today + Duration::days(60);
    if outside.month() == 2 && outside.day() == 29 {
        outside = outside + Duration::days(1);
    }
    let outside_id = format!("{}OUT", PREFIX);
    database
        .businesses
        .upsert(&upsert(&outside_id, outside.with_year(1880).unwrap()))
        .await
        .unwrap();

    let opted_out_id = format!("{}OPT", PREFIX);
    let mut opted_out = upsert(&opted_out_id, in_window(1881));
    opted_out.ar_reminder_flag = false;
    database.businesses.upsert(&opted_out).await.unwrap();

    let window = ReminderWindow::starting(today);
    let due = database
        .businesses
        .find_due_for_reminder(&window, today.year(), 25)
        .await
        .unwrap();

    let identifiers: Vec<&str> = due.iter().map(|b| b.identifier.as_str()).collect();
    let expected: Vec<String> = (0..25).map(|i| format!("{}{:02}", PREFIX, i)).collect();
    assert_eq!(identifiers, expected.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(!identifiers.contains(&outside_id.as_str()));
    assert!(!identifiers.contains(&opted_out_id.as_str()));
    assert!(due.windows(2).all(|w| w[0].founding_date <= w[1].founding_date));

    let filtered = select_due(due.clone(), today);
    assert_eq!(filtered.iter().map(|b| b.id).collect::<Vec<_>>(), due.iter().map(|b| b.id).collect::<Vec<_>>());

    delete_businesses(&database, PREFIX).await;
}

#[tokio::test]
async fn test_filing_lifecycle() {
    let Some(database) = database().await else { return };
    let business = database
        .businesses
        .upsert(&upsert(&unique("BC"), NaiveDate::from_ymd_opt(2010, 3, 5).unwrap()))
        .await
        .unwrap();
    let sub = unique("sub-");
    let user = database
        .users
        .get_or_create(&NewUser {
            username: Some("tester".to_string()),
            firstname: Some("Test".to_string()),
            lastname: Some("User".to_string()),
            email: None,
            sub: sub.clone(),
            iss: "test".to_string(),
            idp_userid: sub.clone(),
            login_source: Some("BCSC".to_string()),
        })
        .await
        .unwrap();
    let again = database
        .users
        .get_or_create(&NewUser {
            username: Some("tester".to_string()),
            firstname: None,
            lastname: None,
            email: None,
            sub: sub.clone(),
            iss: "test".to_string(),
            idp_userid: sub,
            login_source: None,
        })
        .await
        .unwrap();
    assert_eq!(user.id, again.id);

    let mut filing = database
        .filings
        .create(&NewFiling {
            fiscal_year: 2024,
            filing_json: json!({"filing": {"header": {"name": "annualReport"}}}),
            business_id: business.id,
            submitter_id: Some(user.id),
        })
        .await
        .unwrap();
    assert_eq!(filing.status, FilingStatus::Draft);

    filing.invoice_id = Some(7_000_000 + i64::from(filing.id));
    filing.status = FilingStatus::Paid;
    let filing = database.filings.update(&filing).await.unwrap();

    let paid = database.filings.find_by_status(FilingStatus::Paid).await.unwrap();
    assert!(paid.iter().any(|f| f.id == filing.id));

    let mut filing = filing;
    filing.complete(Utc::now()).unwrap();
    let event_id = 900_000 + filing.id;
    let completed = database.filings.save_completion(&filing, &[event_id]).await.unwrap();
    assert_eq!(completed.status, FilingStatus::Completed);
    assert!(completed.completion_date.is_some());
    assert_eq!(database.filings.colin_event_ids(filing.id).await.unwrap(), vec![event_id]);

    let listed = database.filings.find_by_business(business.id).await.unwrap();
    assert_eq!(listed.len(), 1);
}
