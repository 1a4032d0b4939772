//! Outbound emails: filing completion and annual report reminders

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::filing_service::FilingService;
use super::report_service::{report_attachment_name, ReportService};
use super::template;
use crate::business::domain::{Business, Filing, FilingStatus, NewReminder};
use crate::infrastructure::config::Config;
use crate::infrastructure::{Database, ServiceClients};
use crate::shared::constants::notification::{PAID_TEMPLATE, REMINDER_SUBJECT, REMINDER_TEMPLATE, REQUEST_BY};
use crate::shared::types::FilingId;
use crate::shared::utils::generate_access_token;
use crate::shared::utils::time::format_email_datetime;
use crate::shared::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct NotificationService {
    database: Database,
    clients: ServiceClients,
    filings: FilingService,
    reports: ReportService,
    config: Arc<Config>,
}

pub type SharedNotificationService = Arc<NotificationService>;

impl NotificationService {
    pub fn new(
        database: Database,
        clients: ServiceClients,
        filings: FilingService,
        reports: ReportService,
        config: Arc<Config>,
    ) -> Self {
        Self { database, clients, filings, reports, config }
    }

    fn email_dir(&self) -> &Path {
        Path::new(&self.config.templates.email_template_path)
    }

    fn email_template(&self, name: &str) -> AppResult<String> {
        let dir = self.email_dir();
        let html = template::load(&dir.join(name))?;
        template::substitute_parts(&html, &self.parts_dir())
    }

    fn parts_dir(&self) -> PathBuf {
        self.email_dir().join("common")
    }

    /// Emails the filing confirmation; completed filings carry the receipt and the report
    #[instrument(skip(self))]
    pub async fn send_filing_complete_email(&self, filing_id: FilingId) -> AppResult<()> {
        let filing = self.filings.find_by_id(filing_id).await?;
        let business = self.filings.business_of(&filing).await?;
        let token = self
            .clients
            .tokens
            .service_token(&self.config.credentials.auth_svc)
            .await?;

        let Some(recipients) = self.filing_recipients(&filing, &business, &token).await? else {
            warn!("no recipients for filing {}, email skipped", filing.id);
            return Ok(());
        };

        let tz = self
            .config
            .environment
            .legislation_tz()
            .map_err(|e| AppError::Configuration(e.to_string()))?;
        let view = self.filings.serialize(&filing, &business.identifier).await?;
        let context = filing_email_context(&business, &view, format_email_datetime(filing.filing_date, tz));
        let body = template::render(&self.email_template(PAID_TEMPLATE)?, &context);

        let attachments = if filing.status == FilingStatus::Completed {
            self.filing_attachments(&filing, &business, &token).await?
        } else {
            Vec::new()
        };

        let email = filing_email(&recipients, &business.legal_name, body, attachments);
        ensure_sendable(&email)?;
        self.clients.notify.send(&token, &email).await?;
        info!("📧 completion email for filing {} sent to {}", filing.id, recipients);
        Ok(())
    }

    /// Account contacts first, then the active invitation
    async fn filing_recipients(&self, filing: &Filing, business: &Business, token: &str) -> AppResult<Option<String>> {
        if let Some(account_id) = filing.payment_account.as_deref() {
            let contacts = self.clients.auth.account_contacts(token, account_id).await?;
            let emails = contact_emails(&contacts);
            if !emails.is_empty() {
                return Ok(Some(emails));
            }
        }

        let invitation = self.database.invitations.find_active_by_business(business.id).await?;
        Ok(invitation
            .map(|i| i.recipients)
            .filter(|recipients| !recipients.trim().is_empty()))
    }

    async fn filing_attachments(&self, filing: &Filing, business: &Business, token: &str) -> AppResult<Vec<Value>> {
        let receipt = self.filings.receipt(filing, business).await?;
        let report = self.reports.annual_report(filing, business, token).await?;

        let report_date = filing
            .annual_report()
            .get("annualReportDate")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(vec![
            attachment("Receipt.pdf", &receipt, 1),
            attachment(&report_attachment_name(report_date.as_deref()), &report.content, 2),
        ])
    }

    /// Sends the reminder email for a fiscal year and returns the row to record
    #[instrument(skip(self, notify_token, business), fields(identifier = %business.identifier))]
    pub async fn send_reminder(&self, notify_token: &str, business: &Business, fiscal_year: i32) -> AppResult<NewReminder> {
        let recipient = business.email.clone().unwrap_or_default();
        let access_token = generate_access_token();
        let context = reminder_context(&business.legal_name, fiscal_year, &access_token, &self.config.services.bar_app_url);
        let body = template::render(&self.email_template(REMINDER_TEMPLATE)?, &context);

        let email = json!({
            "recipients": recipient,
            "requestBy": REQUEST_BY,
            "content": {
                "subject": REMINDER_SUBJECT,
                "body": body,
                "attachments": [],
            },
        });
        ensure_sendable(&email)?;
        self.clients.notify.send(notify_token, &email).await?;
        info!("⏰ reminder for {} sent to {}", fiscal_year, recipient);

        Ok(NewReminder {
            business_id: business.id,
            recipient,
            message: body,
            token: access_token,
            fiscal_year,
            sent_date: Utc::now(),
        })
    }
}

/// Comma separated contact emails of an account
pub fn contact_emails(contacts: &Value) -> String {
    contacts
        .get("contacts")
        .and_then(Value::as_array)
        .map(|contacts| {
            contacts
                .iter()
                .filter_map(|c| c.get("email").and_then(Value::as_str))
                .filter(|email| !email.trim().is_empty())
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default()
}

/// Rendering context of the completion email
pub fn filing_email_context(business: &Business, view: &Value, filing_date_time: String) -> Value {
    let filing = &view["filing"];
    json!({
        "business": business.json(),
        "filing": filing.get("annualReport").cloned().unwrap_or_else(|| json!({})),
        "header": filing.get("header").cloned().unwrap_or_else(|| json!({})),
        "filing_date_time": filing_date_time,
    })
}

pub fn reminder_context(legal_name: &str, year: i32, token: &str, bar_app_url: &str) -> Value {
    json!({
        "year": year,
        "business_legal_name": legal_name,
        "token": token,
        "access_url": format!("{}/en-CA?nanoid={}", bar_app_url.trim_end_matches('/'), token),
    })
}

pub fn attachment(file_name: &str, content: &[u8], order: u32) -> Value {
    json!({
        "fileName": file_name,
        "fileBytes": STANDARD.encode(content),
        "fileUrl": "",
        "attachOrder": order.to_string(),
    })
}

pub fn filing_email(recipients: &str, legal_name: &str, body: String, attachments: Vec<Value>) -> Value {
    json!({
        "recipients": recipients,
        "requestBy": REQUEST_BY,
        "content": {
            "subject": format!("{} - Confirmation of Annual Report", legal_name),
            "body": body,
            "attachments": attachments,
        },
    })
}

/// Rejects an email without recipients, subject or body
pub fn ensure_sendable(email: &Value) -> AppResult<()> {
    let present = |value: Option<&Value>| value.and_then(Value::as_str).map_or(false, |s| !s.trim().is_empty());
    let content = email.get("content");

    if present(email.get("recipients"))
        && present(content.and_then(|c| c.get("subject")))
        && present(content.and_then(|c| c.get("body")))
    {
        Ok(())
    } else {
        Err(AppError::Business(
            "Unsuccessful sending email - required email object(s) is empty/missing.".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn business() -> Business {
        Business {
            id: 1,
            legal_name: "Acme Ltd.".into(),
            legal_type: "BC".into(),
            identifier: "BC0000001".into(),
            tax_id: None,
            email: Some("owner@example.com".into()),
            founding_date: Utc.with_ymd_and_hms(2010, 3, 5, 0, 0, 0).unwrap(),
            last_ar_reminder_year: None,
            ar_reminder_flag: true,
            state: Some("ACT".into()),
            op_state: None,
            corp_class: None,
        }
    }

    #[test]
    fn test_contact_emails() {
        let contacts = json!({"contacts": [{"email": "a@x.com"}, {"phone": "1"}, {"email": "b@x.com"}]});
        assert_eq!(contact_emails(&contacts), "a@x.com,b@x.com");
        assert_eq!(contact_emails(&json!({})), "");
    }

    #[test]
    fn test_filing_email_shape() {
        let view = json!({"filing": {
            "header": {"filingYear": 2024, "certifiedByDisplayName": "Jane Doe"},
            "annualReport": {"annualReportDate": "2024-03-05"}
        }});
        let context = filing_email_context(&business(), &view, "March 05, 2024 at 9:00 am Pacific time".into());
        assert_eq!(context["business"]["legalName"], "Acme Ltd.");
        assert_eq!(context["filing"]["annualReportDate"], "2024-03-05");
        assert_eq!(context["header"]["certifiedByDisplayName"], "Jane Doe");

        let email = filing_email("a@x.com", "Acme Ltd.", "<p>hi</p>".into(), vec![attachment("Receipt.pdf", b"pdf", 1)]);
        assert_eq!(email["content"]["subject"], "Acme Ltd. - Confirmation of Annual Report");
        assert_eq!(email["requestBy"], REQUEST_BY);
        assert_eq!(email["content"]["attachments"][0]["fileBytes"], "cGRm");
        assert_eq!(email["content"]["attachments"][0]["attachOrder"], "1");
        assert!(ensure_sendable(&email).is_ok());
    }

    #[test]
    fn test_ensure_sendable_rejects_missing_parts() {
        assert!(ensure_sendable(&filing_email("", "Acme", "<p/>".into(), vec![])).is_err());
        assert!(ensure_sendable(&filing_email("a@x.com", "Acme", String::new(), vec![])).is_err());
        assert!(ensure_sendable(&json!({"recipients": "a@x.com"})).is_err());
    }

    #[test]
    fn test_reminder_context() {
        let context = reminder_context("Acme Ltd.", 2024, "abc123", "https://bar.example.com/");
        assert_eq!(context["access_url"], "https://bar.example.com/en-CA?nanoid=abc123");
        assert_eq!(context["year"], 2024);

        let html = template::render("{{ year }} {{ business_legal_name }} {{ access_url }}", &context);
        assert_eq!(html, "2024 Acme Ltd. https://bar.example.com/en-CA?nanoid=abc123");
    }
}
