//! Filing domain model
//!
//! An annual report filing and the payment-driven state machine that moves it
//! from DRAFT through PENDING and PAID to COMPLETED.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use crate::business::domain::User;
use crate::shared::constants::{filing::ANNUAL_REPORT, reports};
use crate::shared::types::{BusinessId, FilingId, UserId};
use crate::shared::utils::time::parse_timestamp;
use crate::shared::{AppError, AppResult};

/// Filing status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilingStatus {
    Draft,
    Pending,
    Paid,
    Completed,
    Error,
}

impl FilingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilingStatus::Draft => "DRAFT",
            FilingStatus::Pending => "PENDING",
            FilingStatus::Paid => "PAID",
            FilingStatus::Completed => "COMPLETED",
            FilingStatus::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(FilingStatus::Draft),
            "PENDING" => Some(FilingStatus::Pending),
            "PAID" => Some(FilingStatus::Paid),
            "COMPLETED" => Some(FilingStatus::Completed),
            "ERROR" => Some(FilingStatus::Error),
            _ => None,
        }
    }

    /// Statuses that still show up as a to-do for the business
    pub fn pending_task_statuses() -> [FilingStatus; 3] {
        [FilingStatus::Draft, FilingStatus::Pending, FilingStatus::Paid]
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised status value read from storage
#[derive(Debug, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl TryFrom<String> for FilingStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, <Self as TryFrom<String>>::Error> {
        FilingStatus::parse(&value).ok_or(UnknownStatus(value))
    }
}

/// Filing record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Filing {
    pub id: FilingId,
    pub fiscal_year: i32,
    pub filing_json: Value,
    pub filing_date: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: FilingStatus,
    pub invoice_id: Option<i64>,
    pub payment_status_code: Option<String>,
    pub payment_completion_date: Option<DateTime<Utc>>,
    pub payment_account: Option<String>,
    pub business_id: BusinessId,
    pub submitter_id: Option<UserId>,
}

/// Invoice as returned by the payment service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetails {
    pub id: Option<i64>,
    pub payment_account: Option<PaymentAccount>,
    pub status_code: Option<String>,
    pub payment_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAccount {
    pub account_id: Option<Value>,
}

impl InvoiceDetails {
    fn account_id(&self) -> Option<String> {
        match self.payment_account.as_ref()?.account_id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Payment status codes reported by the payment service
pub mod payment_status {
    pub const COMPLETED: &str = "COMPLETED";
    pub const APPROVED: &str = "APPROVED";
}

impl Filing {
    /// PAID and COMPLETED filings can no longer be edited
    pub fn is_locked(&self) -> bool {
        matches!(self.status, FilingStatus::Paid | FilingStatus::Completed)
    }

    pub fn has_invoice(&self) -> bool {
        self.invoice_id.is_some()
    }

    /// Rejects edits to a locked filing
    pub fn ensure_editable(&self) -> AppResult<()> {
        if self.is_locked() {
            return Err(AppError::Business("Completed or paid filing cannot be modified.".into()));
        }
        Ok(())
    }

    /// Records a freshly created invoice and moves to PAID or PENDING.
    ///
    /// COMPLETED and APPROVED both mean the money is in; APPROVED is stored as COMPLETED.
    pub fn apply_invoice(&mut self, invoice: &InvoiceDetails, now: DateTime<Utc>) {
        if let Some(id) = invoice.id {
            self.invoice_id = Some(id);
        }
        if let Some(account) = invoice.account_id() {
            self.payment_account = Some(account);
        }

        match invoice.status_code.as_deref() {
            Some(payment_status::COMPLETED) | Some(payment_status::APPROVED) => {
                self.payment_status_code = Some(payment_status::COMPLETED.to_string());
                self.mark_paid(invoice.payment_date.as_deref(), now);
            }
            other => {
                self.payment_status_code = other.map(str::to_string);
                self.status = FilingStatus::Pending;
            }
        }
    }

    /// Applies a refreshed payment status; only COMPLETED changes the filing status
    pub fn apply_payment_status(&mut self, invoice: &InvoiceDetails, now: DateTime<Utc>) {
        self.payment_status_code = invoice.status_code.clone();
        if invoice.status_code.as_deref() == Some(payment_status::COMPLETED) {
            self.mark_paid(invoice.payment_date.as_deref(), now);
        }
    }

    fn mark_paid(&mut self, payment_date: Option<&str>, now: DateTime<Utc>) {
        self.status = FilingStatus::Paid;
        let paid_at = payment_date.and_then(parse_timestamp).unwrap_or_else(|| {
            tracing::warn!(filing_id = self.id, "payment date missing or unreadable, using current time");
            now
        });
        self.payment_completion_date = Some(paid_at);
    }

    /// Registry has accepted the filing
    pub fn complete(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if !self.has_invoice() {
            return Err(AppError::Business(format!(
                "Filing {} has no invoice and cannot be completed.",
                self.id
            )));
        }
        self.status = FilingStatus::Completed;
        self.completion_date = Some(now);
        Ok(())
    }

    /// Download links available for the current status
    pub fn documents(&self, base_url: &str, identifier: &str) -> Vec<Value> {
        let prefix = format!(
            "{}/v1/business/{}/filings/{}/reports",
            base_url.trim_end_matches('/'),
            identifier,
            self.id
        );
        let mut documents = Vec::new();
        if self.is_locked() {
            documents.push(json!({"name": "Receipt", "url": format!("{prefix}/{}", reports::RECEIPT)}));
        }
        if self.status == FilingStatus::Completed {
            documents.push(json!({"name": "Annual Report", "url": format!("{prefix}/{}", reports::ANNUAL_REPORT)}));
        }
        documents
    }

    /// Annual report section of the stored payload
    pub fn annual_report(&self) -> Value {
        self.filing_json
            .get("filing")
            .and_then(|f| f.get(ANNUAL_REPORT))
            .cloned()
            .unwrap_or_else(|| json!({}))
    }

    /// API view of the filing: the stored payload with its header refreshed from the record
    pub fn to_view(&self, view: &FilingViewContext<'_>) -> Value {
        let mut filing_json = self.filing_json.clone();
        if !filing_json.is_object() {
            filing_json = json!({});
        }
        if !filing_json["filing"].is_object() {
            filing_json["filing"] = json!({});
        }

        let mut header = filing_json["filing"]
            .get("header")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        header.insert("id".into(), json!(self.id));
        header.insert("name".into(), json!(ANNUAL_REPORT));
        header.insert("filingYear".into(), json!(self.fiscal_year));
        header.insert("paymentToken".into(), json!(self.invoice_id));
        header.insert("paymentStatus".into(), json!(self.payment_status_code));
        header.insert("status".into(), json!(self.status.as_str()));
        header.insert("filingDateTime".into(), json!(self.filing_date.to_rfc3339()));
        header.insert("date".into(), json!(self.filing_date.format("%Y-%m-%d").to_string()));
        header.insert(
            "completionDate".into(),
            json!(self.completion_date.map(|d| d.to_rfc3339())),
        );
        if let Some(submitter) = view.submitter {
            header.insert("submitter".into(), json!(submitter.username));
            header.insert("certifiedBy".into(), json!(submitter.username));
            header.insert("certifiedByDisplayName".into(), json!(submitter.certified_name()));
        }
        if let Some(account) = &self.payment_account {
            header.insert("paymentAccount".into(), json!(account));
        }
        header.insert("colinIds".into(), json!(view.colin_ids));

        filing_json["filing"]["header"] = Value::Object(header);
        filing_json["filing"]["documents"] =
            Value::Array(self.documents(view.documents_base_url, view.identifier));
        filing_json
    }
}

/// Related data needed to render a filing
#[derive(Debug, Clone, Copy)]
pub struct FilingViewContext<'a> {
    pub identifier: &'a str,
    pub submitter: Option<&'a User>,
    pub colin_ids: &'a [i32],
    pub documents_base_url: &'a str,
}

/// Fields for a new filing
#[derive(Debug, Clone, PartialEq)]
pub struct NewFiling {
    pub fiscal_year: i32,
    pub filing_json: Value,
    pub business_id: BusinessId,
    pub submitter_id: Option<UserId>,
}

/// Fiscal year declared in the payload header
pub fn filing_year(filing_json: &Value) -> AppResult<i32> {
    filing_json
        .get("filing")
        .and_then(|f| f.get("header"))
        .and_then(|h| h.get("filingYear"))
        .and_then(Value::as_i64)
        .and_then(|year| i32::try_from(year).ok())
        .ok_or_else(|| AppError::invalid("filing.header.filingYear is required."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> Filing {
        Filing {
            id: 7,
            fiscal_year: 2024,
            filing_json: json!({"filing": {"header": {"filingYear": 2024}, "annualReport": {"annualReportDate": "2024-06-01"}}}),
            filing_date: Utc.with_ymd_and_hms(2024, 6, 2, 17, 30, 0).unwrap(),
            completion_date: None,
            status: FilingStatus::Draft,
            invoice_id: None,
            payment_status_code: None,
            payment_completion_date: None,
            payment_account: None,
            business_id: 1,
            submitter_id: None,
        }
    }

    fn invoice(status: &str, payment_date: Option<&str>) -> InvoiceDetails {
        InvoiceDetails {
            id: Some(4242),
            payment_account: Some(PaymentAccount { account_id: Some(json!(3001)) }),
            status_code: Some(status.to_string()),
            payment_date: payment_date.map(str::to_string),
        }
    }

    #[test]
    fn test_status_round_trip_through_storage_value() {
        for status in [FilingStatus::Draft, FilingStatus::Pending, FilingStatus::Paid, FilingStatus::Completed, FilingStatus::Error] {
            assert_eq!(FilingStatus::try_from(status.as_str().to_string()).unwrap(), status);
        }
        assert!(FilingStatus::try_from("BOGUS".to_string()).is_err());
        assert_eq!(FilingStatus::parse("paid"), Some(FilingStatus::Paid));
    }

    #[test]
    fn test_completed_invoice_marks_paid_with_payment_date() {
        let mut filing = draft();
        filing.apply_invoice(&invoice("COMPLETED", Some("2024-06-02T18:00:00+00:00")), Utc::now());

        assert_eq!(filing.status, FilingStatus::Paid);
        assert_eq!(filing.invoice_id, Some(4242));
        assert_eq!(filing.payment_account.as_deref(), Some("3001"));
        assert_eq!(
            filing.payment_completion_date,
            Some(Utc.with_ymd_and_hms(2024, 6, 2, 18, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_approved_invoice_marks_paid_and_normalises_status() {
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let mut filing = draft();
        filing.apply_invoice(&invoice("APPROVED", None), now);

        assert_eq!(filing.status, FilingStatus::Paid);
        assert_eq!(filing.payment_status_code.as_deref(), Some("COMPLETED"));
        assert_eq!(filing.payment_completion_date, Some(now));
    }

    #[test]
    fn test_unpaid_invoice_marks_pending() {
        let mut filing = draft();
        filing.apply_invoice(&invoice("CREATED", None), Utc::now());

        assert_eq!(filing.status, FilingStatus::Pending);
        assert_eq!(filing.payment_status_code.as_deref(), Some("CREATED"));
        assert!(filing.payment_completion_date.is_none());
        assert!(filing.has_invoice());
    }

    #[test]
    fn test_payment_refresh() {
        let mut filing = draft();
        filing.apply_invoice(&invoice("CREATED", None), Utc::now());
        filing.apply_payment_status(&invoice("COMPLETED", Some("2024-06-04")), Utc::now());
        assert_eq!(filing.status, FilingStatus::Paid);
        assert!(filing.payment_completion_date.is_some());
    }

    #[test]
    fn test_locked_filing_rejects_edits() {
        let mut filing = draft();
        assert!(filing.ensure_editable().is_ok());

        filing.status = FilingStatus::Paid;
        assert!(matches!(filing.ensure_editable(), Err(AppError::Business(_))));

        filing.status = FilingStatus::Completed;
        assert!(filing.is_locked());
        assert!(filing.ensure_editable().is_err());
    }

    #[test]
    fn test_complete_requires_invoice() {
        let mut filing = draft();
        assert!(filing.complete(Utc::now()).is_err());
        assert_eq!(filing.status, FilingStatus::Draft);

        filing.apply_invoice(&invoice("COMPLETED", None), Utc::now());
        let now = Utc::now();
        filing.complete(now).unwrap();
        assert_eq!(filing.status, FilingStatus::Completed);
        assert_eq!(filing.completion_date, Some(now));
    }

    #[test]
    fn test_documents_by_status() {
        let mut filing = draft();
        assert!(filing.documents("http://api", "BC1").is_empty());

        filing.status = FilingStatus::Paid;
        let docs = filing.documents("http://api/", "BC1");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["url"], "http://api/v1/business/BC1/filings/7/reports/receipt");

        filing.status = FilingStatus::Completed;
        let docs = filing.documents("http://api", "BC1");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["name"], "Annual Report");
    }

    #[test]
    fn test_view_overwrites_header() {
        let mut filing = draft();
        filing.apply_invoice(&invoice("CREATED", None), Utc::now());
        let submitter = User {
            id: 3,
            username: Some("bcsc/xyz".into()),
            firstname: Some("Jane".into()),
            lastname: Some("Doe".into()),
            middlename: None,
            email: None,
            sub: None,
            iss: None,
            idp_userid: None,
            login_source: None,
            creation_date: Utc::now(),
        };
        let view = filing.to_view(&FilingViewContext {
            identifier: "BC1",
            submitter: Some(&submitter),
            colin_ids: &[11, 12],
            documents_base_url: "http://api",
        });

        let header = &view["filing"]["header"];
        assert_eq!(header["id"], 7);
        assert_eq!(header["name"], "annualReport");
        assert_eq!(header["status"], "PENDING");
        assert_eq!(header["paymentToken"], 4242);
        assert_eq!(header["date"], "2024-06-02");
        assert_eq!(header["certifiedByDisplayName"], "Jane Doe");
        assert_eq!(header["paymentAccount"], "3001");
        assert_eq!(header["colinIds"], json!([11, 12]));
        assert!(header["completionDate"].is_null());
        assert_eq!(view["filing"]["annualReport"]["annualReportDate"], "2024-06-01");
        assert_eq!(view["filing"]["documents"], json!([]));
    }

    #[test]
    fn test_filing_year() {
        assert_eq!(filing_year(&draft().filing_json).unwrap(), 2024);
        assert!(filing_year(&json!({"filing": {}})).is_err());
    }
}
