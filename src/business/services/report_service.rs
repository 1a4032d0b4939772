//! Annual report PDFs rendered by report-api

use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::business_service::BusinessService;
use super::filing_service::FilingService;
use super::template;
use crate::business::domain::business::corp_type_info;
use crate::business::domain::{Business, Filing};
use crate::infrastructure::config::Config;
use crate::infrastructure::ServiceClients;
use crate::shared::constants::{notification, reports};
use crate::shared::types::FilingId;
use crate::shared::utils::time::{format_report_date, format_report_datetime, parse_date, parse_timestamp};
use crate::shared::{AppError, AppResult};

const REPORT_DESCRIPTION: &str = "Annual Report";

/// A rendered document
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub content: Bytes,
}

#[derive(Debug, Clone)]
pub struct ReportService {
    filings: FilingService,
    businesses: BusinessService,
    clients: ServiceClients,
    config: Arc<Config>,
}

pub type SharedReportService = Arc<ReportService>;

/// Everything the report template needs besides the filing view
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub filing: &'a Filing,
    pub business: &'a Business,
    pub tz: Tz,
    pub generated_at: DateTime<Utc>,
    pub environment_label: &'a str,
    pub registrar_name: &'a str,
}

impl ReportService {
    pub fn new(filings: FilingService, businesses: BusinessService, clients: ServiceClients, config: Arc<Config>) -> Self {
        Self { filings, businesses, clients, config }
    }

    /// `annualReport` or `receipt` for a filing of the business
    #[instrument(skip(self, token))]
    pub async fn document(&self, identifier: &str, filing_id: FilingId, report_type: &str, token: &str) -> AppResult<Document> {
        let business = self.businesses.find_by_identifier(identifier).await?;
        let filing = self.filings.find_for_business(&business, filing_id).await?;

        match report_type {
            reports::ANNUAL_REPORT => self.annual_report(&filing, &business, token).await,
            reports::RECEIPT => Ok(Document {
                file_name: "Receipt.pdf".to_string(),
                content: self.filings.receipt(&filing, &business).await?,
            }),
            other => Err(AppError::Business(format!("Unknown report type: {}", other))),
        }
    }

    /// Renders the annual report PDF
    #[instrument(skip(self, filing, business, token), fields(filing_id = filing.id))]
    pub async fn annual_report(&self, filing: &Filing, business: &Business, token: &str) -> AppResult<Document> {
        let registry = self.businesses.registry_business(business).await?;
        let view = self.filings.serialize(filing, &business.identifier).await?;

        let tz = self
            .config
            .environment
            .legislation_tz()
            .map_err(|e| AppError::Configuration(e.to_string()))?;
        let environment_label = self.config.environment.report_environment_label();
        let context = ReportContext {
            filing,
            business,
            tz,
            generated_at: Utc::now(),
            environment_label: &environment_label,
            registrar_name: &self.config.environment.registrar_name,
        };

        let template_dir = Path::new(&self.config.templates.report_template_path);
        let html = template::load(&template_dir.join(notification::REPORT_TEMPLATE))?;
        let html = template::substitute_parts(&html, &template_dir.join("template-parts"))?;

        let file_name = report_file_name(filing, business);
        let request = json!({
            "reportName": file_name,
            "template": format!("'{}'", STANDARD.encode(html.as_bytes())),
            "templateVars": template_vars(view, registry, &context),
        });

        let content = self.clients.report.render(token, &request).await?;
        info!("📄 annual report rendered for filing {} ({} bytes)", filing.id, content.len());
        Ok(Document { file_name, content })
    }
}

/// `{identifier}_{filing date to the second}_Annual_Report.pdf`
pub fn report_file_name(filing: &Filing, business: &Business) -> String {
    let filing_date = filing.filing_date.format("%Y-%m-%d %H:%M:%S").to_string();
    format!("{}_{}_{}.pdf", business.identifier, filing_date, REPORT_DESCRIPTION).replace(' ', "_")
}

/// Template variables: the `filing` section of the view plus dates, descriptions and metadata
pub fn template_vars(view: Value, registry_business: Value, context: &ReportContext<'_>) -> Value {
    let mut vars = view.get("filing").cloned().unwrap_or_else(|| json!({}));
    if !vars.is_object() {
        vars = json!({});
    }

    vars["business"] = registry_business;
    vars["header"]["reportType"] = json!(reports::ANNUAL_REPORT);

    let filing_date_time = format_report_datetime(context.filing.filing_date, context.tz);
    vars["filing_date_time"] = json!(filing_date_time);

    let agm_date = vars
        .get(reports::ANNUAL_REPORT)
        .and_then(|ar| ar.get("annualGeneralMeetingDate"))
        .and_then(Value::as_str)
        .and_then(parse_date);
    match agm_date {
        Some(date) => {
            let formatted = format_report_date(date);
            vars["agm_date"] = json!(formatted);
            vars["effective_date"] = json!(formatted);
        }
        None => vars["agm_date"] = json!("No AGM"),
    }

    vars["report_date_time"] = json!(format_report_datetime(context.generated_at, context.tz));

    let recognition = vars["business"]
        .get("foundingDate")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(context.business.founding_date);
    vars["recognition_date_time"] = json!(format_report_datetime(recognition, context.tz));

    if let Some(info) = corp_type_info(&context.business.legal_type) {
        vars["entityDescription"] = json!(info.description);
        vars["entityAct"] = json!(info.act);
    }

    vars["environment"] = json!(format!("{} FILING #{}", context.environment_label, context.filing.id)
        .trim_start()
        .to_string());
    vars["meta_title"] = json!(format!("{} on {}", REPORT_DESCRIPTION, filing_date_time));
    vars["meta_subject"] = json!(format!("{} ({})", context.business.legal_name, context.business.identifier));
    vars["registrarInfo"] = json!({
        "name": context.registrar_name,
        "title": "Registrar of Companies",
    });

    vars
}

/// Attachment name for the report: "2024 Annual Report.pdf" when the report date is known
pub fn report_attachment_name(annual_report_date: Option<&str>) -> String {
    match annual_report_date.and_then(|d| d.get(..4)).filter(|y| y.chars().all(|c| c.is_ascii_digit())) {
        Some(year) => format!("{} {}.pdf", year, REPORT_DESCRIPTION),
        None => format!("{}.pdf", REPORT_DESCRIPTION),
    }
}
