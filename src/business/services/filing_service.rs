//! Filing lifecycle: submission, invoicing, payment refresh and completion

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::schema_service::{SchemaName, SchemaService};
use crate::auth::Claims;
use crate::business::domain::filing::filing_year;
use crate::business::domain::{Business, Filing, FilingStatus, FilingViewContext, InvoiceDetails, NewFiling, NewUser};
use crate::infrastructure::config::Config;
use crate::infrastructure::external::auth_api::entity_json;
use crate::infrastructure::external::pay_api::ReceiptRequest;
use crate::infrastructure::{Database, ServiceClients};
use crate::shared::types::FilingId;
use crate::shared::{AppError, AppResult};

/// An annual report submitted by an authenticated user
#[derive(Debug)]
pub struct FilingSubmission<'a> {
    pub identifier: &'a str,
    /// Set when an existing draft is being updated
    pub filing_id: Option<FilingId>,
    pub account_id: Option<&'a str>,
    pub payload: Value,
    pub claims: &'a Claims,
    pub token: &'a str,
}

#[derive(Debug, Clone)]
pub struct FilingService {
    database: Database,
    clients: ServiceClients,
    schemas: Arc<SchemaService>,
    config: Arc<Config>,
}

pub type SharedFilingService = Arc<FilingService>;

impl FilingService {
    pub fn new(database: Database, clients: ServiceClients, schemas: Arc<SchemaService>, config: Arc<Config>) -> Self {
        Self { database, clients, schemas, config }
    }

    pub async fn find_by_id(&self, id: FilingId) -> AppResult<Filing> {
        self.database
            .filings
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Filing not found.".to_string()))
    }

    pub async fn find_by_status(&self, status: FilingStatus) -> AppResult<Vec<Filing>> {
        self.database.filings.find_by_status(status).await
    }

    /// Business the filing belongs to
    pub async fn business_of(&self, filing: &Filing) -> AppResult<Business> {
        self.database
            .businesses
            .find_by_id(filing.business_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No matching business.".to_string()))
    }

    /// API view of a filing, with submitter and registry event ids resolved
    pub async fn serialize(&self, filing: &Filing, identifier: &str) -> AppResult<Value> {
        let submitter = match filing.submitter_id {
            Some(id) => self.database.users.find_by_id(id).await?,
            None => None,
        };
        let colin_ids = self.database.filings.colin_event_ids(filing.id).await?;

        Ok(filing.to_view(&FilingViewContext {
            identifier,
            submitter: submitter.as_ref(),
            colin_ids: &colin_ids,
            documents_base_url: &self.config.services.business_ar_api_base_url,
        }))
    }

    /// Every filing of the business, newest first, as `{filings: [...]}`
    pub async fn list_for_business(&self, business: &Business) -> AppResult<Value> {
        let filings = self.database.filings.find_by_business(business.id).await?;
        let mut views = Vec::with_capacity(filings.len());
        for filing in &filings {
            views.push(self.serialize(filing, &business.identifier).await?);
        }
        Ok(json!({ "filings": views }))
    }

    /// One filing of the business
    pub async fn find_for_business(&self, business: &Business, id: FilingId) -> AppResult<Filing> {
        let filing = self.find_by_id(id).await?;
        if filing.business_id != business.id {
            return Err(AppError::NotFound("Filing not found.".to_string()));
        }
        Ok(filing)
    }

    /// Fails unless the caller may edit the business
    pub async fn authorize(&self, claims: &Claims, token: &str, identifier: &str) -> AppResult<()> {
        self.clients.auth.is_authorized(claims, token, identifier).await
    }

    /// Creates or updates an annual report and invoices it when no invoice exists yet
    #[instrument(skip(self, submission), fields(identifier = submission.identifier, filing_id = ?submission.filing_id))]
    pub async fn submit(&self, submission: FilingSubmission<'_>) -> AppResult<Filing> {
        let user = self
            .database
            .users
            .get_or_create(&NewUser::from_claims(submission.claims))
            .await?;

        let business = self
            .database
            .businesses
            .find_by_identifier(submission.identifier)
            .await?
            .ok_or_else(|| AppError::NotFound("No matching business.".to_string()))?;

        self.schemas.validate(SchemaName::ArFiling, &submission.payload)?;
        let fiscal_year = filing_year(&submission.payload)?;

        let existing = match submission.filing_id {
            Some(id) => {
                let filing = self.find_for_business(&business, id).await?;
                filing.ensure_editable()?;
                Some(filing)
            }
            None => None,
        };

        let needs_invoice = existing.as_ref().map_or(true, |f| !f.has_invoice());
        if needs_invoice {
            let account_id = require_account(submission.account_id)?;
            self.ensure_affiliation(&business, account_id, submission.token).await?;
        }

        self.clients
            .auth
            .is_authorized(submission.claims, submission.token, submission.identifier)
            .await?;

        let filing = match existing {
            Some(mut filing) => {
                filing.filing_json = submission.payload;
                filing.fiscal_year = fiscal_year;
                filing.submitter_id = Some(user.id);
                self.database.filings.update(&filing).await?
            }
            None => {
                self.database
                    .filings
                    .create(&NewFiling {
                        fiscal_year,
                        filing_json: submission.payload,
                        business_id: business.id,
                        submitter_id: Some(user.id),
                    })
                    .await?
            }
        };

        if filing.has_invoice() {
            return Ok(filing);
        }

        let account_id = require_account(submission.account_id)?;
        let invoice = self
            .clients
            .pay
            .create_invoice(account_id, submission.token, &business.json())
            .await?;
        self.update_filing_invoice_details(filing, &invoice).await
    }

    /// Registers the business in auth-api and links it to the account when it is not yet
    async fn ensure_affiliation(&self, business: &Business, account_id: &str, token: &str) -> AppResult<()> {
        self.clients
            .auth
            .find_or_create_entity(&entity_json(&business.identifier, &business.legal_name, &business.legal_type))
            .await?;

        let affiliations = self.clients.auth.account_affiliations(token, account_id).await?;
        let affiliated = affiliations
            .get("entities")
            .and_then(Value::as_array)
            .map(|entities| {
                entities.iter().any(|entity| {
                    entity.get("businessIdentifier").and_then(Value::as_str) == Some(business.identifier.as_str())
                })
            })
            .unwrap_or(false);

        if !affiliated {
            self.clients
                .auth
                .affiliate_entity(token, account_id, &business.identifier)
                .await?;
        }
        Ok(())
    }

    /// Applies an invoice creation response and persists the result
    pub async fn update_filing_invoice_details(&self, mut filing: Filing, invoice: &InvoiceDetails) -> AppResult<Filing> {
        filing.apply_invoice(invoice, Utc::now());
        let saved = self.database.filings.update(&filing).await?;
        info!("💳 filing {} is {} after invoicing", saved.id, saved.status);
        Ok(saved)
    }

    /// Invoice as pay-api reports it
    pub async fn get_payment_data(&self, filing_id: FilingId, token: &str) -> AppResult<Value> {
        let filing = self.find_by_id(filing_id).await?;
        let invoice_id = filing
            .invoice_id
            .ok_or_else(|| AppError::Business("No invoice for the filing.".to_string()))?;
        self.clients.pay.payment_details(token, invoice_id).await
    }

    /// Pulls the payment status from pay-api and stores it
    #[instrument(skip(self, token))]
    pub async fn update_payment_data(&self, filing_id: FilingId, token: &str) -> AppResult<Filing> {
        let mut filing = self.find_by_id(filing_id).await?;
        let invoice_id = filing
            .invoice_id
            .ok_or_else(|| AppError::Business("No invoice for the filing.".to_string()))?;

        let invoice = self.clients.pay.invoice(token, invoice_id).await?;
        filing.apply_payment_status(&invoice, Utc::now());
        let saved = self.database.filings.update(&filing).await?;
        info!("🔄 filing {} payment refreshed: {}", saved.id, saved.status);
        Ok(saved)
    }

    /// Marks the filing COMPLETED and stores the registry event ids
    #[instrument(skip(self))]
    pub async fn complete_filing(&self, filing_id: FilingId, colin_event_ids: &[i32]) -> AppResult<Filing> {
        let mut filing = self.find_by_id(filing_id).await?;
        filing.complete(Utc::now())?;
        self.database.filings.save_completion(&filing, colin_event_ids).await
    }

    /// Payment receipt PDF; only paid or completed filings have one
    #[instrument(skip(self, filing, business), fields(filing_id = filing.id))]
    pub async fn receipt(&self, filing: &Filing, business: &Business) -> AppResult<Bytes> {
        if !filing.is_locked() {
            return Err(AppError::Business("Filing not in Paid or Completed State".to_string()));
        }
        let Some(invoice_id) = filing.invoice_id else {
            warn!("filing {} is {} without an invoice", filing.id, filing.status);
            return Err(AppError::Business("No invoice for the filing.".to_string()));
        };

        let token = self.clients.tokens.service_token(&self.config.credentials.auth_svc).await?;
        self.clients
            .pay
            .receipt(&token, invoice_id, &receipt_request(filing, business))
            .await
    }
}

/// Receipt request for a filing of the business
pub fn receipt_request(filing: &Filing, business: &Business) -> ReceiptRequest {
    ReceiptRequest {
        corp_name: business.legal_name.clone(),
        filing_date_time: filing.filing_date.to_rfc3339(),
        filing_identifier: filing.id.to_string(),
        business_number: business.tax_id.clone(),
    }
}

fn require_account(account_id: Option<&str>) -> AppResult<&str> {
    account_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::invalid("Account-Id header is required."))
}
