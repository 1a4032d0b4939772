//! Business lookups, registry enrichment and pending tasks

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info, instrument};

use super::filing_service::FilingService;
use crate::business::domain::business::enrich_registry_business;
use crate::business::domain::{Business, FilingStatus, ReminderStatus};
use crate::infrastructure::external::auth_api::entity_json;
use crate::infrastructure::{Database, ServiceClients};
use crate::shared::constants::filing::ANNUAL_REPORT;
use crate::shared::types::BusinessId;
use crate::shared::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct BusinessService {
    database: Database,
    clients: ServiceClients,
    filings: FilingService,
}

pub type SharedBusinessService = Arc<BusinessService>;

impl BusinessService {
    pub fn new(database: Database, clients: ServiceClients, filings: FilingService) -> Self {
        Self { database, clients, filings }
    }

    pub async fn find_by_identifier(&self, identifier: &str) -> AppResult<Business> {
        self.database
            .businesses
            .find_by_identifier(identifier)
            .await?
            .ok_or_else(|| AppError::NotFound("No matching business.".to_string()))
    }

    pub async fn find_by_id(&self, id: BusinessId) -> AppResult<Business> {
        self.database
            .businesses
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("No matching business.".to_string()))
    }

    /// Registry view of the business (`{"business": {...}}`) with the derived fields added
    #[instrument(skip(self, business), fields(identifier = %business.identifier))]
    pub async fn registry_details(&self, business: &Business) -> AppResult<Value> {
        let colin = &self.clients.colin;
        let token = colin.service_token().await?;

        let mut details = colin
            .business(&token, &business.legal_type, &business.identifier)
            .await?;

        let invitation = self
            .database
            .invitations
            .find_active_by_business(business.id)
            .await?;

        let future_filings = colin
            .future_effective_filings(&token, &business.legal_type, &business.identifier)
            .await?;
        let has_future = future_filings.as_array().map_or(false, |f| !f.is_empty());

        enrich_registry_business(
            &mut details,
            invitation.as_ref().map(|i| i.recipients.as_str()),
            has_future,
        );
        Ok(details)
    }

    /// Inner `business` object of the registry view
    pub async fn registry_business(&self, business: &Business) -> AppResult<Value> {
        let details = self.registry_details(business).await?;
        Ok(details.get("business").cloned().unwrap_or_else(|| json!({})))
    }

    /// Registry view plus offices and directors. Office and party failures are only logged.
    #[instrument(skip(self))]
    pub async fn details_with_offices(&self, identifier: &str) -> AppResult<Value> {
        let business = self.find_by_identifier(identifier).await?;

        let mut details = self.registry_details(&business).await.map_err(|e| {
            error!("❌ error while fetching business details from COLIN: {}", e);
            AppError::Internal("Error while fetching business details from Colin.".to_string())
        })?;

        let colin = &self.clients.colin;
        let token = colin.service_token().await?;

        match colin.office(&token, &business.legal_type, &business.identifier).await {
            Ok(offices) => details["offices"] = offices,
            Err(e) => error!("❌ error while fetching business office from COLIN: {}", e),
        }

        match colin.parties(&token, &business.legal_type, &business.identifier).await {
            Ok(parties) => details["parties"] = parties.get("directors").cloned().unwrap_or_else(|| json!([])),
            Err(e) => error!("❌ error while fetching business parties from COLIN: {}", e),
        }

        Ok(details)
    }

    /// Business reached through an emailed invitation or reminder token
    #[instrument(skip(self, token))]
    pub async fn details_for_token(&self, token: &str) -> AppResult<Value> {
        if token.trim().is_empty() {
            return Err(crate::business_error!("Please provide token."));
        }

        let business_id = match self.database.invitations.find_by_token(token).await? {
            Some(invitation) if invitation.is_sent() => Some(invitation.business_id),
            _ => self
                .database
                .reminders
                .find_by_token(token)
                .await?
                .filter(|reminder| reminder.status == ReminderStatus::Sent)
                .map(|reminder| reminder.business_id),
        };

        let Some(business_id) = business_id else {
            return Err(crate::business_error!("Invalid token."));
        };

        let business = self.find_by_id(business_id).await?;
        let registry = self.registry_business(&business).await?;

        let mut view = business.json();
        view["legalName"] = registry.get("legalName").cloned().unwrap_or(Value::Null);
        view["status"] = registry.get("corpState").cloned().unwrap_or(Value::Null);
        Ok(view)
    }

    /// Registers the business as an entity in auth-api
    #[instrument(skip(self))]
    pub async fn create_auth_entity(&self, identifier: Option<&str>) -> AppResult<Value> {
        let identifier = identifier
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| crate::business_error!("Please provide business identifier"))?;

        let business = self
            .database
            .businesses
            .find_by_identifier(identifier)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", identifier)))?;

        let entity = self
            .clients
            .auth
            .create_entity(&entity_json(&business.identifier, &business.legal_name, &business.legal_type))
            .await?;
        info!("🆕 auth entity created for {}", business.identifier);
        Ok(entity)
    }

    /// Filings in a status, each with its registry business attached, as `{filings: [...]}`
    #[instrument(skip(self))]
    pub async fn filings_with_registry_business(&self, status: &str) -> AppResult<Value> {
        let status = FilingStatus::parse(status)
            .ok_or_else(|| AppError::invalid(format!("Unknown filing status: {}", status)))?;

        let filings = self.filings.find_by_status(status).await?;
        let mut views = Vec::with_capacity(filings.len());
        for filing in &filings {
            let business = self.filings.business_of(filing).await?;
            let mut view = self.filings.serialize(filing, &business.identifier).await?;
            view["filing"]["business"] = self.registry_business(&business).await?;
            views.push(view);
        }
        info!("📋 {} {} filings", views.len(), status);
        Ok(json!({ "filings": views }))
    }

    /// Open filings as tasks, or a single to-do when an annual report is owed and none is open
    #[instrument(skip(self))]
    pub async fn pending_tasks(&self, identifier: &str, current_year: i32) -> AppResult<Vec<Value>> {
        let business = self.find_by_identifier(identifier).await?;
        let registry = self.registry_business(&business).await?;

        let pending = self
            .database
            .filings
            .find_by_business_and_statuses(business.id, &FilingStatus::pending_task_statuses())
            .await?;

        let mut tasks = Vec::with_capacity(pending.len());
        for filing in &pending {
            let mut view = self.filings.serialize(filing, &business.identifier).await?;
            view["filing"]["business"] = registry.clone();
            tasks.push(json!({ "task": view }));
        }

        if tasks.is_empty() {
            if let Some(todo) = todo_task(&registry, current_year) {
                tasks.push(todo);
            }
        }
        Ok(tasks)
    }
}

/// To-do entry for an owed annual report
pub fn todo_task(registry_business: &Value, current_year: i32) -> Option<Value> {
    let next_ar_year = registry_business.get("nextARYear").and_then(Value::as_i64)?;
    // -1 means the registry knows neither a last AR date nor a founding date
    if next_ar_year <= 0 || next_ar_year > i64::from(current_year) {
        return None;
    }
    Some(json!({
        "task": {
            "todo": {
                "business": registry_business,
                "header": {
                    "name": ANNUAL_REPORT,
                    "ARFilingYear": next_ar_year,
                    "status": "NEW",
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_task_when_owed() {
        let registry = json!({"identifier": "BC0000001", "nextARYear": 2024});
        let todo = todo_task(&registry, 2024).unwrap();
        assert_eq!(todo["task"]["todo"]["header"]["ARFilingYear"], 2024);
        assert_eq!(todo["task"]["todo"]["header"]["status"], "NEW");
        assert_eq!(todo["task"]["todo"]["business"]["identifier"], "BC0000001");
    }

    #[test]
    fn test_no_todo_when_not_owed() {
        assert!(todo_task(&json!({"nextARYear": 2025}), 2024).is_none());
        assert!(todo_task(&json!({}), 2024).is_none());
    }

    #[test]
    fn test_unknown_next_ar_year_has_no_todo() {
        assert!(todo_task(&json!({"identifier": "BC0000001", "nextARYear": -1}), 2024).is_none());
        assert!(todo_task(&json!({"nextARYear": 0}), 2024).is_none());
        assert!(todo_task(&json!({"nextARYear": 1}), 2024).is_some());
    }
}
