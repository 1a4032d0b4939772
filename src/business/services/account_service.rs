//! Accounts, user profile and terms of use, all owned by auth-api

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use super::schema_service::{SchemaName, SchemaService};
use crate::infrastructure::ServiceClients;
use crate::shared::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct AccountService {
    clients: ServiceClients,
    schemas: Arc<SchemaService>,
}

pub type SharedAccountService = Arc<AccountService>;

impl AccountService {
    pub fn new(clients: ServiceClients, schemas: Arc<SchemaService>) -> Self {
        Self { clients, schemas }
    }

    pub async fn search(&self, name: Option<&str>) -> AppResult<Value> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| crate::business_error!("Please provide account name."))?;
        self.clients.auth.search_accounts(name).await
    }

    pub async fn user_accounts(&self, user_token: &str) -> AppResult<Value> {
        self.clients.auth.user_accounts(user_token).await
    }

    /// Creates the account, then its contact from `contactPoint`
    #[instrument(skip(self, user_token, payload))]
    pub async fn create(&self, user_token: &str, payload: &Value) -> AppResult<Value> {
        self.schemas.validate(SchemaName::NewAccount, payload)?;

        let name = payload.get("name").and_then(Value::as_str).unwrap_or_default();
        let account = self.clients.auth.create_account(user_token, name).await?;
        let account_id = account_id(&account)
            .ok_or_else(|| AppError::external(axum::http::StatusCode::BAD_GATEWAY, "Account created without an id"))?;

        if let Some(contact) = payload.get("contactPoint") {
            self.clients
                .auth
                .create_account_contact(user_token, &account_id, contact)
                .await?;
        }
        info!("🏢 account {} ready", account_id);
        Ok(account)
    }

    pub async fn update_user_profile(&self, user_token: &str) -> AppResult<Value> {
        self.clients.auth.update_user_profile(user_token).await
    }

    pub async fn user_terms(&self, user_token: &str) -> AppResult<Value> {
        self.clients.auth.user_terms(user_token).await
    }

    #[instrument(skip(self, user_token, payload))]
    pub async fn update_user_terms(&self, user_token: &str, payload: &Value) -> AppResult<Value> {
        self.schemas.validate(SchemaName::UserTos, payload)?;
        self.clients.auth.update_user_terms(user_token, payload).await
    }
}

/// Account id as a string, numeric or not
fn account_id(account: &Value) -> Option<String> {
    match account.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_id() {
        assert_eq!(account_id(&json!({"id": 2617})).as_deref(), Some("2617"));
        assert_eq!(account_id(&json!({"id": "abc"})).as_deref(), Some("abc"));
        assert_eq!(account_id(&json!({"id": ""})), None);
        assert_eq!(account_id(&json!({})), None);
    }
}
