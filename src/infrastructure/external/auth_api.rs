//! auth-api client: accounts, contacts, entities, affiliations and terms of use

use axum::http::StatusCode;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};

use super::{read_json, status_of, transport_error, TokenClient};
use crate::auth::Claims;
use crate::infrastructure::config::ClientCredentials;
use crate::shared::constants::roles;
use crate::shared::{AppError, AppResult};

const SERVICE: &str = "auth-api";

#[derive(Debug, Clone)]
pub struct AuthApiClient {
    http: Client,
    base_url: String,
    tokens: TokenClient,
    credentials: ClientCredentials,
}

impl AuthApiClient {
    pub fn new(http: Client, base_url: &str, tokens: TokenClient, credentials: ClientCredentials) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, token: &str) -> AppResult<Value> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::SERVICE_UNAVAILABLE, e))?;
        read_json(SERVICE, response).await
    }

    async fn send_json(&self, method: reqwest::Method, path: &str, token: &str, body: &Value) -> AppResult<Value> {
        let response = self
            .http
            .request(method, self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::SERVICE_UNAVAILABLE, e))?;
        read_json(SERVICE, response).await
    }

    async fn service_token(&self) -> AppResult<String> {
        self.tokens.service_token(&self.credentials).await
    }

    /// Accounts the caller belongs to
    #[instrument(skip(self, user_token))]
    pub async fn user_accounts(&self, user_token: &str) -> AppResult<Value> {
        self.get("/users/orgs", user_token).await
    }

    /// The caller's terms-of-use state, with the current document when not yet accepted
    #[instrument(skip(self, user_token))]
    pub async fn user_terms(&self, user_token: &str) -> AppResult<Value> {
        let user = self.get("/users/@me", user_token).await?;
        let mut terms = user.get("userTerms").cloned().unwrap_or_else(|| json!({}));

        let accepted = terms
            .get("isTermsOfUseAccepted")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if !accepted {
            let document = self.get("/documents/termsofuse", user_token).await?;
            if let Some(terms) = terms.as_object_mut() {
                terms.insert(
                    "termsOfUseCurrentVersion".to_string(),
                    document.get("versionId").cloned().unwrap_or(Value::Null),
                );
                terms.insert(
                    "termsOfUse".to_string(),
                    document.get("content").cloned().unwrap_or(Value::Null),
                );
            }
        }

        Ok(terms)
    }

    #[instrument(skip(self, user_token, request))]
    pub async fn update_user_terms(&self, user_token: &str, request: &Value) -> AppResult<Value> {
        let user = self
            .send_json(reqwest::Method::PATCH, "/users/@me", user_token, request)
            .await?;
        Ok(user.get("userTerms").cloned().unwrap_or(Value::Null))
    }

    /// Creates a basic, direct-pay account for the business product
    #[instrument(skip(self, user_token))]
    pub async fn create_account(&self, user_token: &str, name: &str) -> AppResult<Value> {
        let payload = json!({
            "name": name,
            "accessType": "REGULAR",
            "typeCode": "BASIC",
            "productSubscriptions": [{"productCode": "BUSINESS"}],
            "paymentInfo": {"paymentMethod": "DIRECT_PAY"},
        });
        let account = self
            .send_json(reqwest::Method::POST, "/orgs", user_token, &payload)
            .await?;
        info!("🏢 account created: {}", name);
        Ok(account)
    }

    /// Adds the contact point to an account
    #[instrument(skip(self, user_token, contact))]
    pub async fn create_account_contact(&self, user_token: &str, account_id: &str, contact: &Value) -> AppResult<Value> {
        let mut payload = json!({
            "email": contact.get("email").cloned().unwrap_or(Value::Null),
            "phone": contact.get("phone").cloned().unwrap_or(Value::Null),
        });
        if let Some(extension) = contact.get("extension").filter(|v| !v.is_null()) {
            let extension = match extension {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            payload["phoneExtension"] = Value::String(extension);
        }

        self.send_json(
            reqwest::Method::POST,
            &format!("/orgs/{}/contacts", account_id),
            user_token,
            &payload,
        )
        .await
    }

    #[instrument(skip(self, token))]
    pub async fn account_contacts(&self, token: &str, account_id: &str) -> AppResult<Value> {
        self.get(&format!("/orgs/{}/contacts", account_id), token).await
    }

    /// Account search by name, with a service token
    #[instrument(skip(self))]
    pub async fn search_accounts(&self, name: &str) -> AppResult<Value> {
        let token = self.service_token().await?;
        let response = self
            .http
            .get(self.url("/orgs"))
            .bearer_auth(token)
            .query(&[("name", name.trim())])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::SERVICE_UNAVAILABLE, e))?;
        read_json(SERVICE, response).await
    }

    #[instrument(skip(self, entity))]
    pub async fn create_entity(&self, entity: &Value) -> AppResult<Value> {
        let token = self.service_token().await?;
        self.send_json(reqwest::Method::POST, "/entities", &token, entity).await
    }

    /// Looks up the entity and creates it when auth-api answers 404
    #[instrument(skip(self, entity))]
    pub async fn find_or_create_entity(&self, entity: &Value) -> AppResult<Value> {
        let identifier = entity
            .get("businessIdentifier")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let token = self.service_token().await?;

        match self.get(&format!("/entities/{}", identifier), &token).await {
            Ok(found) => Ok(found),
            Err(AppError::ExternalService { status, .. }) if status == StatusCode::NOT_FOUND => {
                info!("🆕 creating entity {} in auth", identifier);
                self.send_json(reqwest::Method::POST, "/entities", &token, entity).await
            }
            Err(e) => Err(e),
        }
    }

    /// Registers the caller's roles in auth-api
    #[instrument(skip(self, user_token))]
    pub async fn update_user_profile(&self, user_token: &str) -> AppResult<Value> {
        self.send_json(reqwest::Method::POST, "/users", user_token, &json!({}))
            .await
            .map_err(|e| {
                error!("❌ error while creating user roles: {}", e);
                AppError::external(StatusCode::INTERNAL_SERVER_ERROR, "Error while creating user roles")
            })
    }

    #[instrument(skip(self, user_token))]
    pub async fn account_affiliations(&self, user_token: &str, account_id: &str) -> AppResult<Value> {
        self.get(&format!("/orgs/{}/affiliations", account_id), user_token).await
    }

    #[instrument(skip(self, user_token))]
    pub async fn affiliate_entity(&self, user_token: &str, account_id: &str, identifier: &str) -> AppResult<Value> {
        let payload = json!({"businessIdentifier": identifier, "passCode": ""});
        let affiliation = self
            .send_json(
                reqwest::Method::POST,
                &format!("/orgs/{}/affiliations", account_id),
                user_token,
                &payload,
            )
            .await?;
        info!("🔗 {} affiliated to account {}", identifier, account_id);
        Ok(affiliation)
    }

    /// Allows staff outright; otherwise the caller needs the "edit" role on the business
    #[instrument(skip(self, claims, user_token))]
    pub async fn is_authorized(&self, claims: &Claims, user_token: &str, identifier: &str) -> AppResult<()> {
        if claims.is_staff() {
            return Ok(());
        }

        let response = self
            .http
            .get(self.url(&format!("/entities/{}/authorizations", identifier)))
            .bearer_auth(user_token)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::SERVICE_UNAVAILABLE, e))?;

        let status = status_of(&response);
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            debug!("invalid response from auth-api: {} - {}", status, body);
            return Err(AppError::external(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{} - {}", status.as_u16(), body),
            ));
        }

        let has_edit = status == StatusCode::OK
            && response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("roles").and_then(Value::as_array).cloned())
                .map(|granted| granted.iter().any(|role| role.as_str() == Some(roles::EDIT)))
                .unwrap_or(false);

        if has_edit {
            Ok(())
        } else {
            let message = format!("Unauthorized access to business: {}", identifier);
            debug!("{}", message);
            Err(AppError::Forbidden(message))
        }
    }
}

/// Entity payload registered in auth-api for a business
pub fn entity_json(identifier: &str, legal_name: &str, legal_type: &str) -> Value {
    json!({
        "businessIdentifier": identifier,
        "name": legal_name,
        "corpTypeCode": legal_type,
    })
}
