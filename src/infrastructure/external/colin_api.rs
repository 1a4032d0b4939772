//! COLIN (legacy corporate registry) client

use axum::http::StatusCode;
use reqwest::Client;
use serde_json::Value;
use tracing::{error, info, instrument};

use super::{read_json, status_of, transport_error, TokenClient};
use crate::business::domain::business::colin_identifier;
use crate::infrastructure::config::ClientCredentials;
use crate::shared::{AppError, AppResult};

const SERVICE: &str = "colin-api";

#[derive(Debug, Clone)]
pub struct ColinApiClient {
    http: Client,
    base_url: String,
    tokens: TokenClient,
    credentials: ClientCredentials,
}

impl ColinApiClient {
    pub fn new(http: Client, base_url: &str, tokens: TokenClient, credentials: ClientCredentials) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            credentials,
        }
    }

    /// Token for the COLIN service account
    pub async fn service_token(&self) -> AppResult<String> {
        self.tokens.service_token(&self.credentials).await
    }

    fn business_url(&self, legal_type: &str, identifier: &str) -> String {
        format!("{}/businesses/{}/{}", self.base_url, legal_type, colin_identifier(identifier))
    }

    async fn get(&self, url: String, token: &str) -> AppResult<Value> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::SERVICE_UNAVAILABLE, e))?;
        read_json(SERVICE, response).await
    }

    #[instrument(skip(self, token))]
    pub async fn business(&self, token: &str, legal_type: &str, identifier: &str) -> AppResult<Value> {
        self.get(self.business_url(legal_type, identifier), token).await
    }

    #[instrument(skip(self, token))]
    pub async fn future_effective_filings(&self, token: &str, legal_type: &str, identifier: &str) -> AppResult<Value> {
        self.get(format!("{}/filings/future", self.business_url(legal_type, identifier)), token)
            .await
    }

    #[instrument(skip(self, token))]
    pub async fn office(&self, token: &str, legal_type: &str, identifier: &str) -> AppResult<Value> {
        self.get(format!("{}/office", self.business_url(legal_type, identifier)), token)
            .await
    }

    #[instrument(skip(self, token))]
    pub async fn parties(&self, token: &str, legal_type: &str, identifier: &str) -> AppResult<Value> {
        self.get(format!("{}/parties", self.business_url(legal_type, identifier)), token)
            .await
    }

    /// Posts a filing to the registry; COLIN answers 201 with the event ids in the header
    #[instrument(skip(self, token, filing))]
    pub async fn post_filing(
        &self,
        token: &str,
        legal_type: &str,
        identifier: &str,
        filing_name: &str,
        filing: &Value,
    ) -> AppResult<Value> {
        let url = format!(
            "{}/businesses/{}/{}/filings/{}",
            self.base_url, legal_type, identifier, filing_name
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(filing)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::SERVICE_UNAVAILABLE, e))?;

        let status = status_of(&response);
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            error!("❌ COLIN rejected filing for {}: {} {}", identifier, status, body);
            return Err(AppError::external(
                if status.is_success() { StatusCode::BAD_GATEWAY } else { status },
                format!("COLIN rejected filing for {}: {}", identifier, status.as_u16()),
            ));
        }

        info!("🏛️ filing for {} accepted by COLIN", identifier);
        read_json(SERVICE, response).await
    }
}
