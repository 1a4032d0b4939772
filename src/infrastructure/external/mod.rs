//! Clients for the sibling government services
//!
//! Every client shares one pooled `reqwest::Client`. Failures are mapped to
//! `AppError::ExternalService` carrying the status the caller should see.

pub mod auth_api;
pub mod colin_api;
pub mod notify_api;
pub mod pay_api;
pub mod report_api;
pub mod token;

use std::time::Duration;

use axum::http::StatusCode;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{error, info};

use crate::infrastructure::config::Config;
use crate::shared::{AppError, AppResult};

pub use auth_api::AuthApiClient;
pub use colin_api::ColinApiClient;
pub use notify_api::NotifyApiClient;
pub use pay_api::PayApiClient;
pub use report_api::ReportApiClient;
pub use token::TokenClient;

/// Builds the shared HTTP client
pub struct HttpClientFactory;

impl HttpClientFactory {
    pub fn create_client(timeout_seconds: u64) -> AppResult<Client> {
        Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                error!("❌ failed to build HTTP client: {}", e);
                AppError::Configuration(format!("failed to build HTTP client: {}", e))
            })
    }
}

/// One client per sibling service
#[derive(Debug, Clone)]
pub struct ServiceClients {
    pub tokens: TokenClient,
    pub auth: AuthApiClient,
    pub pay: PayApiClient,
    pub colin: ColinApiClient,
    pub notify: NotifyApiClient,
    pub report: ReportApiClient,
}

impl ServiceClients {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = HttpClientFactory::create_client(config.services.timeout_seconds)?;
        let services = &config.services;
        let tokens = TokenClient::new(http.clone(), &services.auth_svc_url);

        info!("🔗 service clients ready (auth: {}, pay: {}, colin: {})",
              services.auth_api_url, services.pay_api_url, services.colin_api_url);

        Ok(Self {
            auth: AuthApiClient::new(
                http.clone(),
                &services.auth_api_url,
                tokens.clone(),
                config.credentials.auth_svc.clone(),
            ),
            pay: PayApiClient::new(http.clone(), &services.pay_api_url),
            colin: ColinApiClient::new(
                http.clone(),
                &services.colin_api_url,
                tokens.clone(),
                config.credentials.colin_api.clone(),
            ),
            notify: NotifyApiClient::new(http.clone(), &services.notify_api_url),
            report: ReportApiClient::new(http, &services.report_api_url),
            tokens,
        })
    }
}

/// Converts a reqwest status into the server's status type
pub(crate) fn status_of(response: &Response) -> StatusCode {
    StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
}

/// Maps a transport failure (connect, timeout, body) to an error with the given status
pub(crate) fn transport_error(service: &str, status: StatusCode, e: reqwest::Error) -> AppError {
    error!("❌ {} request failed: {}", service, e);
    AppError::external(status, format!("{} unavailable: {}", service, e))
}

/// Reads a JSON body from a successful response, or turns the error status into an `AppError`
pub(crate) async fn read_json(service: &str, response: Response) -> AppResult<Value> {
    let status = status_of(&response);
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(service, StatusCode::BAD_GATEWAY, e))?;

    if !status.is_success() {
        error!("❌ {} answered {}: {}", service, status, body);
        return Err(AppError::external(status, format!("{} error: {} - {}", service, status.as_u16(), body)));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| {
        error!("❌ {} returned invalid JSON: {}", service, e);
        AppError::external(StatusCode::BAD_GATEWAY, format!("{} returned invalid JSON", service))
    })
}
