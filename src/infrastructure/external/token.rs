//! OAuth client-credentials token fetcher

use axum::http::StatusCode;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, instrument};

use crate::infrastructure::config::ClientCredentials;
use crate::shared::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Fetches service-account tokens from the auth token endpoint
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: Client,
    token_url: String,
}

impl TokenClient {
    pub fn new(http: Client, token_url: &str) -> Self {
        Self { http, token_url: token_url.to_string() }
    }

    /// Exchanges the client id/secret for an access token
    #[instrument(skip(self, credentials), fields(client_id = %credentials.client_id))]
    pub async fn service_token(&self, credentials: &ClientCredentials) -> AppResult<String> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                error!("❌ token request failed: {}", e);
                unable_to_get_token()
            })?;

        let token = response
            .json::<TokenResponse>()
            .await
            .ok()
            .and_then(|body| body.access_token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                error!("❌ token endpoint returned no access_token");
                unable_to_get_token()
            })?;

        debug!("service token acquired");
        Ok(token)
    }
}

fn unable_to_get_token() -> AppError {
    AppError::external(StatusCode::INTERNAL_SERVER_ERROR, "Unable to get a token")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> ClientCredentials {
        ClientCredentials { client_id: "bar".to_string(), client_secret: "secret".to_string() }
    }

    #[tokio::test]
    async fn test_service_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header_exists("authorization"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "svc-token"
            })))
            .mount(&server)
            .await;

        let client = TokenClient::new(Client::new(), &format!("{}/token", server.uri()));
        assert_eq!(client.service_token(&credentials()).await.unwrap(), "svc-token");
    }

    #[tokio::test]
    async fn test_missing_token_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "nope"})))
            .mount(&server)
            .await;

        let client = TokenClient::new(Client::new(), &server.uri());
        let err = client.service_token(&credentials()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Unable to get a token");
    }
}
