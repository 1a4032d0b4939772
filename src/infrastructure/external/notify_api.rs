//! notify-api client

use axum::http::StatusCode;
use reqwest::Client;
use serde_json::Value;
use tracing::{error, info, instrument};

use super::{status_of, transport_error};
use crate::shared::{AppError, AppResult};

const SERVICE: &str = "notify-api";

#[derive(Debug, Clone)]
pub struct NotifyApiClient {
    http: Client,
    url: String,
}

impl NotifyApiClient {
    pub fn new(http: Client, url: &str) -> Self {
        Self { http, url: url.to_string() }
    }

    /// Delivers an email request; anything but 200 is an error
    #[instrument(skip(self, token, email))]
    pub async fn send(&self, token: &str, email: &Value) -> AppResult<()> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(token)
            .json(email)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::SERVICE_UNAVAILABLE, e))?;

        let status = status_of(&response);
        if status != StatusCode::OK {
            error!("❌ notify-api answered {}", status);
            return Err(AppError::external(
                if status.is_success() { StatusCode::BAD_GATEWAY } else { status },
                "Unsuccessful response when sending email.",
            ));
        }

        info!("📧 email queued for {}", email.get("recipients").and_then(serde_json::Value::as_str).unwrap_or("-"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"recipients": "a@b.ca"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notify = NotifyApiClient::new(Client::new(), &format!("{}/notify/", server.uri()));
        notify
            .send("svc", &json!({"recipients": "a@b.ca", "content": {"body": "hi"}}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_rejects_non_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let notify = NotifyApiClient::new(Client::new(), &server.uri());
        let err = notify.send("svc", &json!({})).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
