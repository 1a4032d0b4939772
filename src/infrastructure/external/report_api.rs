//! report-api client: renders an HTML template into a PDF

use axum::http::StatusCode;
use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use tracing::{error, instrument};

use super::{status_of, transport_error};
use crate::shared::{AppError, AppResult};

const SERVICE: &str = "report-api";

#[derive(Debug, Clone)]
pub struct ReportApiClient {
    http: Client,
    url: String,
}

impl ReportApiClient {
    pub fn new(http: Client, url: &str) -> Self {
        Self { http, url: url.to_string() }
    }

    /// Posts `{reportName, template, templateVars}` and returns the PDF
    #[instrument(skip(self, token, request))]
    pub async fn render(&self, token: &str, request: &Value) -> AppResult<Bytes> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::SERVICE_UNAVAILABLE, e))?;

        let status = status_of(&response);
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!("❌ report-api answered {}: {}", status, body);
            return Err(AppError::external(
                if status.is_success() { StatusCode::BAD_GATEWAY } else { status },
                body,
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::BAD_GATEWAY, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_render_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad template"))
            .mount(&server)
            .await;

        let report = ReportApiClient::new(Client::new(), &server.uri());
        let err = report.render("t", &json!({})).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "bad template");
    }
}
