//! pay-api client: invoices and receipts

use axum::http::StatusCode;
use bytes::Bytes;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};

use super::{read_json, status_of, transport_error};
use crate::business::domain::InvoiceDetails;
use crate::shared::constants::{filing, http};
use crate::shared::{AppError, AppResult};

const SERVICE: &str = "pay-api";

/// Receipt request body
#[derive(Debug, Clone)]
pub struct ReceiptRequest {
    pub corp_name: String,
    pub filing_date_time: String,
    pub filing_identifier: String,
    pub business_number: Option<String>,
}

impl ReceiptRequest {
    fn json(&self) -> Value {
        let mut payload = json!({
            "corpName": self.corp_name,
            "filingDateTime": self.filing_date_time,
            "effectiveDateTime": "",
            "filingIdentifier": self.filing_identifier,
        });
        if let Some(number) = self.business_number.as_deref().filter(|n| !n.is_empty()) {
            payload["businessNumber"] = Value::String(number.to_string());
        }
        payload
    }
}

#[derive(Debug, Clone)]
pub struct PayApiClient {
    http: Client,
    base_url: String,
}

impl PayApiClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string() }
    }

    /// Creates the annual report invoice. Any failure surfaces as 402.
    #[instrument(skip(self, user_token, business))]
    pub async fn create_invoice(&self, account_id: &str, user_token: &str, business: &Value) -> AppResult<InvoiceDetails> {
        let payload = invoice_payload(business);

        let response = self
            .http
            .post(format!("{}/payment-requests", self.base_url))
            .bearer_auth(user_token)
            .header(http::ACCOUNT_ID_HEADER, account_id)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::PAYMENT_REQUIRED, e))?;

        let status = status_of(&response);
        let body: Value = response.json().await.unwrap_or(Value::Null);

        let accepted = matches!(status, StatusCode::OK | StatusCode::CREATED)
            && body.get("id").map(|id| !id.is_null()).unwrap_or(false);
        if !accepted {
            let message = format!("{} - {}", status.as_u16(), body);
            debug!("invalid response from pay-api: {}", message);
            return Err(AppError::PaymentRequired(message));
        }

        let invoice: InvoiceDetails = serde_json::from_value(body).map_err(|e| {
            error!("❌ unexpected invoice body: {}", e);
            AppError::PaymentRequired(format!("unexpected invoice response: {}", e))
        })?;

        info!("💳 invoice {:?} created ({})", invoice.id, invoice.status_code.as_deref().unwrap_or("-"));
        Ok(invoice)
    }

    #[instrument(skip(self, token))]
    pub async fn payment_details(&self, token: &str, invoice_id: i64) -> AppResult<Value> {
        let response = self
            .http
            .get(format!("{}/payment-requests/{}", self.base_url, invoice_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::SERVICE_UNAVAILABLE, e))?;
        read_json(SERVICE, response).await
    }

    /// Typed invoice read used by the payment refresh
    pub async fn invoice(&self, token: &str, invoice_id: i64) -> AppResult<InvoiceDetails> {
        let body = self.payment_details(token, invoice_id).await?;
        serde_json::from_value(body).map_err(|e| {
            AppError::external(StatusCode::BAD_GATEWAY, format!("unexpected invoice response: {}", e))
        })
    }

    /// Receipt PDF for an invoice; pay-api answers 201 on success
    #[instrument(skip(self, token, request))]
    pub async fn receipt(&self, token: &str, invoice_id: i64, request: &ReceiptRequest) -> AppResult<Bytes> {
        let response = self
            .http
            .post(format!("{}/payment-requests/{}/receipts", self.base_url, invoice_id))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/pdf")
            .json(&request.json())
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::SERVICE_UNAVAILABLE, e))?;

        let status = status_of(&response);
        if !status.is_success() {
            error!("❌ failed to get receipt pdf for invoice {}: {}", invoice_id, status);
            return Err(AppError::external(status, format!("Failed to get receipt for invoice {}", invoice_id)));
        }

        response
            .bytes()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::BAD_GATEWAY, e))
    }
}

/// Invoice request for the business JSON view `{identifier, legalType, ...}`
pub fn invoice_payload(business: &Value) -> Value {
    let mut payload = json!({
        "filingInfo": {"filingTypes": [{"filingTypeCode": filing::FILING_TYPE_CODE}]},
        "businessInfo": {},
    });

    if let Some(identifier) = business.get("identifier").and_then(Value::as_str) {
        payload["details"] = json!([{"label": "Incorporation Number: ", "value": identifier}]);
        payload["businessInfo"]["businessIdentifier"] = Value::String(identifier.to_string());
        payload["businessInfo"]["corpType"] = business.get("legalType").cloned().unwrap_or(Value::Null);
    }

    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_invoice_payload() {
        let payload = invoice_payload(&json!({"identifier": "BC0000001", "legalType": "BC"}));
        assert_eq!(payload["filingInfo"]["filingTypes"][0]["filingTypeCode"], "BCANN");
        assert_eq!(payload["details"][0]["value"], "BC0000001");
        assert_eq!(payload["businessInfo"]["corpType"], "BC");

        let bare = invoice_payload(&json!({}));
        assert!(bare.get("details").is_none());
    }

    #[tokio::test]
    async fn test_create_invoice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment-requests"))
            .and(header("Account-Id", "123"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 77,
                "statusCode": "CREATED",
                "paymentAccount": {"accountId": "123"}
            })))
            .mount(&server)
            .await;

        let pay = PayApiClient::new(Client::new(), &server.uri());
        let invoice = pay
            .create_invoice("123", "user", &json!({"identifier": "BC0000001", "legalType": "BC"}))
            .await
            .unwrap();
        assert_eq!(invoice.id, Some(77));
        assert_eq!(invoice.status_code.as_deref(), Some("CREATED"));
    }

    #[tokio::test]
    async fn test_create_invoice_failure_is_payment_required() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"type": "INVALID_ACCOUNT"})))
            .mount(&server)
            .await;

        let pay = PayApiClient::new(Client::new(), &server.uri());
        let err = pay.create_invoice("1", "user", &json!({})).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_receipt_returns_pdf_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment-requests/77/receipts"))
            .and(header("accept", "application/pdf"))
            .respond_with(ResponseTemplate::new(201).set_body_bytes(b"%PDF-1.4".to_vec()))
            .mount(&server)
            .await;

        let pay = PayApiClient::new(Client::new(), &server.uri());
        let request = ReceiptRequest {
            corp_name: "Acme Ltd.".to_string(),
            filing_date_time: "2024-01-01T00:00:00+00:00".to_string(),
            filing_identifier: "5".to_string(),
            business_number: None,
        };
        let pdf = pay.receipt("svc", 77, &request).await.unwrap();
        assert_eq!(&pdf[..], b"%PDF-1.4");
    }
}
