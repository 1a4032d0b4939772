//! Paid filing processor
//!
//! Pushes PAID filings to the corporate registry through this service's
//! internal endpoints, then completes them and triggers the confirmation
//! email. Once a filing of a corporation fails, the rest of that
//! corporation's filings wait for the next run.

use std::collections::HashSet;

use axum::http::StatusCode;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::infrastructure::external::{read_json, status_of, transport_error, ColinApiClient};
use crate::shared::constants::filing::SOURCE;
use crate::shared::utils::{clean_none, str_at};
use crate::shared::{AppError, AppResult};

const SERVICE: &str = "business-ar-api";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PaidFilingSummary {
    pub completed: Vec<i64>,
    pub failed: Vec<i64>,
    pub skipped: Vec<i64>,
}

pub struct PaidFilingProcessor {
    http: Client,
    api_url: String,
    colin: ColinApiClient,
}

impl PaidFilingProcessor {
    /// `api_url` is this service's `/v1` root
    pub fn new(http: Client, api_url: &str, colin: ColinApiClient) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            colin,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> AppResult<PaidFilingSummary> {
        let token = self.colin.service_token().await?;
        let filings = self.paid_filings(&token).await?;
        if filings.is_empty() {
            debug!("no paid filings to send to COLIN");
        }

        let mut failed_corps: HashSet<String> = HashSet::new();
        let mut summary = PaidFilingSummary::default();

        for mut filing in filings {
            let filing_id = filing["filing"]["header"]["id"].as_i64().unwrap_or_default();
            let identifier = str_at(&filing, "filing.business.identifier").unwrap_or_default().to_string();

            if failed_corps.contains(&identifier) {
                debug!("skipping filing {} for {}", filing_id, identifier);
                summary.skipped.push(filing_id);
                continue;
            }

            prepare_for_registry(&mut filing);
            match self.send_filing(&token, &filing).await {
                Ok(colin_ids) => {
                    info!("✅ filed {}, COLIN ids {:?}", filing_id, colin_ids);
                    self.complete_filing(&token, filing_id, &colin_ids).await;
                    self.send_email(&token, filing_id).await;
                    summary.completed.push(filing_id);
                }
                Err(e) => {
                    error!("❌ filing {} not created in COLIN for {}: {}", filing_id, identifier, e);
                    failed_corps.insert(identifier);
                    summary.failed.push(filing_id);
                }
            }
        }
        Ok(summary)
    }

    async fn paid_filings(&self, token: &str) -> AppResult<Vec<Value>> {
        let response = self
            .http
            .get(format!("{}/internal/filings/paid", self.api_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, StatusCode::SERVICE_UNAVAILABLE, e))?;
        let body = read_json(SERVICE, response).await?;
        Ok(body
            .get("filings")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_filing(&self, token: &str, filing: &Value) -> AppResult<Vec<i64>> {
        let (Some(name), Some(identifier), Some(legal_type)) = (
            str_at(filing, "filing.header.name"),
            str_at(filing, "filing.business.identifier"),
            str_at(filing, "filing.business.legalType"),
        ) else {
            return Err(AppError::invalid("filing is missing its name, identifier or legal type"));
        };

        let body = self.colin.post_filing(token, legal_type, identifier, name, filing).await?;
        let colin_ids: Vec<i64> = body["filing"]["header"]["colinIds"]
            .as_array()
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default();
        if colin_ids.is_empty() {
            return Err(AppError::external(StatusCode::BAD_GATEWAY, "COLIN returned no event ids"));
        }
        Ok(colin_ids)
    }

    async fn complete_filing(&self, token: &str, filing_id: i64, colin_ids: &[i64]) {
        let result = self
            .http
            .patch(format!("{}/internal/filings/{}", self.api_url, filing_id))
            .bearer_auth(token)
            .json(&json!({ "colinEventIds": colin_ids }))
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => error!("❌ failed to complete filing {} with COLIN ids {:?}: {}", filing_id, colin_ids, status_of(&response)),
            Err(e) => error!("❌ failed to complete filing {} with COLIN ids {:?}: {}", filing_id, colin_ids, e),
        }
    }

    async fn send_email(&self, token: &str, filing_id: i64) {
        let result = self
            .http
            .post(format!("{}/internal/filings/{}/notify", self.api_url, filing_id))
            .bearer_auth(token)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => warn!("failed to send email for filing {}: {}", filing_id, status_of(&response)),
            Err(e) => warn!("failed to send email for filing {}: {}", filing_id, e),
        }
    }
}

/// Header fields COLIN expects, with nulls blanked
pub fn prepare_for_registry(filing: &mut Value) {
    let header = &mut filing["filing"]["header"];
    let certified_by = header.get("certifiedByDisplayName").cloned().unwrap_or(Value::Null);

    header["learEffectiveDate"] = header.get("filingDateTime").cloned().unwrap_or(Value::Null);
    header["certifiedBy"] = certified_by.clone();
    header["submitter"] = certified_by;
    header["source"] = json!(SOURCE);

    clean_none(filing);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::ClientCredentials;
    use crate::infrastructure::external::TokenClient;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn paid_filing(id: i64, identifier: &str) -> Value {
        json!({"filing": {
            "header": {
                "id": id,
                "name": "annualReport",
                "filingDateTime": "2024-03-01T18:30:00+00:00",
                "certifiedByDisplayName": "Jane Doe",
                "completionDate": null
            },
            "business": {"identifier": identifier, "legalType": "BC"},
            "annualReport": {"annualReportDate": "2024-03-01"}
        }})
    }

    async fn processor(server: &MockServer) -> PaidFilingProcessor {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "colin"})))
            .mount(server)
            .await;

        let http = Client::new();
        let tokens = TokenClient::new(http.clone(), &format!("{}/token", server.uri()));
        let colin = ColinApiClient::new(http.clone(), &format!("{}/colin", server.uri()), tokens, ClientCredentials::default());
        PaidFilingProcessor::new(http, &format!("{}/v1", server.uri()), colin)
    }

    #[test]
    fn test_prepare_for_registry() {
        let mut filing = paid_filing(1, "BC0000001");
        prepare_for_registry(&mut filing);
        let header = &filing["filing"]["header"];
        assert_eq!(header["learEffectiveDate"], "2024-03-01T18:30:00+00:00");
        assert_eq!(header["certifiedBy"], "Jane Doe");
        assert_eq!(header["submitter"], "Jane Doe");
        assert_eq!(header["source"], "BAR");
        assert_eq!(header["completionDate"], "");
    }

    #[tokio::test]
    async fn test_completes_filed_and_skips_failed_corporation() {
        let server = MockServer::start().await;
        let processor = processor(&server).await;

        Mock::given(method("GET"))
            .and(path("/v1/internal/filings/paid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"filings": [
                paid_filing(1, "BC0000001"),
                paid_filing(2, "BC0000002"),
                paid_filing(3, "BC0000001"),
            ]})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/colin/businesses/BC/BC0000001/filings/annualReport"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/colin/businesses/BC/BC0000002/filings/annualReport"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "filing": {"header": {"colinIds": [501]}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/v1/internal/filings/2"))
            .and(body_json(json!({"colinEventIds": [501]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/internal/filings/2/notify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let summary = processor.run().await.unwrap();
        assert_eq!(summary.completed, vec![2]);
        assert_eq!(summary.failed, vec![1]);
        assert_eq!(summary.skipped, vec![3]);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_run() {
        let server = MockServer::start().await;
        let processor = processor(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/internal/filings/paid"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        assert!(processor.run().await.is_err());
    }
}
