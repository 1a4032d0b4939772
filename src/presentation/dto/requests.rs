//! Request bodies and query strings

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AccountSearchQuery {
    pub name: Option<String>,
}

/// `POST /v1/business/auth`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEntityRequest {
    pub business_identifier: Option<String>,
}

/// `GET /v1/invitations`
#[derive(Debug, Default, Deserialize)]
pub struct InvitationSearchQuery {
    pub text: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// `PATCH /v1/internal/filings/{id}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteFilingRequest {
    #[serde(default)]
    pub colin_event_ids: Vec<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_bodies() {
        let request: AuthEntityRequest = serde_json::from_value(json!({"businessIdentifier": "BC0000001"})).unwrap();
        assert_eq!(request.business_identifier.as_deref(), Some("BC0000001"));

        let request: CompleteFilingRequest = serde_json::from_value(json!({"colinEventIds": [1, 2]})).unwrap();
        assert_eq!(request.colin_event_ids, vec![1, 2]);

        let request: CompleteFilingRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.colin_event_ids.is_empty());
    }
}
