//! Business domain model
//!
//! Local mirror of a registered company plus helpers over the registry's view of it

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::shared::types::BusinessId;
use crate::shared::utils::time::{parse_date, parse_timestamp};

/// Registry state of an active business
pub const ACTIVE_STATE: &str = "ACT";

/// Business record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Business {
    pub id: BusinessId,
    pub legal_name: String,
    pub legal_type: String,
    pub identifier: String,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub founding_date: DateTime<Utc>,
    pub last_ar_reminder_year: Option<i32>,
    pub ar_reminder_flag: bool,
    pub state: Option<String>,
    pub op_state: Option<String>,
    pub corp_class: Option<String>,
}

impl Business {
    /// Public JSON view
    pub fn json(&self) -> Value {
        json!({
            "legalName": self.legal_name,
            "legalType": self.legal_type,
            "identifier": self.identifier,
            "taxId": self.tax_id,
        })
    }

    /// Identifier as the corporate registry knows it
    pub fn colin_identifier(&self) -> &str {
        colin_identifier(&self.identifier)
    }

    pub fn is_active(&self) -> bool {
        self.state.as_deref() == Some(ACTIVE_STATE)
    }
}

/// Values written by the warehouse sync
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessUpsert {
    pub identifier: String,
    pub legal_name: String,
    pub legal_type: String,
    pub email: String,
    pub founding_date: DateTime<Utc>,
    pub ar_reminder_flag: bool,
    pub state: Option<String>,
    pub tax_id: Option<String>,
    pub corp_class: Option<String>,
}

/// Strips the `BC` prefix the registry API does not use
pub fn colin_identifier(identifier: &str) -> &str {
    identifier.strip_prefix("BC").unwrap_or(identifier)
}

/// First year an annual report is owed.
///
/// One year after the last annual report, else one year after founding, else -1.
pub fn next_ar_year(last_ar_date: Option<&str>, founding_date: Option<&str>) -> i32 {
    if let Some(date) = last_ar_date.and_then(parse_date) {
        return date.year() + 1;
    }
    if let Some(founded) = founding_date.and_then(parse_timestamp) {
        return founded.year() + 1;
    }
    -1
}

/// Adds derived fields to a registry business response (`{"business": {...}}`)
pub fn enrich_registry_business(details: &mut Value, invitation_email: Option<&str>, has_future_effective_filings: bool) {
    let Some(business) = details.get_mut("business").and_then(Value::as_object_mut) else {
        return;
    };

    let next_year = next_ar_year(
        business.get("lastArDate").and_then(Value::as_str),
        business.get("foundingDate").and_then(Value::as_str),
    );
    business.insert("nextARYear".to_string(), json!(next_year));

    if let Some(tax_id) = business.remove("businessNumber") {
        business.insert("taxId".to_string(), tax_id);
    }
    if let Some(email) = invitation_email {
        business.insert("invitationEmail".to_string(), json!(email));
    }
    business.insert("hasFutureEffectiveFilings".to_string(), json!(has_future_effective_filings));
}

/// Descriptive metadata for a corporation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpTypeInfo {
    pub code: &'static str,
    pub description: &'static str,
    pub act: &'static str,
}

const CORP_TYPES: &[CorpTypeInfo] = &[
    CorpTypeInfo { code: "BC", description: "BC Limited Company", act: "Business Corporations Act" },
    CorpTypeInfo { code: "C", description: "Continued In Business Corporation", act: "Business Corporations Act" },
    CorpTypeInfo { code: "ULC", description: "BC Unlimited Liability Company", act: "Business Corporations Act" },
    CorpTypeInfo { code: "CUL", description: "Continued In Unlimited Liability Company", act: "Business Corporations Act" },
    CorpTypeInfo { code: "CC", description: "BC Community Contribution Company", act: "Business Corporations Act" },
    CorpTypeInfo { code: "CCC", description: "Continued In Community Contribution Company", act: "Business Corporations Act" },
    CorpTypeInfo { code: "BEN", description: "BC Benefit Company", act: "Business Corporations Act" },
];

pub fn corp_type_info(code: &str) -> Option<CorpTypeInfo> {
    CORP_TYPES.iter().copied().find(|info| info.code.eq_ignore_ascii_case(code))
}
