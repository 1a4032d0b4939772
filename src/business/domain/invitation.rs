//! Invitation domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::business::domain::filing::UnknownStatus;
use crate::shared::types::{BusinessId, InvitationId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvitationStatus {
    Draft,
    Sent,
    Expired,
    Deleted,
    Completed,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Draft => "DRAFT",
            InvitationStatus::Sent => "SENT",
            InvitationStatus::Expired => "EXPIRED",
            InvitationStatus::Deleted => "DELETED",
            InvitationStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(InvitationStatus::Draft),
            "SENT" => Some(InvitationStatus::Sent),
            "EXPIRED" => Some(InvitationStatus::Expired),
            "DELETED" => Some(InvitationStatus::Deleted),
            "COMPLETED" => Some(InvitationStatus::Completed),
            _ => None,
        }
    }
}

impl TryFrom<String> for InvitationStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        InvitationStatus::parse(&value).ok_or(UnknownStatus(value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Invitation {
    pub id: InvitationId,
    pub recipients: String,
    pub message: Option<String>,
    pub sent_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub token: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: InvitationStatus,
    pub additional_message: Option<String>,
    pub business_id: BusinessId,
}

impl Invitation {
    pub fn json(&self) -> Value {
        json!({
            "invitationId": self.id,
            "recipients": self.recipients,
            "status": self.status.as_str(),
            "sentDate": self.sent_date.map(|d| d.to_rfc3339()),
            "message": self.message,
        })
    }

    /// Moves to EXPIRED. Returns false when the invitation already was.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == InvitationStatus::Expired {
            return false;
        }
        self.status = InvitationStatus::Expired;
        self.expiration_date = Some(now);
        true
    }

    pub fn is_sent(&self) -> bool {
        self.status == InvitationStatus::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sent() -> Invitation {
        Invitation {
            id: 5,
            recipients: "owner@example.com".into(),
            message: Some("Please file".into()),
            sent_date: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            expiration_date: None,
            token: Some("abc".into()),
            status: InvitationStatus::Sent,
            additional_message: None,
            business_id: 1,
        }
    }

    #[test]
    fn test_expire_is_idempotent() {
        let mut invitation = sent();
        let first = Utc::now();
        assert!(invitation.expire(first));
        assert_eq!(invitation.status, InvitationStatus::Expired);
        assert_eq!(invitation.expiration_date, Some(first));

        assert!(!invitation.expire(first + Duration::days(1)));
        assert_eq!(invitation.expiration_date, Some(first));
    }

    #[test]
    fn test_json_view() {
        let value = sent().json();
        assert_eq!(value["invitationId"], 5);
        assert_eq!(value["status"], "SENT");
        assert_eq!(value["sentDate"], "2024-01-02T03:04:05+00:00");
    }
}
