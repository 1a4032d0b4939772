//! User domain model
//!
//! Audit-only mirror of an external identity, created on first use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Claims;
use crate::shared::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub middlename: Option<String>,
    pub email: Option<String>,
    pub sub: Option<String>,
    pub iss: Option<String>,
    pub idp_userid: Option<String>,
    pub login_source: Option<String>,
    pub creation_date: DateTime<Utc>,
}

impl User {
    /// Human readable name.
    ///
    /// Joins the non-empty name parts; otherwise derives it from the username,
    /// dropping IDIR decorations. BC Services Card usernames have no display name.
    pub fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.firstname, &self.middlename, &self.lastname]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if !parts.is_empty() {
            return Some(parts.join(" "));
        }

        let username = self.username.as_deref()?;
        let lower = username.to_lowercase();
        if lower.starts_with("idir\\") {
            username.get(5..).map(str::to_string)
        } else if lower.ends_with("@idir") {
            username.get(..username.len() - 5).map(str::to_string)
        } else if lower.starts_with("bcsc") {
            None
        } else {
            Some(username.to_string())
        }
    }

    /// "first last" as certified on filings
    pub fn certified_name(&self) -> String {
        let first = self.firstname.as_deref().unwrap_or_default();
        let last = self.lastname.as_deref().unwrap_or_default();
        let joined = format!("{first} {last}");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            self.display_name().unwrap_or_default()
        } else {
            trimmed.to_string()
        }
    }
}

/// Fields captured when a user is first seen
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub sub: String,
    pub iss: String,
    pub idp_userid: String,
    pub login_source: Option<String>,
}

impl NewUser {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            username: claims.username.clone(),
            firstname: claims.firstname.clone(),
            lastname: claims.lastname.clone(),
            email: claims.email.clone(),
            sub: claims.sub.clone(),
            iss: claims.iss.clone(),
            idp_userid: claims.idp_userid().to_string(),
            login_source: claims.login_source.clone(),
        }
    }
}
