//! Staff invitation search and expiry

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument};

use crate::business::domain::InvitationStatus;
use crate::infrastructure::database::InvitationSearch;
use crate::infrastructure::Database;
use crate::shared::types::{InvitationId, Page, PaginationParams};
use crate::shared::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct InvitationService {
    database: Database,
}

pub type SharedInvitationService = Arc<InvitationService>;

impl InvitationService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Newest-first page of invitations, each merged with its business view
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        text: Option<String>,
        status: Option<&str>,
        params: PaginationParams,
    ) -> AppResult<Page<Value>> {
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                InvitationStatus::parse(raw)
                    .ok_or_else(|| AppError::invalid(format!("Unknown invitation status: {}", raw)))?,
            ),
            None => None,
        };
        let search = InvitationSearch {
            text: text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            status,
        };
        info!("🔍 search invitations: {:?}, {:?}", search.text, search.status);

        let (rows, total) = self.database.invitations.search(&search, params).await?;
        Ok(Page::new(params, rows.iter().map(|row| row.json()).collect(), total))
    }

    /// Expires the invitation; expiring an expired invitation changes nothing
    #[instrument(skip(self))]
    pub async fn expire(&self, id: InvitationId) -> AppResult<()> {
        let mut invitation = self
            .database
            .invitations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Invitation not found.".to_string()))?;

        if invitation.expire(Utc::now()) {
            self.database.invitations.update_status(&invitation).await?;
            info!("⌛ invitation {} expired", id);
        }
        Ok(())
    }
}
