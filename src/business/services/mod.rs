//! Business services
//!
//! Each service owns one slice of the annual report workflow and talks to the
//! repositories and sibling HTTP services through `Database` and `ServiceClients`.

pub mod account_service;
pub mod business_service;
pub mod filing_service;
pub mod invitation_service;
pub mod notification_service;
pub mod report_service;
pub mod schema_service;
pub mod template;

pub use account_service::{AccountService, SharedAccountService};
pub use business_service::{BusinessService, SharedBusinessService};
pub use filing_service::{FilingService, FilingSubmission, SharedFilingService};
pub use invitation_service::{InvitationService, SharedInvitationService};
pub use notification_service::{NotificationService, SharedNotificationService};
pub use report_service::{Document, ReportService, SharedReportService};
pub use schema_service::{SchemaName, SchemaService};

use std::sync::Arc;

use crate::infrastructure::{Config, Database, ServiceClients};
use crate::shared::AppResult;

/// Every service, wired once from configuration
#[derive(Debug, Clone)]
pub struct Services {
    pub clients: ServiceClients,
    pub accounts: AccountService,
    pub businesses: BusinessService,
    pub filings: FilingService,
    pub invitations: InvitationService,
    pub reports: ReportService,
    pub notifications: NotificationService,
}

impl Services {
    pub fn new(config: Arc<Config>, database: Database) -> AppResult<Self> {
        let clients = ServiceClients::new(&config)?;
        let schemas = Arc::new(SchemaService::new()?);

        let filings = FilingService::new(database.clone(), clients.clone(), schemas.clone(), config.clone());
        let businesses = BusinessService::new(database.clone(), clients.clone(), filings.clone());
        let reports = ReportService::new(filings.clone(), businesses.clone(), clients.clone(), config.clone());
        let notifications = NotificationService::new(
            database.clone(),
            clients.clone(),
            filings.clone(),
            reports.clone(),
            config,
        );

        Ok(Self {
            accounts: AccountService::new(clients.clone(), schemas),
            invitations: InvitationService::new(database),
            clients,
            businesses,
            filings,
            reports,
            notifications,
        })
    }
}
