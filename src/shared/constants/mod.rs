//! Constant definitions

/// Realm roles carried in the bearer token
pub mod roles {
    pub const EDIT: &str = "edit";
    pub const PUBLIC_USER: &str = "public_user";
    pub const ACCOUNT_HOLDER: &str = "account_holder";
    pub const MANAGE_ACCOUNTS: &str = "manage_accounts";
    pub const SYSTEM: &str = "system";
    pub const STAFF: &str = "staff";
}

/// Filing-related constants
pub mod filing {
    /// Name of the only filing this service accepts
    pub const ANNUAL_REPORT: &str = "annualReport";
    /// Fee code sent to the payment service
    pub const FILING_TYPE_CODE: &str = "BCANN";
    /// Source marker for filings pushed to the registry
    pub const SOURCE: &str = "BAR";
}

/// Document and report types
pub mod reports {
    pub const RECEIPT: &str = "receipt";
    pub const ANNUAL_REPORT: &str = "annualReport";
}

/// Invitation search pagination
pub mod pagination {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 500;
}

/// Batch job constants
pub mod jobs {
    /// Size of the founding-date anniversary window in days
    pub const REMINDER_WINDOW_DAYS: i64 = 14;
    /// Maximum businesses reminded per run
    pub const REMINDER_BATCH_SIZE: i64 = 25;
    /// Maximum corporations synced from the warehouse per run
    pub const SYNC_BATCH_SIZE: i64 = 5;
    /// Email placeholder outside production
    pub const NON_PROD_EMAIL: &str = "test@email.com";
}

/// Email constants
pub mod notification {
    pub const REQUEST_BY: &str = "BCRegistries@gov.bc.ca";
    pub const PAID_TEMPLATE: &str = "BC-AR-PAID.html";
    pub const REMINDER_TEMPLATE: &str = "ar_reminder.html";
    pub const REMINDER_SUBJECT: &str = "Annual Report Reminder";
    pub const REPORT_TEMPLATE: &str = "bcAnnualReport.html";
}

/// HTTP related constants
pub mod http {
    /// Upper bound for one inbound request, report rendering included
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 120;
    pub const ACCOUNT_ID_HEADER: &str = "Account-Id";
}
