//! Batch jobs run from the command line

pub mod ar_reminder;
pub mod business_sync;
pub mod process_paid_filings;

pub use ar_reminder::{LiveReminders, ReminderBackend, ReminderRunSummary};
pub use process_paid_filings::{PaidFilingProcessor, PaidFilingSummary};
