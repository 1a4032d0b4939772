//! Domain models
//!
//! Records persisted by the service and the rules that govern them

pub mod business;
pub mod filing;
pub mod invitation;
pub mod reminder;
pub mod user;

pub use business::{Business, BusinessUpsert, CorpTypeInfo};
pub use filing::{Filing, FilingStatus, FilingViewContext, InvoiceDetails, NewFiling};
pub use invitation::{Invitation, InvitationStatus};
pub use reminder::{AnnualReportReminder, NewReminder, ReminderDecision, ReminderStatus, ReminderWindow};
pub use user::{NewUser, User};
