//! Shared module
//!
//! Types, error handling and helpers used across layers

pub mod error;
pub mod types;
pub mod utils;
pub mod constants;

pub use error::{AppError, AppResult};
pub use types::{BusinessId, FilingId, InvitationId, Page, PaginationParams, UserId};
