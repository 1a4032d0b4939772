//! Business Annual Report filing service
//!
//! REST API for annual report filings of BC companies, plus the batch jobs
//! that remind businesses, sync them from the registry warehouse and push
//! paid filings to the corporate registry.

pub mod auth;
pub mod business;
pub mod infrastructure;
pub mod jobs;
pub mod presentation;
pub mod shared;

pub use infrastructure::{Config, Database};
pub use presentation::{create_routes, AppState};
pub use shared::{AppError, AppResult};
