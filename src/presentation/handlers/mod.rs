//! HTTP request handlers

pub mod accounts;
pub mod business;
pub mod filings;
pub mod health;
pub mod internal;
pub mod invitations;
pub mod users;
