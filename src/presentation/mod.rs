//! Presentation layer
//!
//! HTTP handlers, routing and request/response types

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::{create_routes, AppState};
