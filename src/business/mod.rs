//! Business layer
//!
//! Domain records with their rules, and the services that orchestrate them

pub mod domain;
pub mod services;

pub use domain::*;
pub use services::*;
