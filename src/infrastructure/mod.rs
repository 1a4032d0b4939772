//! Infrastructure layer
//!
//! Persistence, sibling-service clients and configuration

pub mod config;
pub mod database;
pub mod external;

pub use config::Config;
pub use database::{Database, DatabaseError};
pub use external::ServiceClients;
