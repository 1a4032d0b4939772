//! Data transfer objects for the HTTP layer

pub mod requests;
pub mod responses;

pub use requests::*;
pub use responses::*;
