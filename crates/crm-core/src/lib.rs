//! CRM Core: domain models, error types and repository traits shared
//! by the store, the service layer and the server.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{CrmError, CrmResult};
