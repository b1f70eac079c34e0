//! Domain models for the CRM.
//!
//! Organisation is the root aggregate. Agents, categories and leads
//! each carry the id of exactly one organisation.

pub mod agent;
pub mod category;
pub mod lead;
pub mod organisation;
pub mod profile;
pub mod user;
