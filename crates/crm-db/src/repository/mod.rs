//! SurrealDB repository implementations.

mod agent;
mod category;
mod lead;
mod organisation;
mod profile;
mod user;

use crm_core::repository::Repositories;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

pub use agent::SurrealAgentRepository;
pub use category::SurrealCategoryRepository;
pub use lead::SurrealLeadRepository;
pub use profile::SurrealUserProfileRepository;
pub use user::SurrealUserRepository;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

fn parse_optional_uuid(field: &str, value: Option<&str>) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(field, v)).transpose()
}

/// All SurrealDB repositories sharing one client.
#[derive(Clone)]
pub struct SurrealRepositories<C: Connection> {
    users: SurrealUserRepository<C>,
    profiles: SurrealUserProfileRepository<C>,
    agents: SurrealAgentRepository<C>,
    categories: SurrealCategoryRepository<C>,
    leads: SurrealLeadRepository<C>,
}

impl<C: Connection> SurrealRepositories<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            users: SurrealUserRepository::new(db.clone()),
            profiles: SurrealUserProfileRepository::new(db.clone()),
            agents: SurrealAgentRepository::new(db.clone()),
            categories: SurrealCategoryRepository::new(db.clone()),
            leads: SurrealLeadRepository::new(db),
        }
    }

    /// Same as [`SurrealRepositories::new`] but hashing passwords with
    /// a server-side pepper.
    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            users: SurrealUserRepository::with_pepper(db.clone(), pepper),
            ..Self::new(db)
        }
    }
}

impl<C: Connection> Repositories for SurrealRepositories<C> {
    type Users = SurrealUserRepository<C>;
    type Profiles = SurrealUserProfileRepository<C>;
    type Agents = SurrealAgentRepository<C>;
    type Categories = SurrealCategoryRepository<C>;
    type Leads = SurrealLeadRepository<C>;

    fn users(&self) -> &Self::Users {
        &self.users
    }

    fn profiles(&self) -> &Self::Profiles {
        &self.profiles
    }

    fn agents(&self) -> &Self::Agents {
        &self.agents
    }

    fn categories(&self) -> &Self::Categories {
        &self.categories
    }

    fn leads(&self) -> &Self::Leads {
        &self.leads
    }
}
