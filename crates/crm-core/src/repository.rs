//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Organisation-scoped
//! repositories take an `organisation_id` on every read and write so
//! that a record of another organisation behaves as if it did not
//! exist.

use uuid::Uuid;

use crate::error::CrmResult;
use crate::models::{
    agent::{Agent, CreateAgent, UpdateAgent},
    category::{Category, CreateCategory, UpdateCategory},
    lead::{CreateLead, Lead, LeadFilter, UpdateLead},
    organisation::{CreateOrganisation, OrganisorAccount},
    profile::UserProfile,
    user::{CreateUser, User},
};

// ---------------------------------------------------------------------------
// Accounts (global scope)
// ---------------------------------------------------------------------------

/// User accounts. Accounts are only ever created together with the
/// record that gives them a role, in a single transaction.
pub trait UserRepository: Send + Sync {
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CrmResult<User>> + Send;
    fn get_by_username(&self, username: &str) -> impl Future<Output = CrmResult<User>> + Send;
    /// Create an organisor, its organisation and the profile linking
    /// them. Either all three records exist afterwards or none does.
    fn create_organisor(
        &self,
        user: CreateUser,
        organisation: CreateOrganisation,
    ) -> impl Future<Output = CrmResult<OrganisorAccount>> + Send;
    /// Create an agent user and its agent record atomically.
    fn create_agent(
        &self,
        user: CreateUser,
        agent: CreateAgent,
    ) -> impl Future<Output = CrmResult<Agent>> + Send;
}

pub trait UserProfileRepository: Send + Sync {
    /// The profile owned by a user, if the user is an organisor.
    fn get_by_user(&self, user_id: Uuid) -> impl Future<Output = CrmResult<UserProfile>> + Send;
}

// ---------------------------------------------------------------------------
// Organisation-scoped repositories
// ---------------------------------------------------------------------------

pub trait AgentRepository: Send + Sync {
    fn get_by_id(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CrmResult<Agent>> + Send;
    /// The agent record attached to a user account. Used to resolve
    /// the organisation of an authenticated agent.
    fn get_by_user(&self, user_id: Uuid) -> impl Future<Output = CrmResult<Agent>> + Send;
    fn update(
        &self,
        organisation_id: Uuid,
        id: Uuid,
        input: UpdateAgent,
    ) -> impl Future<Output = CrmResult<Agent>> + Send;
    /// Delete the agent and its user account, and clear it from every
    /// lead it was assigned to, in one transaction.
    fn delete(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CrmResult<()>> + Send;
    fn list(&self, organisation_id: Uuid) -> impl Future<Output = CrmResult<Vec<Agent>>> + Send;
}

pub trait CategoryRepository: Send + Sync {
    fn create(&self, input: CreateCategory) -> impl Future<Output = CrmResult<Category>> + Send;
    fn get_by_id(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CrmResult<Category>> + Send;
    fn update(
        &self,
        organisation_id: Uuid,
        id: Uuid,
        input: UpdateCategory,
    ) -> impl Future<Output = CrmResult<Category>> + Send;
    /// Delete the category and clear it from every lead filed under it.
    fn delete(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CrmResult<()>> + Send;
    fn list(
        &self,
        organisation_id: Uuid,
    ) -> impl Future<Output = CrmResult<Vec<Category>>> + Send;
}

pub trait LeadRepository: Send + Sync {
    fn create(&self, input: CreateLead) -> impl Future<Output = CrmResult<Lead>> + Send;
    fn get_by_id(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CrmResult<Lead>> + Send;
    /// All leads matching the filter, oldest first.
    fn find_all(&self, filter: LeadFilter) -> impl Future<Output = CrmResult<Vec<Lead>>> + Send;
    fn count(&self, filter: LeadFilter) -> impl Future<Output = CrmResult<u64>> + Send;
    fn update(
        &self,
        organisation_id: Uuid,
        id: Uuid,
        input: UpdateLead,
    ) -> impl Future<Output = CrmResult<Lead>> + Send;
    /// Set or clear the assigned agent of a lead matching `scope`.
    ///
    /// The scope check, the check that the agent belongs to the scope's
    /// organisation and the write happen in one transaction. A lead
    /// outside the scope is `NotFound`; a foreign or deleted agent is a
    /// `Validation` error.
    fn set_agent(
        &self,
        scope: LeadFilter,
        id: Uuid,
        agent_id: Option<Uuid>,
    ) -> impl Future<Output = CrmResult<Lead>> + Send;
    /// Set or clear the category of a lead matching `scope`, with the
    /// same guarantees as [`LeadRepository::set_agent`].
    fn set_category(
        &self,
        scope: LeadFilter,
        id: Uuid,
        category_id: Option<Uuid>,
    ) -> impl Future<Output = CrmResult<Lead>> + Send;
    fn delete(
        &self,
        organisation_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CrmResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Store bundle
// ---------------------------------------------------------------------------

/// Every repository the service layer needs, behind one handle.
///
/// Services are generic over this trait so they have no dependency on
/// the database crate.
pub trait Repositories: Send + Sync {
    type Users: UserRepository;
    type Profiles: UserProfileRepository;
    type Agents: AgentRepository;
    type Categories: CategoryRepository;
    type Leads: LeadRepository;

    fn users(&self) -> &Self::Users;
    fn profiles(&self) -> &Self::Profiles;
    fn agents(&self) -> &Self::Agents;
    fn categories(&self) -> &Self::Categories;
    fn leads(&self) -> &Self::Leads;
}
