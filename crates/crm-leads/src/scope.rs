//! Organisation and role scoping of reads.
//!
//! Every lead a principal can observe passes through [`lead_scope`].
//! Anything outside that scope is reported exactly like a lead that
//! does not exist.

use crm_core::error::{CrmError, CrmResult};
use crm_core::models::category::Category;
use crm_core::models::lead::{Lead, LeadFilter, RefFilter};
use crm_core::repository::{CategoryRepository, LeadRepository, Repositories};
use serde::Serialize;
use uuid::Uuid;

use crate::role::{Principal, Role, resolve_role};

/// The leads a role may observe at all.
pub fn lead_scope(role: &Role) -> LeadFilter {
    let filter = LeadFilter::organisation(role.organisation_id());
    match role {
        Role::Organisor { .. } => filter,
        Role::Agent { agent_id, .. } => filter.with_agent(RefFilter::Equals(*agent_id)),
    }
}

/// The "assigned" half of a lead listing.
fn assigned_scope(role: &Role) -> LeadFilter {
    match role {
        Role::Organisor { .. } => lead_scope(role).with_agent(RefFilter::IsSet),
        Role::Agent { .. } => lead_scope(role),
    }
}

/// Leads visible to a role, split by assignment.
///
/// `unassigned` is always empty for agents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeadListing {
    pub assigned: Vec<Lead>,
    pub unassigned: Vec<Lead>,
}

impl LeadListing {
    pub fn len(&self) -> usize {
        self.assigned.len() + self.unassigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lead> {
        self.assigned.iter().chain(self.unassigned.iter())
    }
}

/// Categories of the caller's organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryListing {
    pub categories: Vec<Category>,
    /// Leads of the organisation that have no category.
    pub uncategorised_lead_count: u64,
}

/// A category and the visible leads filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDetail {
    pub category: Category,
    pub leads: Vec<Lead>,
}

/// Read-side service that applies role scoping to every query.
#[derive(Clone)]
pub struct ScopedQueryService<S> {
    store: S,
}

impl<S: Repositories> ScopedQueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve the principal's role against the store.
    pub async fn resolve(&self, principal: &Principal) -> CrmResult<Role> {
        resolve_role(&self.store, principal).await
    }

    /// List the leads the principal may see.
    pub async fn list_leads(&self, principal: &Principal) -> CrmResult<LeadListing> {
        let role = self.resolve(principal).await?;
        self.leads_for(&role).await
    }

    pub async fn leads_for(&self, role: &Role) -> CrmResult<LeadListing> {
        let assigned = self.store.leads().find_all(assigned_scope(role)).await?;

        let unassigned = match role {
            Role::Organisor { .. } => {
                self.store
                    .leads()
                    .find_all(lead_scope(role).with_agent(RefFilter::IsNull))
                    .await?
            }
            Role::Agent { .. } => Vec::new(),
        };

        Ok(LeadListing {
            assigned,
            unassigned,
        })
    }

    /// Fetch one lead if it is within the principal's scope.
    pub async fn get_lead(&self, principal: &Principal, lead_id: Uuid) -> CrmResult<Lead> {
        let role = self.resolve(principal).await?;
        self.lead_for(&role, lead_id).await
    }

    /// Fetch a lead for an already resolved role. Leads of other
    /// organisations and, for agents, leads assigned elsewhere are
    /// reported as not found.
    pub async fn lead_for(&self, role: &Role, lead_id: Uuid) -> CrmResult<Lead> {
        let lead = self
            .store
            .leads()
            .get_by_id(role.organisation_id(), lead_id)
            .await?;

        if lead_scope(role).matches(&lead) {
            Ok(lead)
        } else {
            Err(CrmError::not_found("lead", lead_id))
        }
    }

    /// List the categories of the principal's organisation with the
    /// organisation-wide count of uncategorised leads.
    pub async fn list_categories(&self, principal: &Principal) -> CrmResult<CategoryListing> {
        let role = self.resolve(principal).await?;
        let organisation_id = role.organisation_id();

        let categories = self.store.categories().list(organisation_id).await?;
        let uncategorised_lead_count = self
            .store
            .leads()
            .count(LeadFilter::organisation(organisation_id).with_category(RefFilter::IsNull))
            .await?;

        Ok(CategoryListing {
            categories,
            uncategorised_lead_count,
        })
    }

    /// Fetch a category of the principal's organisation together with
    /// the leads filed under it that the principal may see.
    pub async fn get_category(
        &self,
        principal: &Principal,
        category_id: Uuid,
    ) -> CrmResult<CategoryDetail> {
        let role = self.resolve(principal).await?;
        let category = self
            .store
            .categories()
            .get_by_id(role.organisation_id(), category_id)
            .await?;

        let leads = self
            .store
            .leads()
            .find_all(lead_scope(&role).with_category(RefFilter::Equals(category_id)))
            .await?;

        Ok(CategoryDetail { category, leads })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organisor_scope_is_the_whole_organisation() {
        let org = Uuid::new_v4();
        let filter = lead_scope(&Role::Organisor { organisation_id: org });
        assert_eq!(filter.organisation_id, org);
        assert_eq!(filter.agent, RefFilter::Any);
        assert_eq!(filter.category, RefFilter::Any);
    }

    #[test]
    fn agent_scope_is_own_assignments() {
        let org = Uuid::new_v4();
        let agent = Uuid::new_v4();
        let role = Role::Agent {
            organisation_id: org,
            agent_id: agent,
        };
        assert_eq!(lead_scope(&role).agent, RefFilter::Equals(agent));
        assert_eq!(assigned_scope(&role), lead_scope(&role));
    }

    #[test]
    fn organisor_assigned_half_requires_an_agent() {
        let role = Role::Organisor {
            organisation_id: Uuid::new_v4(),
        };
        assert_eq!(assigned_scope(&role).agent, RefFilter::IsSet);
    }
}
