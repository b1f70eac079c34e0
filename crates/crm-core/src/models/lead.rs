//! Lead domain model and the filter used to select leads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A prospective customer owned by one organisation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lead {
    pub id: Uuid,
    pub organisation_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    /// Assigned agent. Always an agent of `organisation_id`.
    pub agent_id: Option<Uuid>,
    /// Category. Always a category of `organisation_id`.
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn state(&self) -> LeadState {
        match (self.agent_id.is_some(), self.category_id.is_some()) {
            (false, false) => LeadState::UnassignedUncategorised,
            (true, false) => LeadState::AssignedUncategorised,
            (false, true) => LeadState::UnassignedCategorised,
            (true, true) => LeadState::AssignedCategorised,
        }
    }
}

/// Combined position of a lead on its two independent axes: agent
/// assignment and categorisation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LeadState {
    UnassignedUncategorised,
    AssignedUncategorised,
    UnassignedCategorised,
    AssignedCategorised,
}

/// Fields required to persist a new lead. Produced by the service
/// layer after validation; agent and category always start empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLead {
    pub organisation_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
}

/// Editable plain fields of a lead. Agent and category have their own
/// operations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateLead {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<u32>,
}

/// Constraint on a nullable reference column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefFilter {
    #[default]
    Any,
    IsNull,
    IsSet,
    Equals(Uuid),
}

impl RefFilter {
    pub fn matches(&self, value: Option<Uuid>) -> bool {
        match self {
            RefFilter::Any => true,
            RefFilter::IsNull => value.is_none(),
            RefFilter::IsSet => value.is_some(),
            RefFilter::Equals(id) => value == Some(*id),
        }
    }
}

/// Equality / null-check predicate over leads.
///
/// The organisation is mandatory: there is no way to express a query
/// that spans organisations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadFilter {
    pub organisation_id: Uuid,
    pub agent: RefFilter,
    pub category: RefFilter,
}

impl LeadFilter {
    pub fn organisation(organisation_id: Uuid) -> Self {
        Self {
            organisation_id,
            agent: RefFilter::Any,
            category: RefFilter::Any,
        }
    }

    pub fn with_agent(mut self, agent: RefFilter) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_category(mut self, category: RefFilter) -> Self {
        self.category = category;
        self
    }

    pub fn matches(&self, lead: &Lead) -> bool {
        lead.organisation_id == self.organisation_id
            && self.agent.matches(lead.agent_id)
            && self.category.matches(lead.category_id)
    }
}
