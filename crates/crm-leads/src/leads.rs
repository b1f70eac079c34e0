//! Lead lifecycle: create, update, delete, agent assignment and
//! categorisation.
//!
//! Mutations re-resolve the caller's role and confine the write to the
//! caller's scope, so a lead outside that scope can never be modified.

use std::sync::Arc;

use crm_core::error::CrmResult;
use crm_core::models::lead::{CreateLead, Lead, UpdateLead};
use crm_core::repository::{LeadRepository, Repositories};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::error::AccessError;
use crate::notify::{self, Notification, Notifier};
use crate::role::Principal;
use crate::scope::{ScopedQueryService, lead_scope};

/// Input for creating a lead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadForm {
    pub first_name: String,
    pub last_name: String,
    pub age: Option<u32>,
}

impl LeadForm {
    fn into_create(self, organisation_id: Uuid) -> Result<CreateLead, AccessError> {
        Ok(CreateLead {
            organisation_id,
            first_name: required_name(self.first_name, "first_name")?,
            last_name: required_name(self.last_name, "last_name")?,
            age: self.age.ok_or(AccessError::MissingField("age"))?,
        })
    }
}

fn required_name(value: String, field: &'static str) -> Result<String, AccessError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AccessError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn validate_update(input: UpdateLead) -> Result<UpdateLead, AccessError> {
    Ok(UpdateLead {
        first_name: input
            .first_name
            .map(|v| required_name(v, "first_name"))
            .transpose()?,
        last_name: input
            .last_name
            .map(|v| required_name(v, "last_name"))
            .transpose()?,
        age: input.age,
    })
}

/// Service for lead mutations.
pub struct LeadService<S, N> {
    queries: ScopedQueryService<S>,
    notifier: Arc<N>,
    config: NotificationConfig,
}

impl<S, N> LeadService<S, N>
where
    S: Repositories,
    N: Notifier + 'static,
{
    pub fn new(store: S, notifier: Arc<N>, config: NotificationConfig) -> Self {
        Self {
            queries: ScopedQueryService::new(store),
            notifier,
            config,
        }
    }

    /// Read-side access with the same scoping rules.
    pub fn queries(&self) -> &ScopedQueryService<S> {
        &self.queries
    }

    /// Create an unassigned, uncategorised lead in the organisor's
    /// organisation and notify the configured recipients.
    pub async fn create(&self, principal: &Principal, form: LeadForm) -> CrmResult<Lead> {
        let role = self.queries.resolve(principal).await?;
        let organisation_id = role.require_organisor("create leads")?;

        let input = form.into_create(organisation_id)?;
        let lead = self.queries.store().leads().create(input).await?;

        info!(
            lead_id = %lead.id,
            organisation_id = %organisation_id,
            "Lead created"
        );

        notify::dispatch(
            &self.notifier,
            Notification {
                subject: self.config.lead_created_subject.clone(),
                body: self.config.lead_created_body.clone(),
                from: self.config.from.clone(),
                to: self.config.lead_created_to.clone(),
            },
        );

        Ok(lead)
    }

    /// Change a lead's name or age. Assignment and category are left
    /// untouched.
    pub async fn update(
        &self,
        principal: &Principal,
        lead_id: Uuid,
        input: UpdateLead,
    ) -> CrmResult<Lead> {
        let role = self.queries.resolve(principal).await?;
        let organisation_id = role.require_organisor("update leads")?;
        let input = validate_update(input)?;

        self.queries.lead_for(&role, lead_id).await?;
        self.queries
            .store()
            .leads()
            .update(organisation_id, lead_id, input)
            .await
    }

    pub async fn delete(&self, principal: &Principal, lead_id: Uuid) -> CrmResult<()> {
        let role = self.queries.resolve(principal).await?;
        let organisation_id = role.require_organisor("delete leads")?;

        self.queries.lead_for(&role, lead_id).await?;
        self.queries
            .store()
            .leads()
            .delete(organisation_id, lead_id)
            .await?;

        info!(lead_id = %lead_id, "Lead deleted");
        Ok(())
    }

    /// Assign a lead to an agent of the same organisation.
    ///
    /// The agent's membership is checked in the same transaction as the
    /// write, so an agent deleted concurrently is never assigned.
    pub async fn assign_agent(
        &self,
        principal: &Principal,
        lead_id: Uuid,
        agent_id: Uuid,
    ) -> CrmResult<Lead> {
        let role = self.queries.resolve(principal).await?;
        role.require_organisor("assign leads")?;

        let lead = self
            .queries
            .store()
            .leads()
            .set_agent(lead_scope(&role), lead_id, Some(agent_id))
            .await?;

        info!(lead_id = %lead_id, agent_id = %agent_id, "Lead assigned");
        Ok(lead)
    }

    /// File a lead under a category, or clear its category with `None`.
    ///
    /// Organisors may categorise any lead of their organisation; agents
    /// only the leads assigned to them.
    pub async fn update_category(
        &self,
        principal: &Principal,
        lead_id: Uuid,
        category_id: Option<Uuid>,
    ) -> CrmResult<Lead> {
        let role = self.queries.resolve(principal).await?;

        let lead = self
            .queries
            .store()
            .leads()
            .set_category(lead_scope(&role), lead_id, category_id)
            .await?;

        info!(lead_id = %lead_id, category_id = ?category_id, "Lead category updated");
        Ok(lead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_is_required() {
        let form = LeadForm {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            age: None,
        };
        assert_eq!(
            form.into_create(Uuid::new_v4()).unwrap_err(),
            AccessError::MissingField("age")
        );
    }

    #[test]
    fn names_are_trimmed_and_required() {
        let org = Uuid::new_v4();
        let input = LeadForm {
            first_name: "  Jane ".into(),
            last_name: "Doe".into(),
            age: Some(30),
        }
        .into_create(org)
        .unwrap();
        assert_eq!(input.first_name, "Jane");
        assert_eq!(input.organisation_id, org);

        let err = LeadForm {
            first_name: "   ".into(),
            last_name: "Doe".into(),
            age: Some(30),
        }
        .into_create(org)
        .unwrap_err();
        assert_eq!(err, AccessError::MissingField("first_name"));
    }

    #[test]
    fn update_leaves_absent_fields_alone() {
        let input = validate_update(UpdateLead {
            age: Some(41),
            ..Default::default()
        })
        .unwrap();
        assert!(input.first_name.is_none());
        assert_eq!(input.age, Some(41));

        let err = validate_update(UpdateLead {
            last_name: Some(String::new()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, AccessError::MissingField("last_name"));
    }
}
