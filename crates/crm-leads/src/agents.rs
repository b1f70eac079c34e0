//! Agent management for organisors.

use std::sync::Arc;

use crm_core::error::CrmResult;
use crm_core::models::agent::{Agent, CreateAgent, UpdateAgent};
use crm_core::models::user::CreateUser;
use crm_core::repository::{AgentRepository, Repositories, UserRepository};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::config::CrmConfig;
use crate::error::AccessError;
use crate::notify::{self, Notification, Notifier};
use crate::role::{Principal, resolve_role};

/// Input for inviting a new agent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl AgentForm {
    fn validate(&self) -> Result<(), AccessError> {
        if self.username.trim().is_empty() {
            return Err(AccessError::MissingField("username"));
        }
        if self.email.trim().is_empty() {
            return Err(AccessError::MissingField("email"));
        }
        Ok(())
    }

    /// Display name stored on the agent record.
    fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        match full.trim() {
            "" => self.username.trim().to_string(),
            name => name.to_string(),
        }
    }
}

/// Random alphanumeric password for freshly invited agents.
fn generate_password(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Service for organisor-only agent management.
pub struct AgentService<S, N> {
    store: S,
    notifier: Arc<N>,
    config: CrmConfig,
}

impl<S, N> AgentService<S, N>
where
    S: Repositories,
    N: Notifier + 'static,
{
    pub fn new(store: S, notifier: Arc<N>, config: CrmConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub async fn list_agents(&self, principal: &Principal) -> CrmResult<Vec<Agent>> {
        let role = resolve_role(&self.store, principal).await?;
        let organisation_id = role.require_organisor("manage agents")?;
        self.store.agents().list(organisation_id).await
    }

    pub async fn get_agent(&self, principal: &Principal, agent_id: Uuid) -> CrmResult<Agent> {
        let role = resolve_role(&self.store, principal).await?;
        let organisation_id = role.require_organisor("manage agents")?;
        self.store.agents().get_by_id(organisation_id, agent_id).await
    }

    /// Create a user account flagged as agent together with its agent
    /// record in the organisor's organisation, then send the invitation.
    pub async fn create_agent(&self, principal: &Principal, form: AgentForm) -> CrmResult<Agent> {
        let role = resolve_role(&self.store, principal).await?;
        let organisation_id = role.require_organisor("manage agents")?;
        form.validate()?;

        let name = form.display_name();
        let email = form.email.trim().to_string();

        let agent = self
            .store
            .users()
            .create_agent(
                CreateUser {
                    username: form.username.trim().to_string(),
                    email: email.clone(),
                    first_name: form.first_name.trim().to_string(),
                    last_name: form.last_name.trim().to_string(),
                    password: generate_password(self.config.agent_password_length),
                },
                CreateAgent {
                    organisation_id,
                    name,
                },
            )
            .await?;

        info!(
            agent_id = %agent.id,
            organisation_id = %organisation_id,
            "Agent created"
        );

        let invite = &self.config.notification;
        notify::dispatch(
            &self.notifier,
            Notification {
                subject: invite.agent_invite_subject.clone(),
                body: invite.agent_invite_body.clone(),
                from: invite.from.clone(),
                to: vec![email],
            },
        );

        Ok(agent)
    }

    pub async fn update_agent(
        &self,
        principal: &Principal,
        agent_id: Uuid,
        input: UpdateAgent,
    ) -> CrmResult<Agent> {
        let role = resolve_role(&self.store, principal).await?;
        let organisation_id = role.require_organisor("manage agents")?;

        let input = UpdateAgent {
            name: match input.name {
                Some(name) if name.trim().is_empty() => {
                    return Err(AccessError::MissingField("name").into());
                }
                name => name.map(|n| n.trim().to_string()),
            },
        };

        self.store
            .agents()
            .update(organisation_id, agent_id, input)
            .await
    }

    /// Remove an agent and its user account. Leads it was assigned to
    /// become unassigned.
    pub async fn delete_agent(&self, principal: &Principal, agent_id: Uuid) -> CrmResult<()> {
        let role = resolve_role(&self.store, principal).await?;
        let organisation_id = role.require_organisor("manage agents")?;

        self.store.agents().get_by_id(organisation_id, agent_id).await?;
        self.store.agents().delete(organisation_id, agent_id).await?;

        info!(agent_id = %agent_id, "Agent deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_password_has_requested_length() {
        let password = generate_password(24);
        assert_eq!(password.len(), 24);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, generate_password(24));
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut form = AgentForm {
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            first_name: "John".into(),
            last_name: "Doe".into(),
        };
        assert_eq!(form.display_name(), "John Doe");

        form.first_name.clear();
        form.last_name.clear();
        assert_eq!(form.display_name(), "jdoe");
    }

    #[test]
    fn username_and_email_are_required() {
        let form = AgentForm {
            email: "a@b.c".into(),
            ..Default::default()
        };
        assert_eq!(form.validate(), Err(AccessError::MissingField("username")));
    }
}
