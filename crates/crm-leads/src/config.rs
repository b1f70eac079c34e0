//! Service-layer configuration.

use serde::Deserialize;

/// Configuration for the CRM services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrmConfig {
    /// Minimum password length accepted at organisor signup.
    pub min_password_length: usize,
    /// Length of the random initial password given to new agents.
    pub agent_password_length: usize,
    pub notification: NotificationConfig,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            min_password_length: 8,
            agent_password_length: 24,
            notification: NotificationConfig::default(),
        }
    }
}

/// Sender, recipients and wording of outbound notifications.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub from: String,
    /// Operator addresses told about every new lead.
    pub lead_created_to: Vec<String>,
    pub lead_created_subject: String,
    pub lead_created_body: String,
    pub agent_invite_subject: String,
    pub agent_invite_body: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            from: "test@test.com".into(),
            lead_created_to: vec!["test2@test.com".into()],
            lead_created_subject: "A lead has been created".into(),
            lead_created_body: "Go to the site to see the new lead".into(),
            agent_invite_subject: "You are invited to be an agent".into(),
            agent_invite_body: "You were added as an agent. Please log in to start working."
                .into(),
        }
    }
}
