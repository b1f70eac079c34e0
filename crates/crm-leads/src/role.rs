//! Role resolution.
//!
//! A principal's role is derived from stored data on every call: the
//! organisor flag plus the user's profile, or the agent flag plus the
//! user's agent record. Nothing is cached between requests.

use crm_core::error::{CrmError, CrmResult};
use crm_core::repository::{
    AgentRepository, Repositories, UserProfileRepository, UserRepository,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::AccessError;

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// What a principal is allowed to act as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    /// Owner of an organisation; sees and manages all of its data.
    Organisor { organisation_id: Uuid },
    /// Member of an organisation; sees only leads assigned to them.
    Agent {
        organisation_id: Uuid,
        agent_id: Uuid,
    },
}

impl Role {
    pub fn organisation_id(&self) -> Uuid {
        match self {
            Role::Organisor { organisation_id } | Role::Agent { organisation_id, .. } => {
                *organisation_id
            }
        }
    }

    pub fn agent_id(&self) -> Option<Uuid> {
        match self {
            Role::Organisor { .. } => None,
            Role::Agent { agent_id, .. } => Some(*agent_id),
        }
    }

    pub fn is_organisor(&self) -> bool {
        matches!(self, Role::Organisor { .. })
    }

    /// Returns the organisation for organisor-only operations.
    pub fn require_organisor(&self, action: &'static str) -> Result<Uuid, AccessError> {
        match self {
            Role::Organisor { organisation_id } => Ok(*organisation_id),
            Role::Agent { .. } => Err(AccessError::OrganisorRequired(action)),
        }
    }
}

/// Resolve the role of `principal` from the user record and its
/// profile or agent record.
pub async fn resolve_role<S: Repositories>(store: &S, principal: &Principal) -> CrmResult<Role> {
    let user = match store.users().get_by_id(principal.user_id).await {
        Ok(user) => user,
        Err(CrmError::NotFound { .. }) => return Err(AccessError::UnknownPrincipal.into()),
        Err(e) => return Err(e),
    };

    let role = match (user.is_organisor, user.is_agent) {
        (true, true) => return Err(AccessError::AmbiguousRole.into()),
        (false, false) => return Err(AccessError::NoRole.into()),
        (true, false) => {
            let profile = store
                .profiles()
                .get_by_user(user.id)
                .await
                .map_err(missing_record_is_no_role)?;
            Role::Organisor {
                organisation_id: profile.organisation_id,
            }
        }
        (false, true) => {
            let agent = store
                .agents()
                .get_by_user(user.id)
                .await
                .map_err(missing_record_is_no_role)?;
            Role::Agent {
                organisation_id: agent.organisation_id,
                agent_id: agent.id,
            }
        }
    };

    debug!(user_id = %principal.user_id, ?role, "Resolved role");
    Ok(role)
}

fn missing_record_is_no_role(err: CrmError) -> CrmError {
    if err.is_not_found() {
        AccessError::NoRole.into()
    } else {
        err
    }
}
