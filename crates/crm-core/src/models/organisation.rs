//! Organisation domain model.
//!
//! An organisation is owned by one organisor and groups that
//! organisor's agents, leads and categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::UserProfile;
use super::user::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organisation {
    pub id: Uuid,
    /// Display name, usually the organisor's company.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganisation {
    pub name: String,
}

/// The records created together when an organisor signs up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganisorAccount {
    pub user: User,
    pub organisation: Organisation,
    pub profile: UserProfile,
}
