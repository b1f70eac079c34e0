//! SurrealDB implementation of [`UserProfileRepository`].

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::profile::UserProfile;
use crm_core::repository::UserProfileRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ProfileRowWithId {
    record_id: String,
    user_id: String,
    organisation_id: String,
    created_at: DateTime<Utc>,
}

impl ProfileRowWithId {
    fn try_into_profile(self) -> Result<UserProfile, DbError> {
        Ok(UserProfile {
            id: parse_uuid("user_profile", &self.record_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            organisation_id: parse_uuid("organisation", &self.organisation_id)?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the UserProfile repository.
#[derive(Clone)]
pub struct SurrealUserProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserProfileRepository for SurrealUserProfileRepository<C> {
    async fn get_by_user(&self, user_id: Uuid) -> CrmResult<UserProfile> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user_profile \
                 WHERE user_id = $user_id",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_profile".into(),
            id: format!("user={user_id}"),
        })?;

        Ok(row.try_into_profile()?)
    }
}
