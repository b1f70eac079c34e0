//! SurrealDB implementation of [`AgentRepository`].

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::agent::{Agent, UpdateAgent};
use crm_core::repository::AgentRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct AgentRow {
    organisation_id: String,
    user_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AgentRow {
    fn into_agent(self, id: Uuid) -> Result<Agent, DbError> {
        Ok(Agent {
            id,
            organisation_id: parse_uuid("organisation", &self.organisation_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct AgentRowWithId {
    record_id: String,
    organisation_id: String,
    user_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AgentRowWithId {
    fn try_into_agent(self) -> Result<Agent, DbError> {
        Ok(Agent {
            id: parse_uuid("agent", &self.record_id)?,
            organisation_id: parse_uuid("organisation", &self.organisation_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Agent repository.
#[derive(Clone)]
pub struct SurrealAgentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAgentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AgentRepository for SurrealAgentRepository<C> {
    async fn get_by_id(&self, organisation_id: Uuid, id: Uuid) -> CrmResult<Agent> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('agent', $id) \
                 WHERE organisation_id = $organisation_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("organisation_id", organisation_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent".into(),
            id: id_str,
        })?;

        Ok(row.into_agent(id)?)
    }

    async fn get_by_user(&self, user_id: Uuid) -> CrmResult<Agent> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM agent \
                 WHERE user_id = $user_id",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgentRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent".into(),
            id: format!("user={user_id}"),
        })?;

        Ok(row.try_into_agent()?)
    }

    async fn update(
        &self,
        organisation_id: Uuid,
        id: Uuid,
        input: UpdateAgent,
    ) -> CrmResult<Agent> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('agent', $id) SET {} \
             WHERE organisation_id = $organisation_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("organisation_id", organisation_id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("agent", e))?;

        let rows: Vec<AgentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agent".into(),
            id: id_str,
        })?;

        Ok(row.into_agent(id)?)
    }

    async fn delete(&self, organisation_id: Uuid, id: Uuid) -> CrmResult<()> {
        let id_str = id.to_string();

        debug!(agent_id = %id, "Deleting agent, its user account and lead assignments");

        // Lead references and the login account go in the same transaction
        // so neither a dangling assignment nor an orphaned user survives.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 LET $users = (SELECT VALUE user_id FROM type::record('agent', $id) \
                 WHERE organisation_id = $organisation_id); \
                 UPDATE lead SET agent_id = NONE, updated_at = time::now() \
                 WHERE organisation_id = $organisation_id AND agent_id = $id; \
                 DELETE type::record('agent', $id) \
                 WHERE organisation_id = $organisation_id; \
                 FOR $user IN $users { DELETE type::record('user', $user); }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str))
            .bind(("organisation_id", organisation_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("agent", e))?;

        Ok(())
    }

    async fn list(&self, organisation_id: Uuid) -> CrmResult<Vec<Agent>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM agent \
                 WHERE organisation_id = $organisation_id \
                 ORDER BY created_at ASC",
            )
            .bind(("organisation_id", organisation_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgentRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_agent())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }
}
