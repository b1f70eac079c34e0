//! SurrealDB implementation of [`LeadRepository`].

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::lead::{CreateLead, Lead, LeadFilter, RefFilter, UpdateLead};
use crm_core::repository::LeadRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_optional_uuid, parse_uuid};
use crate::error::{DbError, FOREIGN_REFERENCE, OUT_OF_SCOPE};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct LeadRow {
    organisation_id: String,
    first_name: String,
    last_name: String,
    age: u32,
    agent_id: Option<String>,
    category_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LeadRow {
    fn into_lead(self, id: Uuid) -> Result<Lead, DbError> {
        Ok(Lead {
            id,
            organisation_id: parse_uuid("organisation", &self.organisation_id)?,
            first_name: self.first_name,
            last_name: self.last_name,
            age: self.age,
            agent_id: parse_optional_uuid("agent", self.agent_id.as_deref())?,
            category_id: parse_optional_uuid("category", self.category_id.as_deref())?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct LeadRowWithId {
    record_id: String,
    organisation_id: String,
    first_name: String,
    last_name: String,
    age: u32,
    agent_id: Option<String>,
    category_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LeadRowWithId {
    fn try_into_lead(self) -> Result<Lead, DbError> {
        let id = parse_uuid("lead", &self.record_id)?;
        LeadRow {
            organisation_id: self.organisation_id,
            first_name: self.first_name,
            last_name: self.last_name,
            age: self.age,
            agent_id: self.agent_id,
            category_id: self.category_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_lead(id)
    }
}

/// Translate a [`LeadFilter`] into a SurrealQL `WHERE` clause and the
/// parameters it references.
fn where_clause(filter: &LeadFilter) -> (String, Vec<(&'static str, String)>) {
    let mut conditions = vec!["organisation_id = $organisation_id".to_string()];
    let mut params = vec![("organisation_id", filter.organisation_id.to_string())];

    for (column, constraint) in [("agent_id", filter.agent), ("category_id", filter.category)] {
        match constraint {
            RefFilter::Any => {}
            RefFilter::IsNull => conditions.push(format!("{column} IS NONE")),
            RefFilter::IsSet => conditions.push(format!("{column} IS NOT NONE")),
            RefFilter::Equals(id) => {
                conditions.push(format!("{column} = ${column}"));
                params.push((column, id.to_string()));
            }
        }
    }

    (conditions.join(" AND "), params)
}

/// SurrealDB implementation of the Lead repository.
#[derive(Clone)]
pub struct SurrealLeadRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealLeadRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Point `column` of a lead at a record of `table`, or clear it.
    ///
    /// The scope check, the ownership check on the referenced record and
    /// the write run in one transaction, so a reference deleted by a
    /// concurrent request can never be attached to a lead.
    async fn set_reference(
        &self,
        column: &'static str,
        table: &'static str,
        scope: LeadFilter,
        id: Uuid,
        value: Option<Uuid>,
    ) -> CrmResult<Lead> {
        let id_str = id.to_string();
        let organisation_id = scope.organisation_id;
        let (condition, params) = where_clause(&scope);

        let mut guard = format!(
            "IF array::len((SELECT VALUE id FROM type::record('lead', $id) \
             WHERE {condition})) = 0 {{ THROW '{OUT_OF_SCOPE}' }}"
        );
        if value.is_some() {
            guard.push_str(&format!(
                " ELSE IF array::len((SELECT VALUE id FROM type::record('{table}', $value) \
                 WHERE organisation_id = $organisation_id)) = 0 \
                 {{ THROW '{FOREIGN_REFERENCE}' }}"
            ));
        }

        let query = format!(
            "BEGIN TRANSACTION; \
             {guard}; \
             UPDATE type::record('lead', $id) SET \
             {column} = $value, updated_at = time::now() \
             WHERE {condition}; \
             COMMIT TRANSACTION;"
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("value", value.map(|v| v.to_string())));
        for param in params {
            builder = builder.bind(param);
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| {
                let message = e.to_string();
                if message.contains(OUT_OF_SCOPE) {
                    DbError::NotFound {
                        entity: "lead".into(),
                        id: id_str.clone(),
                    }
                } else if message.contains(FOREIGN_REFERENCE) {
                    DbError::OutsideOrganisation {
                        entity: table.into(),
                    }
                } else {
                    DbError::from_check("lead", e)
                }
            })?;

        self.get_by_id(organisation_id, id).await
    }
}

impl<C: Connection> LeadRepository for SurrealLeadRepository<C> {
    async fn create(&self, input: CreateLead) -> CrmResult<Lead> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('lead', $id) SET \
                 organisation_id = $organisation_id, \
                 first_name = $first_name, last_name = $last_name, \
                 age = $age, agent_id = NONE, category_id = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("organisation_id", input.organisation_id.to_string()))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("age", input.age))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("lead", e))?;

        let rows: Vec<LeadRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "lead".into(),
            id: id_str,
        })?;

        Ok(row.into_lead(id)?)
    }

    async fn get_by_id(&self, organisation_id: Uuid, id: Uuid) -> CrmResult<Lead> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('lead', $id) \
                 WHERE organisation_id = $organisation_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("organisation_id", organisation_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LeadRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "lead".into(),
            id: id_str,
        })?;

        Ok(row.into_lead(id)?)
    }

    async fn find_all(&self, filter: LeadFilter) -> CrmResult<Vec<Lead>> {
        let (condition, params) = where_clause(&filter);
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM lead \
             WHERE {condition} ORDER BY created_at ASC"
        );

        let mut builder = self.db.query(query);
        for param in params {
            builder = builder.bind(param);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<LeadRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_lead())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn count(&self, filter: LeadFilter) -> CrmResult<u64> {
        let (condition, params) = where_clause(&filter);
        let query = format!("SELECT count() AS total FROM lead WHERE {condition} GROUP ALL");

        let mut builder = self.db.query(query);
        for param in params {
            builder = builder.bind(param);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn update(
        &self,
        organisation_id: Uuid,
        id: Uuid,
        input: UpdateLead,
    ) -> CrmResult<Lead> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.age.is_some() {
            sets.push("age = $age");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('lead', $id) SET {} \
             WHERE organisation_id = $organisation_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("organisation_id", organisation_id.to_string()));

        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(age) = input.age {
            builder = builder.bind(("age", age));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("lead", e))?;

        let rows: Vec<LeadRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "lead".into(),
            id: id_str,
        })?;

        Ok(row.into_lead(id)?)
    }

    async fn set_agent(
        &self,
        scope: LeadFilter,
        id: Uuid,
        agent_id: Option<Uuid>,
    ) -> CrmResult<Lead> {
        self.set_reference("agent_id", "agent", scope, id, agent_id)
            .await
    }

    async fn set_category(
        &self,
        scope: LeadFilter,
        id: Uuid,
        category_id: Option<Uuid>,
    ) -> CrmResult<Lead> {
        self.set_reference("category_id", "category", scope, id, category_id)
            .await
    }

    async fn delete(&self, organisation_id: Uuid, id: Uuid) -> CrmResult<()> {
        self.db
            .query(
                "DELETE type::record('lead', $id) \
                 WHERE organisation_id = $organisation_id",
            )
            .bind(("id", id.to_string()))
            .bind(("organisation_id", organisation_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
