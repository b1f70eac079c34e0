//! SurrealDB implementation of [`CategoryRepository`].

use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::category::{Category, CreateCategory, UpdateCategory};
use crm_core::repository::CategoryRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CategoryRow {
    organisation_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CategoryRow {
    fn into_category(self, id: Uuid) -> Result<Category, DbError> {
        Ok(Category {
            id,
            organisation_id: parse_uuid("organisation", &self.organisation_id)?,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CategoryRowWithId {
    record_id: String,
    organisation_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CategoryRowWithId {
    fn try_into_category(self) -> Result<Category, DbError> {
        let id = parse_uuid("category", &self.record_id)?;
        CategoryRow {
            organisation_id: self.organisation_id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_category(id)
    }
}

/// SurrealDB implementation of the Category repository.
#[derive(Clone)]
pub struct SurrealCategoryRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCategoryRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CategoryRepository for SurrealCategoryRepository<C> {
    async fn create(&self, input: CreateCategory) -> CrmResult<Category> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('category', $id) SET \
                 organisation_id = $organisation_id, name = $name",
            )
            .bind(("id", id_str.clone()))
            .bind(("organisation_id", input.organisation_id.to_string()))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("category", e))?;

        let rows: Vec<CategoryRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "category".into(),
            id: id_str,
        })?;

        Ok(row.into_category(id)?)
    }

    async fn get_by_id(&self, organisation_id: Uuid, id: Uuid) -> CrmResult<Category> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('category', $id) \
                 WHERE organisation_id = $organisation_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("organisation_id", organisation_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CategoryRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "category".into(),
            id: id_str,
        })?;

        Ok(row.into_category(id)?)
    }

    async fn update(
        &self,
        organisation_id: Uuid,
        id: Uuid,
        input: UpdateCategory,
    ) -> CrmResult<Category> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('category', $id) SET {} \
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
            .map_err(|e| DbError::from_check("category", e))?;

        let rows: Vec<CategoryRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "category".into(),
            id: id_str,
        })?;

        Ok(row.into_category(id)?)
    }

    async fn delete(&self, organisation_id: Uuid, id: Uuid) -> CrmResult<()> {
        debug!(category_id = %id, "Deleting category and clearing it from leads");

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE lead SET category_id = NONE, updated_at = time::now() \
                 WHERE organisation_id = $organisation_id AND category_id = $id; \
                 DELETE type::record('category', $id) \
                 WHERE organisation_id = $organisation_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("organisation_id", organisation_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_check("category", e))?;

        Ok(())
    }

    async fn list(&self, organisation_id: Uuid) -> CrmResult<Vec<Category>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM category \
                 WHERE organisation_id = $organisation_id \
                 ORDER BY name ASC",
            )
            .bind(("organisation_id", organisation_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CategoryRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_category())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }
}
