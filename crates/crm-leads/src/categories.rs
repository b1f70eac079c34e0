//! Category management for organisors.

use crm_core::error::CrmResult;
use crm_core::models::category::{Category, CreateCategory, UpdateCategory};
use crm_core::repository::{CategoryRepository, Repositories};
use tracing::info;
use uuid::Uuid;

use crate::error::AccessError;
use crate::role::{Principal, resolve_role};

fn category_name(name: &str) -> Result<String, AccessError> {
    match name.trim() {
        "" => Err(AccessError::MissingField("name")),
        name => Ok(name.to_string()),
    }
}

/// Creates, renames and removes the categories of an organisation.
/// Reads go through [`crate::ScopedQueryService`].
pub struct CategoryService<S> {
    store: S,
}

impl<S: Repositories> CategoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_category(&self, principal: &Principal, name: &str) -> CrmResult<Category> {
        let role = resolve_role(&self.store, principal).await?;
        let organisation_id = role.require_organisor("manage categories")?;

        let category = self
            .store
            .categories()
            .create(CreateCategory {
                organisation_id,
                name: category_name(name)?,
            })
            .await?;

        info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    pub async fn rename_category(
        &self,
        principal: &Principal,
        category_id: Uuid,
        name: &str,
    ) -> CrmResult<Category> {
        let role = resolve_role(&self.store, principal).await?;
        let organisation_id = role.require_organisor("manage categories")?;

        self.store
            .categories()
            .update(
                organisation_id,
                category_id,
                UpdateCategory {
                    name: Some(category_name(name)?),
                },
            )
            .await
    }

    /// Remove a category. Leads filed under it become uncategorised.
    pub async fn delete_category(&self, principal: &Principal, category_id: Uuid) -> CrmResult<()> {
        let role = resolve_role(&self.store, principal).await?;
        let organisation_id = role.require_organisor("manage categories")?;

        self.store
            .categories()
            .get_by_id(organisation_id, category_id)
            .await?;
        self.store
            .categories()
            .delete(organisation_id, category_id)
            .await?;

        info!(category_id = %category_id, "Category deleted");
        Ok(())
    }
}
