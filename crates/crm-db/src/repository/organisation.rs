//! Organisation records.
//!
//! Organisations are only written as part of organisor signup (see
//! [`super::SurrealUserRepository`]); this module reads them back.

use chrono::{DateTime, Utc};
use crm_core::models::organisation::Organisation;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct OrganisationRow {
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganisationRow {
    fn into_organisation(self, id: Uuid) -> Organisation {
        Organisation {
            id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Load one organisation by id.
pub(super) async fn fetch<C: Connection>(
    db: &Surreal<C>,
    id: Uuid,
) -> Result<Organisation, DbError> {
    let id_str = id.to_string();

    let mut result = db
        .query("SELECT * FROM type::record('organisation', $id)")
        .bind(("id", id_str.clone()))
        .await?;

    let rows: Vec<OrganisationRow> = result.take(0)?;
    let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        entity: "organisation".into(),
        id: id_str,
    })?;

    Ok(row.into_organisation(id))
}
