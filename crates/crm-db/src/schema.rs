//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings; nullable references use
//! `option<string>` so an unset reference is `NONE`.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organisations (root aggregate)
-- =======================================================================
DEFINE TABLE organisation SCHEMAFULL;
DEFINE FIELD name ON TABLE organisation TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD created_at ON TABLE organisation TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organisation TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Users (global scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD first_name ON TABLE user TYPE string DEFAULT '';
DEFINE FIELD last_name ON TABLE user TYPE string DEFAULT '';
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD is_organisor ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD is_agent ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_username ON TABLE user \
    COLUMNS username UNIQUE;

-- =======================================================================
-- User profiles (organisor -> organisation)
-- =======================================================================
DEFINE TABLE user_profile SCHEMAFULL;
DEFINE FIELD user_id ON TABLE user_profile TYPE string;
DEFINE FIELD organisation_id ON TABLE user_profile TYPE string;
DEFINE FIELD created_at ON TABLE user_profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_profile_user ON TABLE user_profile \
    COLUMNS user_id UNIQUE;
DEFINE INDEX idx_profile_organisation ON TABLE user_profile \
    COLUMNS organisation_id UNIQUE;

-- =======================================================================
-- Agents (organisation scope)
-- =======================================================================
DEFINE TABLE agent SCHEMAFULL;
DEFINE FIELD organisation_id ON TABLE agent TYPE string;
DEFINE FIELD user_id ON TABLE agent TYPE string;
DEFINE FIELD name ON TABLE agent TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD created_at ON TABLE agent TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE agent TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_agent_user ON TABLE agent \
    COLUMNS user_id UNIQUE;
DEFINE INDEX idx_agent_organisation ON TABLE agent \
    COLUMNS organisation_id;

-- =======================================================================
-- Categories (organisation scope)
-- =======================================================================
DEFINE TABLE category SCHEMAFULL;
DEFINE FIELD organisation_id ON TABLE category TYPE string;
DEFINE FIELD name ON TABLE category TYPE string;
DEFINE FIELD created_at ON TABLE category TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE category TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_category_organisation_name ON TABLE category \
    COLUMNS organisation_id, name UNIQUE;

-- =======================================================================
-- Leads (organisation scope)
-- =======================================================================
DEFINE TABLE lead SCHEMAFULL;
DEFINE FIELD organisation_id ON TABLE lead TYPE string;
DEFINE FIELD first_name ON TABLE lead TYPE string;
DEFINE FIELD last_name ON TABLE lead TYPE string;
DEFINE FIELD age ON TABLE lead TYPE int ASSERT $value >= 0;
DEFINE FIELD agent_id ON TABLE lead TYPE option<string>;
DEFINE FIELD category_id ON TABLE lead TYPE option<string>;
DEFINE FIELD created_at ON TABLE lead TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE lead TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_lead_organisation_agent ON TABLE lead \
    COLUMNS organisation_id, agent_id;
DEFINE INDEX idx_lead_organisation_category ON TABLE lead \
    COLUMNS organisation_id, category_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
