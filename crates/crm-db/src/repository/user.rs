//! SurrealDB implementation of [`UserRepository`].

use argon2::Argon2;
use argon2::password_hash::{PasswordHasher, SaltString};
use chrono::{DateTime, Utc};
use crm_core::error::CrmResult;
use crm_core::models::agent::{Agent, CreateAgent};
use crm_core::models::organisation::{CreateOrganisation, OrganisorAccount};
use crm_core::models::user::{CreateUser, User};
use crm_core::repository::{AgentRepository, UserProfileRepository, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{SurrealAgentRepository, SurrealUserProfileRepository, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    is_organisor: bool,
    is_agent: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            is_organisor: self.is_organisor,
            is_agent: self.is_agent,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    is_organisor: bool,
    is_agent: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid("user", &self.record_id)?,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            is_organisor: self.is_organisor,
            is_agent: self.is_agent,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Hash a password with Argon2id using OWASP-recommended parameters.
///
/// If a pepper is provided, it is prepended to the password before
/// hashing. The salt is randomly generated for each call.
fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, DbError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::Hash(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    /// Create a user and the records given by `statements` in one
    /// transaction. `statements` may reference `$user_id` and any of
    /// `params`.
    async fn create_account(
        &self,
        user_id: Uuid,
        user: CreateUser,
        role: Role,
        statements: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<(), DbError> {
        let password_hash = hash_password(&user.password, self.pepper.as_deref())?;

        let query = format!(
            "BEGIN TRANSACTION; \
             CREATE type::record('user', $user_id) SET \
             username = $username, email = $email, \
             first_name = $first_name, last_name = $last_name, \
             password_hash = $password_hash, \
             is_organisor = $is_organisor, is_agent = $is_agent; \
             {statements} \
             COMMIT TRANSACTION;"
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("user_id", user_id.to_string()))
            .bind(("username", user.username))
            .bind(("email", user.email))
            .bind(("first_name", user.first_name))
            .bind(("last_name", user.last_name))
            .bind(("password_hash", password_hash))
            .bind(("is_organisor", role == Role::Organisor))
            .bind(("is_agent", role == Role::Agent));
        for param in params {
            builder = builder.bind(param);
        }

        builder
            .await?
            .check()
            .map_err(|e| DbError::from_check("user", e))?;

        Ok(())
    }
}

/// The role flag set on a newly created account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Organisor,
    Agent,
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn get_by_id(&self, id: Uuid) -> CrmResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id))
    }

    async fn get_by_username(&self, username: &str) -> CrmResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE username = $username",
            )
            .bind(("username", username.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("username={username}"),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn create_organisor(
        &self,
        user: CreateUser,
        organisation: CreateOrganisation,
    ) -> CrmResult<OrganisorAccount> {
        let user_id = Uuid::new_v4();
        let organisation_id = Uuid::new_v4();
        let profile_id = Uuid::new_v4();

        debug!(username = %user.username, "Creating organisor account");

        self.create_account(
            user_id,
            user,
            Role::Organisor,
            "CREATE type::record('organisation', $organisation_id) SET \
             name = $organisation_name; \
             CREATE type::record('user_profile', $profile_id) SET \
             user_id = $user_id, organisation_id = $organisation_id;",
            vec![
                ("organisation_id", organisation_id.to_string()),
                ("organisation_name", organisation.name),
                ("profile_id", profile_id.to_string()),
            ],
        )
        .await?;

        Ok(OrganisorAccount {
            user: self.get_by_id(user_id).await?,
            organisation: super::organisation::fetch(&self.db, organisation_id).await?,
            profile: SurrealUserProfileRepository::new(self.db.clone())
                .get_by_user(user_id)
                .await?,
        })
    }

    async fn create_agent(&self, user: CreateUser, agent: CreateAgent) -> CrmResult<Agent> {
        let user_id = Uuid::new_v4();
        let agent_id = Uuid::new_v4();

        debug!(username = %user.username, "Creating agent account");

        self.create_account(
            user_id,
            user,
            Role::Agent,
            "CREATE type::record('agent', $agent_id) SET \
             organisation_id = $organisation_id, \
             user_id = $user_id, name = $agent_name;",
            vec![
                ("agent_id", agent_id.to_string()),
                ("organisation_id", agent.organisation_id.to_string()),
                ("agent_name", agent.name),
            ],
        )
        .await?;

        SurrealAgentRepository::new(self.db.clone())
            .get_by_id(agent.organisation_id, agent_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::PasswordVerifier;
    use argon2::password_hash::PasswordHash;

    #[test]
    fn hash_is_argon2id_and_verifies() {
        let hash = hash_password("correct-horse-battery", None).unwrap();
        assert!(hash.starts_with("$argon2id$"));

        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"correct-horse-battery", &parsed)
                .is_ok()
        );
    }

    #[test]
    fn pepper_is_prepended() {
        let hash = hash_password("hunter2", Some("pepper!")).unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"pepper!hunter2", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"hunter2", &parsed)
                .is_err()
        );
    }
}
