//! Integration tests for account creation through the User repository
//! and the UserProfile lookup, using in-memory SurrealDB.

use crm_core::error::CrmError;
use crm_core::models::agent::CreateAgent;
use crm_core::models::organisation::CreateOrganisation;
use crm_core::models::user::CreateUser;
use crm_core::repository::{AgentRepository, UserProfileRepository, UserRepository};
use crm_db::repository::{
    SurrealAgentRepository, SurrealUserProfileRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    crm_db::run_migrations(&db).await.unwrap();
    db
}

fn account(username: &str) -> CreateUser {
    CreateUser {
        username: username.into(),
        email: format!("{username}@example.com"),
        first_name: "Olive".into(),
        last_name: "Owner".into(),
        password: "correct-horse-battery".into(),
    }
}

fn company(name: &str) -> CreateOrganisation {
    CreateOrganisation { name: name.into() }
}

async fn count(db: &Surreal<Db>, table: &str) -> usize {
    let mut result = db
        .query(format!("SELECT VALUE meta::id(id) FROM {table}"))
        .await
        .unwrap();
    let ids: Vec<String> = result.take(0).unwrap();
    ids.len()
}

// -----------------------------------------------------------------------
// Organisor signup
// -----------------------------------------------------------------------

#[tokio::test]
async fn organisor_signup_creates_user_organisation_and_profile() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let profiles = SurrealUserProfileRepository::new(db);

    let created = users
        .create_organisor(account("olive"), company("Acme Realty"))
        .await
        .unwrap();

    assert_eq!(created.user.username, "olive");
    assert!(created.user.is_organisor);
    assert!(!created.user.is_agent);
    assert_eq!(created.organisation.name, "Acme Realty");
    assert_eq!(created.profile.user_id, created.user.id);
    assert_eq!(created.profile.organisation_id, created.organisation.id);

    let profile = profiles.get_by_user(created.user.id).await.unwrap();
    assert_eq!(profile.id, created.profile.id);
}

#[tokio::test]
async fn signup_hashes_password_and_hides_it() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db);

    let created = users
        .create_organisor(account("olive"), company("Acme"))
        .await
        .unwrap();
    assert!(created.user.password_hash.starts_with("$argon2id$"));
    assert_ne!(created.user.password_hash, "correct-horse-battery");

    let json = serde_json::to_value(&created.user).unwrap();
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
async fn lookup_user_by_id_and_username() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db);

    let created = users
        .create_organisor(account("olive"), company("Acme"))
        .await
        .unwrap();

    let by_id = users.get_by_id(created.user.id).await.unwrap();
    assert_eq!(by_id.username, "olive");

    let by_name = users.get_by_username("olive").await.unwrap();
    assert_eq!(by_name.id, created.user.id);

    assert!(
        users
            .get_by_username("nobody")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn duplicate_username_leaves_no_partial_signup() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());

    users
        .create_organisor(account("olive"), company("Acme"))
        .await
        .unwrap();
    let err = users
        .create_organisor(account("olive"), company("Other"))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::AlreadyExists { .. }));

    assert_eq!(count(&db, "organisation").await, 1);
    assert_eq!(count(&db, "user_profile").await, 1);
}

#[tokio::test]
async fn failed_organisation_step_leaves_no_orphaned_user() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());

    // The organisation name is rejected by the schema after the user
    // statement has already run inside the transaction.
    users
        .create_organisor(account("olive"), company(""))
        .await
        .unwrap_err();

    assert!(
        users
            .get_by_username("olive")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert_eq!(count(&db, "user").await, 0);
    assert_eq!(count(&db, "organisation").await, 0);
    assert_eq!(count(&db, "user_profile").await, 0);
}

#[tokio::test]
async fn user_without_profile_is_not_found() {
    let db = setup().await;
    let profiles = SurrealUserProfileRepository::new(db);

    assert!(
        profiles
            .get_by_user(Uuid::new_v4())
            .await
            .unwrap_err()
            .is_not_found()
    );
}

// -----------------------------------------------------------------------
// Agent accounts
// -----------------------------------------------------------------------

#[tokio::test]
async fn agent_account_creates_user_and_agent() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let agents = SurrealAgentRepository::new(db);
    let org = Uuid::new_v4();

    let agent = users
        .create_agent(
            account("alice"),
            CreateAgent {
                organisation_id: org,
                name: "Alice".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(agent.organisation_id, org);
    assert_eq!(agent.name, "Alice");

    let user = users.get_by_id(agent.user_id).await.unwrap();
    assert!(user.is_agent);
    assert!(!user.is_organisor);
    assert_eq!(agents.get_by_user(user.id).await.unwrap(), agent);
}

#[tokio::test]
async fn failed_agent_step_leaves_no_orphaned_user() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());

    users
        .create_agent(
            account("alice"),
            CreateAgent {
                organisation_id: Uuid::new_v4(),
                name: String::new(),
            },
        )
        .await
        .unwrap_err();

    assert!(
        users
            .get_by_username("alice")
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert_eq!(count(&db, "user").await, 0);
    assert_eq!(count(&db, "agent").await, 0);
}

#[tokio::test]
async fn agent_with_taken_username_is_rejected() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db.clone());

    users
        .create_organisor(account("olive"), company("Acme"))
        .await
        .unwrap();
    let err = users
        .create_agent(
            account("olive"),
            CreateAgent {
                organisation_id: Uuid::new_v4(),
                name: "Olive".into(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CrmError::AlreadyExists { .. }));
    assert_eq!(count(&db, "agent").await, 0);
}
