//! Integration tests for the Lead repository using in-memory SurrealDB.

use crm_core::error::CrmError;
use crm_core::models::agent::{Agent, CreateAgent};
use crm_core::models::category::{Category, CreateCategory};
use crm_core::models::lead::{CreateLead, LeadFilter, LeadState, RefFilter, UpdateLead};
use crm_core::models::user::CreateUser;
use crm_core::repository::{AgentRepository, CategoryRepository, LeadRepository, UserRepository};
use crm_db::repository::{
    SurrealAgentRepository, SurrealCategoryRepository, SurrealLeadRepository,
    SurrealUserRepository,
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

fn lead(organisation_id: Uuid, first_name: &str) -> CreateLead {
    CreateLead {
        organisation_id,
        first_name: first_name.into(),
        last_name: "Doe".into(),
        age: 30,
    }
}

async fn hire(db: &Surreal<Db>, organisation_id: Uuid, username: &str) -> Agent {
    SurrealUserRepository::new(db.clone())
        .create_agent(
            CreateUser {
                username: username.into(),
                email: format!("{username}@example.com"),
                first_name: "Alice".into(),
                last_name: "Agent".into(),
                password: "correct-horse-battery".into(),
            },
            CreateAgent {
                organisation_id,
                name: username.into(),
            },
        )
        .await
        .unwrap()
}

async fn category(db: &Surreal<Db>, organisation_id: Uuid, name: &str) -> Category {
    SurrealCategoryRepository::new(db.clone())
        .create(CreateCategory {
            organisation_id,
            name: name.into(),
        })
        .await
        .unwrap()
}

fn scope(organisation_id: Uuid) -> LeadFilter {
    LeadFilter::organisation(organisation_id)
}

#[tokio::test]
async fn new_lead_is_unassigned_and_uncategorised() {
    let db = setup().await;
    let repo = SurrealLeadRepository::new(db);
    let org = Uuid::new_v4();

    let created = repo.create(lead(org, "Jane")).await.unwrap();
    assert_eq!(created.organisation_id, org);
    assert_eq!(created.full_name(), "Jane Doe");
    assert_eq!(created.age, 30);
    assert_eq!(created.state(), LeadState::UnassignedUncategorised);

    let fetched = repo.get_by_id(org, created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn lead_of_other_organisation_is_not_found() {
    let db = setup().await;
    let repo = SurrealLeadRepository::new(db.clone());
    let org = Uuid::new_v4();
    let other = Uuid::new_v4();

    let created = repo.create(lead(org, "Jane")).await.unwrap();
    let outsider = hire(&db, other, "mallory").await;

    assert!(repo.get_by_id(other, created.id).await.unwrap_err().is_not_found());
    assert!(
        repo.set_agent(scope(other), created.id, Some(outsider.id))
            .await
            .unwrap_err()
            .is_not_found()
    );

    // Deleting through the wrong organisation leaves the lead in place.
    repo.delete(other, created.id).await.unwrap();
    assert!(repo.get_by_id(org, created.id).await.is_ok());
}

#[tokio::test]
async fn filters_select_by_assignment_and_category() {
    let db = setup().await;
    let repo = SurrealLeadRepository::new(db.clone());
    let org = Uuid::new_v4();
    let agent = hire(&db, org, "alice").await.id;
    let category = category(&db, org, "Contacted").await.id;

    let plain = repo.create(lead(org, "Plain")).await.unwrap();
    let assigned = repo.create(lead(org, "Assigned")).await.unwrap();
    let filed = repo.create(lead(org, "Filed")).await.unwrap();
    repo.create(lead(Uuid::new_v4(), "Elsewhere")).await.unwrap();

    repo.set_agent(scope(org), assigned.id, Some(agent)).await.unwrap();
    repo.set_agent(scope(org), filed.id, Some(agent)).await.unwrap();
    repo.set_category(scope(org), filed.id, Some(category))
        .await
        .unwrap();

    let all = repo.find_all(scope(org)).await.unwrap();
    assert_eq!(all.len(), 3);

    let unassigned = repo
        .find_all(scope(org).with_agent(RefFilter::IsNull))
        .await
        .unwrap();
    assert_eq!(unassigned.len(), 1);
    assert_eq!(unassigned[0].id, plain.id);

    let mine = repo
        .find_all(scope(org).with_agent(RefFilter::Equals(agent)))
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);

    let in_category = repo
        .find_all(
            scope(org)
                .with_agent(RefFilter::IsSet)
                .with_category(RefFilter::Equals(category)),
        )
        .await
        .unwrap();
    assert_eq!(in_category.len(), 1);
    assert_eq!(in_category[0].id, filed.id);
    assert_eq!(in_category[0].state(), LeadState::AssignedCategorised);
}

#[tokio::test]
async fn count_matches_find_all() {
    let db = setup().await;
    let repo = SurrealLeadRepository::new(db.clone());
    let org = Uuid::new_v4();
    let contacted = category(&db, org, "Contacted").await;

    let uncategorised = scope(org).with_category(RefFilter::IsNull);
    assert_eq!(repo.count(uncategorised).await.unwrap(), 0);

    let first = repo.create(lead(org, "One")).await.unwrap();
    repo.create(lead(org, "Two")).await.unwrap();
    repo.set_category(scope(org), first.id, Some(contacted.id))
        .await
        .unwrap();

    assert_eq!(repo.count(uncategorised).await.unwrap(), 1);
    assert_eq!(repo.count(scope(org)).await.unwrap(), 2);
}

#[tokio::test]
async fn clearing_category_keeps_assignment() {
    let db = setup().await;
    let repo = SurrealLeadRepository::new(db.clone());
    let org = Uuid::new_v4();
    let agent = hire(&db, org, "alice").await.id;
    let contacted = category(&db, org, "Contacted").await;

    let created = repo.create(lead(org, "Jane")).await.unwrap();
    repo.set_agent(scope(org), created.id, Some(agent)).await.unwrap();
    repo.set_category(scope(org), created.id, Some(contacted.id))
        .await
        .unwrap();

    let cleared = repo
        .set_category(scope(org), created.id, None)
        .await
        .unwrap();
    assert_eq!(cleared.category_id, None);
    assert_eq!(cleared.agent_id, Some(agent));
}

#[tokio::test]
async fn assigning_deleted_agent_is_rejected() {
    let db = setup().await;
    let repo = SurrealLeadRepository::new(db.clone());
    let agents = SurrealAgentRepository::new(db.clone());
    let org = Uuid::new_v4();

    let agent = hire(&db, org, "alice").await;
    let created = repo.create(lead(org, "Jane")).await.unwrap();

    // The agent disappears between the caller's lookup and the write.
    agents.delete(org, agent.id).await.unwrap();

    let err = repo
        .set_agent(scope(org), created.id, Some(agent.id))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Validation { .. }), "got {err:?}");

    let unchanged = repo.get_by_id(org, created.id).await.unwrap();
    assert_eq!(unchanged.agent_id, None);
    assert_eq!(unchanged.updated_at, created.updated_at);
}

#[tokio::test]
async fn references_from_other_organisations_are_rejected() {
    let db = setup().await;
    let repo = SurrealLeadRepository::new(db.clone());
    let org = Uuid::new_v4();
    let other = Uuid::new_v4();

    let foreign_agent = hire(&db, other, "mallory").await;
    let foreign_category = category(&db, other, "Contacted").await;
    let created = repo.create(lead(org, "Jane")).await.unwrap();

    let err = repo
        .set_agent(scope(org), created.id, Some(foreign_agent.id))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Validation { .. }), "got {err:?}");

    let err = repo
        .set_category(scope(org), created.id, Some(foreign_category.id))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Validation { .. }), "got {err:?}");

    let err = repo
        .set_category(scope(org), created.id, Some(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Validation { .. }), "got {err:?}");

    let unchanged = repo.get_by_id(org, created.id).await.unwrap();
    assert_eq!(unchanged.state(), LeadState::UnassignedUncategorised);
}

#[tokio::test]
async fn agent_scope_only_reaches_own_leads() {
    let db = setup().await;
    let repo = SurrealLeadRepository::new(db.clone());
    let org = Uuid::new_v4();
    let alice = hire(&db, org, "alice").await.id;
    let bob = hire(&db, org, "bob").await.id;
    let contacted = category(&db, org, "Contacted").await.id;

    let hers = repo.create(lead(org, "Hers")).await.unwrap();
    let his = repo.create(lead(org, "His")).await.unwrap();
    repo.set_agent(scope(org), hers.id, Some(alice)).await.unwrap();
    repo.set_agent(scope(org), his.id, Some(bob)).await.unwrap();

    let alice_scope = scope(org).with_agent(RefFilter::Equals(alice));

    let filed = repo
        .set_category(alice_scope, hers.id, Some(contacted))
        .await
        .unwrap();
    assert_eq!(filed.category_id, Some(contacted));

    // A lead assigned to another agent is outside Alice's reach.
    assert!(
        repo.set_category(alice_scope, his.id, Some(contacted))
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert_eq!(repo.get_by_id(org, his.id).await.unwrap().category_id, None);
}

#[tokio::test]
async fn update_changes_details_only() {
    let db = setup().await;
    let repo = SurrealLeadRepository::new(db.clone());
    let org = Uuid::new_v4();
    let agent = hire(&db, org, "alice").await.id;

    let created = repo.create(lead(org, "Jane")).await.unwrap();
    repo.set_agent(scope(org), created.id, Some(agent)).await.unwrap();

    let updated = repo
        .update(
            org,
            created.id,
            UpdateLead {
                age: Some(31),
                last_name: Some("Smith".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.full_name(), "Jane Smith");
    assert_eq!(updated.age, 31);
    assert_eq!(updated.agent_id, Some(agent));
}

#[tokio::test]
async fn deleted_lead_is_gone() {
    let db = setup().await;
    let repo = SurrealLeadRepository::new(db);
    let org = Uuid::new_v4();

    let created = repo.create(lead(org, "Jane")).await.unwrap();
    repo.delete(org, created.id).await.unwrap();

    assert!(repo.get_by_id(org, created.id).await.unwrap_err().is_not_found());
    assert!(repo.find_all(scope(org)).await.unwrap().is_empty());
}
