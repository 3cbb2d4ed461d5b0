//! Integration tests for the Privilege repository using in-memory SurrealDB.

use keyward_core::error::KeywardError;
use keyward_core::models::group::CreateGroup;
use keyward_core::models::privilege::{CreatePrivilege, UpdatePrivilege};
use keyward_core::repository::{GroupRepository, Pagination, PrivilegeRepository};
use keyward_db::repository::{SurrealGroupRepository, SurrealPrivilegeRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    keyward_db::run_migrations(&db).await.unwrap();
    db
}

fn privilege(name: &str) -> CreatePrivilege {
    CreatePrivilege { name: name.into() }
}

#[tokio::test]
async fn create_and_lookup_by_name() {
    let repo = SurrealPrivilegeRepository::new(setup().await);

    let created = repo.create(privilege("admin")).await.unwrap();
    let by_name = repo.get_by_name("admin").await.unwrap();
    assert_eq!(by_name.id, created.id);

    let err = repo.get_by_name("Admin").await.unwrap_err();
    assert!(matches!(err, KeywardError::NotFound { .. }));
}

#[tokio::test]
async fn blank_name_fails_presence_validation() {
    let repo = SurrealPrivilegeRepository::new(setup().await);

    let err = repo.create(privilege("")).await.unwrap_err();
    assert!(matches!(err, KeywardError::Validation(ref e) if e.contains("name")));
}

#[tokio::test]
async fn duplicate_name_is_rejected() {
    let repo = SurrealPrivilegeRepository::new(setup().await);

    repo.create(privilege("admin")).await.unwrap();
    let err = repo.create(privilege("admin")).await.unwrap_err();
    assert!(matches!(err, KeywardError::AlreadyExists { .. }));
}

#[tokio::test]
async fn update_and_list() {
    let repo = SurrealPrivilegeRepository::new(setup().await);
    let created = repo.create(privilege("reports")).await.unwrap();
    repo.create(privilege("billing")).await.unwrap();

    let updated = repo
        .update(
            created.id,
            UpdatePrivilege {
                name: Some("audit".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "audit");

    let listed = repo.list(Pagination::default()).await.unwrap();
    assert_eq!(listed.total, 2);
    let names: Vec<_> = listed.items.into_iter().map(|p| p.name).collect();
    assert_eq!(names, ["audit", "billing"]);
}

#[tokio::test]
async fn delete_removes_links_but_keeps_groups() {
    let db = setup().await;
    let groups = SurrealGroupRepository::new(db.clone());
    let privileges = SurrealPrivilegeRepository::new(db);

    let admins = groups
        .create(CreateGroup {
            name: "Admins".into(),
        })
        .await
        .unwrap();
    let admin = privileges.create(privilege("admin")).await.unwrap();
    groups.grant_privilege(admins.id, admin.id).await.unwrap();

    let holders = privileges.get_groups(admin.id).await.unwrap();
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].id, admins.id);

    privileges.delete(admin.id).await.unwrap();

    assert!(groups.get_by_id(admins.id).await.is_ok());
    assert!(groups.get_privileges(admins.id).await.unwrap().is_empty());
}
