//! Repository round trips against a real database.
//! Requires a PostgreSQL `DATABASE_URL`.

use assert_matches::assert_matches;
use koi_core::roles::{ROLE_CONSTRUCTOR, ROLE_CUSTOMER};
use koi_core::status::{ItemStatus, ProjectStatus, QuotationStatus, TaskStatus};
use koi_db::models::construction::NewConstructionItem;
use koi_db::models::project::CreateProject;
use koi_db::models::quotation::NewQuotation;
use koi_db::models::user::CreateUser;
use koi_db::models::user::User;
use koi_db::repositories::{
    ConstructionItemRepo, ConstructionTaskRepo, ProjectRepo, QuotationRepo, UserRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_user(pool: &PgPool, email: &str, role: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            full_name: "Test User".into(),
            email: email.into(),
            phone: None,
            password_hash: "not-a-real-hash".into(),
            role: role.into(),
        },
    )
    .await
    .unwrap()
}

fn new_project(name: &str) -> CreateProject {
    CreateProject {
        name: name.into(),
        address: "12 Lotus Street".into(),
        area: Some(20.0),
        depth: Some(1.5),
        note: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_project_staff_membership(pool: PgPool) {
    let customer = new_user(&pool, "owner@koi.test", ROLE_CUSTOMER).await;
    let constructor = new_user(&pool, "builder@koi.test", ROLE_CONSTRUCTOR).await;
    let project = ProjectRepo::create(&pool, customer.id, &new_project("Garden pond"))
        .await
        .unwrap();
    assert_eq!(project.status, ProjectStatus::Requesting);

    assert!(!ProjectRepo::is_member(&pool, project.id, constructor.id).await.unwrap());
    ProjectRepo::assign_staff(&pool, project.id, constructor.id).await.unwrap();
    assert!(ProjectRepo::is_member(&pool, project.id, constructor.id).await.unwrap());

    let err = ProjectRepo::assign_staff(&pool, project.id, constructor.id)
        .await
        .unwrap_err();
    assert_matches!(
        err.as_database_error().and_then(|e| e.constraint()),
        Some("uq_project_staffs_pair")
    );

    let staff = ProjectRepo::list_staff(&pool, project.id).await.unwrap();
    assert_eq!(staff.len(), 1);
    assert_eq!(staff[0].role, ROLE_CONSTRUCTOR);
    assert_eq!(ProjectRepo::list_by_staff(&pool, constructor.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_quotation_versions_increment(pool: PgPool) {
    let customer = new_user(&pool, "q@koi.test", ROLE_CUSTOMER).await;
    let project = ProjectRepo::create(&pool, customer.id, &new_project("Pond"))
        .await
        .unwrap();
    let input = NewQuotation {
        project_id: project.id,
        promotion_id: None,
        total_price: 1_000_000,
        discount_price: 100_000,
    };

    let first = QuotationRepo::create(&pool, &input).await.unwrap();
    let second = QuotationRepo::create(&pool, &input).await.unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);
    assert_eq!(second.final_price, 900_000);

    let reviewed = QuotationRepo::review(&pool, first.id, QuotationStatus::Approved, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reviewed.status, QuotationStatus::Approved);
    assert!(QuotationRepo::review(&pool, first.id, QuotationStatus::Rejected, Some("late"))
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_construction_tree_round_trip(pool: PgPool) {
    let customer = new_user(&pool, "tree@koi.test", ROLE_CUSTOMER).await;
    let project = ProjectRepo::create(&pool, customer.id, &new_project("Tree"))
        .await
        .unwrap();

    let parent = ConstructionItemRepo::create(
        &pool,
        &NewConstructionItem {
            project_id: project.id,
            parent_id: None,
            name: " Excavation ",
            description: None,
            estimate_at: None,
            is_payment: true,
        },
    )
    .await
    .unwrap();
    let child = ConstructionItemRepo::create(
        &pool,
        &NewConstructionItem {
            project_id: project.id,
            parent_id: Some(parent.id),
            name: "Dig",
            description: Some("Main basin"),
            estimate_at: None,
            is_payment: false,
        },
    )
    .await
    .unwrap();
    assert_eq!(parent.name, "Excavation");
    assert_eq!(child.status, ItemStatus::Opening);

    let task = ConstructionTaskRepo::create(&pool, child.id, "Mark outline", None)
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Opening);
    assert_eq!(ConstructionTaskRepo::count_by_item(&pool, child.id).await.unwrap(), 1);
    assert_eq!(ConstructionItemRepo::count_children(&pool, parent.id).await.unwrap(), 1);

    let done = ConstructionItemRepo::set_status(&pool, child.id, ItemStatus::Done)
        .await
        .unwrap();
    assert_eq!(done.status, ItemStatus::Done);
    assert!(done.actual_at.is_some());

    let all = ConstructionItemRepo::list_by_project(&pool, project.id).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[0].parent_id.is_none());
}
