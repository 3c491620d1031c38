use sea_orm::{ConnectionTrait, Database, Statement};

use engine::{Engine, EngineError, ExpenseDraft, MoneyCents};
use migration::MigratorTrait;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for user in ["alice", "bob"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![user.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    Engine::builder().database(db).build().await.unwrap()
}

#[tokio::test]
async fn default_categories_are_seeded_for_everyone() {
    let engine = engine_with_db().await;

    let categories = engine.list_categories("alice").await.unwrap();
    assert_eq!(categories.len(), 10);
    assert!(categories.iter().all(|c| c.is_default));
    assert_eq!(categories[0].name, "Groceries");
    assert!(categories.iter().any(|c| c.name == "Other"));

    // Same set for another user.
    let other = engine.list_categories("bob").await.unwrap();
    assert_eq!(other.len(), 10);
}

#[tokio::test]
async fn own_categories_are_listed_after_defaults_and_stay_private() {
    let engine = engine_with_db().await;

    let created = engine
        .create_category("alice", "Pets", "paw-print", "#994411")
        .await
        .unwrap();
    assert!(!created.is_default);

    let alice_view = engine.list_categories("alice").await.unwrap();
    assert_eq!(alice_view.len(), 11);
    assert_eq!(alice_view.last().unwrap().name, "Pets");

    let bob_view = engine.list_categories("bob").await.unwrap();
    assert_eq!(bob_view.len(), 10);
}

#[tokio::test]
async fn duplicate_category_names_are_rejected() {
    let engine = engine_with_db().await;

    engine
        .create_category("alice", "Pets", "paw-print", "#994411")
        .await
        .unwrap();
    let err = engine
        .create_category("alice", "Pets", "paw-print", "#994411")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    // Colliding with a seeded default counts too.
    let err = engine
        .create_category("alice", "Dining", "utensils", "#f97316")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

#[tokio::test]
async fn category_validation_errors() {
    let engine = engine_with_db().await;

    let err = engine
        .create_category("alice", "   ", "x", "#123456")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_category("alice", &"x".repeat(51), "x", "#123456")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_category("alice", "Pets", "paw-print", "red")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn deleting_a_category_orphans_expenses_and_drops_its_budget() {
    let engine = engine_with_db().await;
    let category = engine
        .create_category("alice", "Pets", "paw-print", "#994411")
        .await
        .unwrap();

    let expense = engine
        .create_expense(
            "alice",
            &ExpenseDraft {
                vendor: "Vet".to_string(),
                amount: MoneyCents::new(4500),
                date: Some("2024-05-01".parse().unwrap()),
                category_id: Some(category.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    engine
        .upsert_budget("alice", Some(category.id), MoneyCents::new(10_000))
        .await
        .unwrap();

    engine.delete_category("alice", category.id).await.unwrap();

    // The expense lives on, uncategorized.
    let detail = engine.expense("alice", expense.expense.id).await.unwrap();
    assert!(detail.category.is_none());
    assert!(detail.expense.category_id.is_none());

    // The scoped budget went with its category.
    let statuses = engine
        .budget_statuses(
            "alice",
            "2024-05-01".parse().unwrap(),
            "2024-05-31".parse().unwrap(),
        )
        .await
        .unwrap();
    assert!(statuses.is_empty());
}

#[tokio::test]
async fn default_and_foreign_categories_cannot_be_deleted() {
    let engine = engine_with_db().await;

    let defaults = engine.list_categories("alice").await.unwrap();
    let err = engine
        .delete_category("alice", defaults[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let bobs = engine
        .create_category("bob", "Secret", "lock", "#000000")
        .await
        .unwrap();
    let err = engine.delete_category("alice", bobs.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn tags_crud_and_link_cleanup() {
    let engine = engine_with_db().await;

    let zebra = engine.create_tag("alice", "zebra", "#111111").await.unwrap();
    engine.create_tag("alice", "apple", "#222222").await.unwrap();

    let err = engine.create_tag("alice", "zebra", "#111111").await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let listed = engine.list_tags("alice").await.unwrap();
    let names: Vec<&str> = listed.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["apple", "zebra"]);

    let expense = engine
        .create_expense(
            "alice",
            &ExpenseDraft {
                vendor: "Zoo".to_string(),
                amount: MoneyCents::new(3000),
                date: Some("2024-05-01".parse().unwrap()),
                tag_ids: vec![zebra.id],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    engine.delete_tag("alice", zebra.id).await.unwrap();

    // The expense survives without the link.
    let detail = engine.expense("alice", expense.expense.id).await.unwrap();
    assert!(detail.tags.is_empty());
    assert_eq!(engine.list_tags("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn tag_name_length_is_bounded() {
    let engine = engine_with_db().await;

    let err = engine
        .create_tag("alice", &"x".repeat(31), "#123456")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
