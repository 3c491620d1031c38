use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, Statement};

use engine::{BudgetHealth, Engine, EngineError, ExpenseDraft, MoneyCents};
use migration::MigratorTrait;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

fn may() -> (NaiveDate, NaiveDate) {
    ("2024-05-01".parse().unwrap(), "2024-05-31".parse().unwrap())
}

async fn spend(engine: &Engine, cents: i64, date: &str, category: Option<uuid::Uuid>) {
    engine
        .create_expense(
            "alice",
            &ExpenseDraft {
                vendor: "Somewhere".to_string(),
                amount: MoneyCents::new(cents),
                date: Some(date.parse().unwrap()),
                category_id: category,
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn upsert_creates_then_updates_the_same_scope() {
    let engine = engine_with_db().await;

    let (first, created) = engine
        .upsert_budget("alice", None, MoneyCents::new(50_000))
        .await
        .unwrap();
    assert!(created);

    let (second, created) = engine
        .upsert_budget("alice", None, MoneyCents::new(60_000))
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
    assert_eq!(second.amount.cents(), 60_000);

    let (from, to) = may();
    let statuses = engine.budget_statuses("alice", from, to).await.unwrap();
    assert_eq!(statuses.len(), 1);
}

#[tokio::test]
async fn scoped_and_overall_budgets_track_different_spend() {
    let engine = engine_with_db().await;
    let categories = engine.list_categories("alice").await.unwrap();
    let groceries = categories.iter().find(|c| c.name == "Groceries").unwrap();
    let dining = categories.iter().find(|c| c.name == "Dining").unwrap();

    spend(&engine, 4_000, "2024-05-05", Some(groceries.id)).await;
    spend(&engine, 4_000, "2024-05-10", Some(groceries.id)).await;
    spend(&engine, 1_000, "2024-05-12", Some(dining.id)).await;
    // Outside the window, must not count.
    spend(&engine, 99_999, "2024-06-01", Some(groceries.id)).await;

    engine
        .upsert_budget("alice", Some(groceries.id), MoneyCents::new(10_000))
        .await
        .unwrap();
    engine
        .upsert_budget("alice", None, MoneyCents::new(10_000))
        .await
        .unwrap();

    let (from, to) = may();
    let statuses = engine.budget_statuses("alice", from, to).await.unwrap();
    assert_eq!(statuses.len(), 2);

    let scoped = statuses
        .iter()
        .find(|s| s.budget.category_id == Some(groceries.id))
        .unwrap();
    assert_eq!(scoped.spent.cents(), 8_000);
    assert_eq!(scoped.percentage, 80.0);
    assert_eq!(scoped.health, BudgetHealth::Warning);
    assert_eq!(scoped.remaining.cents(), 2_000);

    let overall = statuses
        .iter()
        .find(|s| s.budget.category_id.is_none())
        .unwrap();
    assert_eq!(overall.spent.cents(), 9_000);
    assert_eq!(overall.health, BudgetHealth::Warning);
}

#[tokio::test]
async fn exceeded_budget_reports_negative_remaining() {
    let engine = engine_with_db().await;
    spend(&engine, 15_000, "2024-05-05", None).await;

    engine
        .upsert_budget("alice", None, MoneyCents::new(10_000))
        .await
        .unwrap();

    let (from, to) = may();
    let statuses = engine.budget_statuses("alice", from, to).await.unwrap();
    assert_eq!(statuses[0].health, BudgetHealth::Exceeded);
    assert_eq!(statuses[0].percentage, 150.0);
    assert_eq!(statuses[0].remaining.cents(), -5_000);
}

#[tokio::test]
async fn upsert_rejects_bad_input() {
    let engine = engine_with_db().await;

    let err = engine
        .upsert_budget("alice", None, MoneyCents::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .upsert_budget("alice", Some(uuid::Uuid::new_v4()), MoneyCents::new(100))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn delete_budget_removes_it() {
    let engine = engine_with_db().await;
    let (budget, _) = engine
        .upsert_budget("alice", None, MoneyCents::new(10_000))
        .await
        .unwrap();

    engine.delete_budget("alice", budget.id).await.unwrap();

    let (from, to) = may();
    assert!(engine.budget_statuses("alice", from, to).await.unwrap().is_empty());

    let err = engine.delete_budget("alice", budget.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
