use sea_orm::{ConnectionTrait, Database, Statement};

use engine::{Engine, ExpenseDraft, MoneyCents, export};
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

async fn spend(engine: &Engine, vendor: &str, cents: i64, date: &str, category: Option<uuid::Uuid>) {
    engine
        .create_expense(
            "alice",
            &ExpenseDraft {
                vendor: vendor.to_string(),
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
async fn report_aggregates_a_users_expenses() {
    let engine = engine_with_db().await;
    let categories = engine.list_categories("alice").await.unwrap();
    let dining = categories.iter().find(|c| c.name == "Dining").unwrap();
    let groceries = categories.iter().find(|c| c.name == "Groceries").unwrap();

    spend(&engine, "Bistro", 5000, "2024-01-15", Some(dining.id)).await;
    spend(&engine, "Market", 3000, "2024-01-20", Some(groceries.id)).await;
    spend(&engine, "Kiosk", 2000, "2024-02-01", None).await;

    // Another user's spend must never leak in.
    engine
        .create_expense(
            "bob",
            &ExpenseDraft {
                vendor: "Elsewhere".to_string(),
                amount: MoneyCents::new(99_999),
                date: Some("2024-01-10".parse().unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let report = engine.report("alice", None, None).await.unwrap();

    assert_eq!(report.stats.total_spent.cents(), 10_000);
    assert_eq!(report.stats.total_expenses, 3);
    assert_eq!(report.stats.avg_expense.cents(), 3333);
    assert_eq!(report.stats.top_category.as_deref(), Some("Dining"));

    assert_eq!(report.by_category[0].name, "Dining");
    assert_eq!(report.by_category[0].percentage, 50.0);
    assert!(report.by_category.iter().any(|c| c.name == "Uncategorized"));

    let months: Vec<&str> = report.by_month.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(months, vec!["2024-01", "2024-02"]);

    // Recent activity is newest first.
    assert_eq!(report.recent[0].vendor, "Kiosk");
    assert_eq!(report.recent[2].vendor, "Bistro");
}

#[tokio::test]
async fn report_honors_the_date_window() {
    let engine = engine_with_db().await;
    spend(&engine, "Inside", 1000, "2024-03-10", None).await;
    spend(&engine, "Before", 2000, "2024-02-28", None).await;
    spend(&engine, "After", 4000, "2024-04-01", None).await;

    let report = engine
        .report(
            "alice",
            Some("2024-03-01".parse().unwrap()),
            Some("2024-03-31".parse().unwrap()),
        )
        .await
        .unwrap();

    assert_eq!(report.stats.total_expenses, 1);
    assert_eq!(report.stats.total_spent.cents(), 1000);
    assert_eq!(report.recent[0].vendor, "Inside");
}

#[tokio::test]
async fn export_rows_resolve_category_names_and_encode() {
    let engine = engine_with_db().await;
    let categories = engine.list_categories("alice").await.unwrap();
    let groceries = categories.iter().find(|c| c.name == "Groceries").unwrap();

    spend(&engine, "Market", 3000, "2024-01-20", Some(groceries.id)).await;
    spend(&engine, "Kiosk", 2000, "2024-02-01", None).await;

    let rows = engine.export_rows("alice", None, None).await.unwrap();
    assert_eq!(rows.len(), 2);
    // Date descending, like the report.
    assert_eq!(rows[0].expense.vendor, "Kiosk");
    assert_eq!(rows[0].category_name, None);
    assert_eq!(rows[1].category_name.as_deref(), Some("Groceries"));

    let bytes = export::expenses_csv(&rows).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("2024-02-01,Kiosk,"));
    assert!(lines[1].contains(",Uncategorized,"));
    assert!(lines[2].contains(",Groceries,"));
    assert!(lines[2].contains(",30.00,"));
}
