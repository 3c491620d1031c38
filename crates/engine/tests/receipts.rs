use std::{
    collections::HashMap,
    io::Cursor,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, Database, Statement};

use engine::{
    BlobStore, Engine, EngineError, ExpenseDraft, ExpenseListFilter, MoneyCents, ReceiptPipeline,
    ReceiptStatus, VisionClient,
};
use migration::MigratorTrait;

async fn engine_with_db() -> Arc<Engine> {
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
    Arc::new(Engine::builder().database(db).build().await.unwrap())
}

#[derive(Default)]
struct MemoryBlobStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    fn put(&self, path: &str, bytes: Vec<u8>) {
        self.files.lock().unwrap().insert(path.to_string(), bytes);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn create_write_slot(&self, path: &str) -> Result<String, EngineError> {
        Ok(format!("mem://{path}"))
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, EngineError> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::Upstream("blob missing".to_string()))
    }
}

struct StaticVision {
    reply: String,
}

#[async_trait]
impl VisionClient for StaticVision {
    async fn extract(&self, _image: &[u8], _mime_type: &str) -> Result<String, EngineError> {
        Ok(self.reply.clone())
    }
}

struct FailingVision;

#[async_trait]
impl VisionClient for FailingVision {
    async fn extract(&self, _image: &[u8], _mime_type: &str) -> Result<String, EngineError> {
        Err(EngineError::Upstream("vision endpoint returned 500".to_string()))
    }
}

fn receipt_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(64, 64, image::Rgb([240, 240, 240]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn good_reply() -> String {
    r#"```json
{
    "vendor": "Trader Joe's",
    "date": "2024-06-01",
    "subtotal": 18.50,
    "tax": 1.50,
    "tip": null,
    "total": 20.00,
    "items": [
        {"name": "Milk", "quantity": 2, "unit_price": 3.25, "total_price": 6.50}
    ],
    "suggested_category": "Groceries",
    "confidence": 0.92
}
```"#
        .to_string()
}

fn pipeline_with(
    engine: Arc<Engine>,
    blobs: Arc<MemoryBlobStore>,
    vision: Arc<dyn VisionClient>,
) -> ReceiptPipeline {
    ReceiptPipeline::new(engine, blobs, vision)
}

#[tokio::test]
async fn register_validates_content_type_and_creates_pending_receipt() {
    let engine = engine_with_db().await;
    let blobs = Arc::new(MemoryBlobStore::default());
    let pipeline = pipeline_with(
        engine.clone(),
        blobs,
        Arc::new(StaticVision { reply: good_reply() }),
    );

    let err = pipeline.register("alice", "application/pdf").await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let registered = pipeline.register("alice", "image/png").await.unwrap();
    assert_eq!(registered.receipt.status, ReceiptStatus::Pending);
    assert!(registered.receipt.image_path.starts_with("alice/"));
    assert!(registered.receipt.image_path.ends_with(".png"));
    assert!(registered.write_destination.contains(&registered.receipt.image_path));

    let listed = engine.list_receipts("alice").await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn successful_extraction_lands_on_review() {
    let engine = engine_with_db().await;
    let blobs = Arc::new(MemoryBlobStore::default());
    let pipeline = pipeline_with(
        engine.clone(),
        blobs.clone(),
        Arc::new(StaticVision { reply: good_reply() }),
    );

    let registered = pipeline.register("alice", "image/png").await.unwrap();
    blobs.put(&registered.receipt.image_path, receipt_png());

    let extraction = pipeline.extract("alice", registered.receipt.id).await.unwrap();
    assert_eq!(extraction.vendor, "Trader Joe's");
    assert_eq!(extraction.total.cents(), 2000);
    assert_eq!(extraction.suggested_category, "Groceries");

    let receipt = engine.receipt("alice", registered.receipt.id).await.unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Review);
    assert_eq!(receipt.confidence, Some(0.92));
    assert!(receipt.raw_ocr_text.unwrap().contains("Trader Joe's"));
    assert!(receipt.error_message.is_none());
}

#[tokio::test]
async fn failed_extraction_records_the_error_and_creates_no_expense() {
    let engine = engine_with_db().await;
    let blobs = Arc::new(MemoryBlobStore::default());
    let pipeline = pipeline_with(engine.clone(), blobs.clone(), Arc::new(FailingVision));

    let registered = pipeline.register("alice", "image/jpeg").await.unwrap();
    blobs.put(&registered.receipt.image_path, receipt_png());

    let err = pipeline.extract("alice", registered.receipt.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Upstream(_)));

    let receipt = engine.receipt("alice", registered.receipt.id).await.unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Failed);
    assert!(receipt.error_message.unwrap().contains("vision endpoint"));

    let page = engine
        .list_expenses("alice", &ExpenseListFilter::default(), 1, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn missing_blob_and_garbage_image_both_fail_the_receipt() {
    let engine = engine_with_db().await;
    let blobs = Arc::new(MemoryBlobStore::default());
    let pipeline = pipeline_with(
        engine.clone(),
        blobs.clone(),
        Arc::new(StaticVision { reply: good_reply() }),
    );

    // Nothing was ever written to the slot.
    let registered = pipeline.register("alice", "image/png").await.unwrap();
    let err = pipeline.extract("alice", registered.receipt.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Upstream(_)));
    let receipt = engine.receipt("alice", registered.receipt.id).await.unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Failed);

    // Bytes that do not decode as an image.
    let registered = pipeline.register("alice", "image/png").await.unwrap();
    blobs.put(&registered.receipt.image_path, b"not an image".to_vec());
    let err = pipeline.extract("alice", registered.receipt.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Upstream(_)));
    let receipt = engine.receipt("alice", registered.receipt.id).await.unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Failed);
}

#[tokio::test]
async fn a_processing_receipt_refuses_a_second_extraction() {
    let engine = engine_with_db().await;
    let blobs = Arc::new(MemoryBlobStore::default());
    let pipeline = pipeline_with(
        engine.clone(),
        blobs.clone(),
        Arc::new(StaticVision { reply: good_reply() }),
    );

    let registered = pipeline.register("alice", "image/png").await.unwrap();
    blobs.put(&registered.receipt.image_path, receipt_png());

    // Claim it out-of-band, as a concurrent request would.
    engine
        .begin_extraction("alice", registered.receipt.id)
        .await
        .unwrap();

    let err = pipeline.extract("alice", registered.receipt.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidStatus(_)));

    // The concurrent claim is untouched.
    let receipt = engine.receipt("alice", registered.receipt.id).await.unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Processing);
}

#[tokio::test]
async fn failed_receipts_can_be_retried() {
    let engine = engine_with_db().await;
    let blobs = Arc::new(MemoryBlobStore::default());

    let failing = pipeline_with(engine.clone(), blobs.clone(), Arc::new(FailingVision));
    let registered = failing.register("alice", "image/png").await.unwrap();
    blobs.put(&registered.receipt.image_path, receipt_png());
    failing.extract("alice", registered.receipt.id).await.unwrap_err();

    let working = pipeline_with(
        engine.clone(),
        blobs.clone(),
        Arc::new(StaticVision { reply: good_reply() }),
    );
    working.extract("alice", registered.receipt.id).await.unwrap();

    let receipt = engine.receipt("alice", registered.receipt.id).await.unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Review);
    assert!(receipt.error_message.is_none());
}

#[tokio::test]
async fn commit_creates_one_linked_expense_and_completes_the_receipt() {
    let engine = engine_with_db().await;
    let blobs = Arc::new(MemoryBlobStore::default());
    let pipeline = pipeline_with(
        engine.clone(),
        blobs.clone(),
        Arc::new(StaticVision { reply: good_reply() }),
    );

    let registered = pipeline.register("alice", "image/png").await.unwrap();
    blobs.put(&registered.receipt.image_path, receipt_png());
    pipeline.extract("alice", registered.receipt.id).await.unwrap();

    let draft = ExpenseDraft {
        vendor: "Trader Joe's".to_string(),
        amount: MoneyCents::new(2000),
        date: Some("2024-06-01".parse().unwrap()),
        ..Default::default()
    };
    let detail = pipeline
        .commit("alice", registered.receipt.id, &draft)
        .await
        .unwrap();
    assert_eq!(detail.expense.receipt_id, Some(registered.receipt.id));

    let receipt = engine.receipt("alice", registered.receipt.id).await.unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Completed);

    // Terminal: neither another commit nor another extraction.
    let err = pipeline
        .commit("alice", registered.receipt.id, &draft)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidStatus(_)));
    let err = pipeline.extract("alice", registered.receipt.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidStatus(_)));

    let page = engine
        .list_expenses("alice", &ExpenseListFilter::default(), 1, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn a_failed_commit_leaves_the_receipt_reviewable() {
    let engine = engine_with_db().await;
    let blobs = Arc::new(MemoryBlobStore::default());
    let pipeline = pipeline_with(
        engine.clone(),
        blobs.clone(),
        Arc::new(StaticVision { reply: good_reply() }),
    );

    let registered = pipeline.register("alice", "image/png").await.unwrap();
    blobs.put(&registered.receipt.image_path, receipt_png());
    pipeline.extract("alice", registered.receipt.id).await.unwrap();

    let bad_draft = ExpenseDraft {
        vendor: "Trader Joe's".to_string(),
        amount: MoneyCents::ZERO,
        ..Default::default()
    };
    let err = pipeline
        .commit("alice", registered.receipt.id, &bad_draft)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    // Rolled back: still review, and retrying with a good draft works.
    let receipt = engine.receipt("alice", registered.receipt.id).await.unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Review);

    let good_draft = ExpenseDraft {
        vendor: "Trader Joe's".to_string(),
        amount: MoneyCents::new(2000),
        date: Some("2024-06-01".parse().unwrap()),
        ..Default::default()
    };
    pipeline
        .commit("alice", registered.receipt.id, &good_draft)
        .await
        .unwrap();
}
