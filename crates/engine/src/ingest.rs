//! Receipt ingestion pipeline.
//!
//! Three explicit steps, each driven by a caller request:
//!
//! 1. `register` reserves a blob slot and inserts a `pending` receipt.
//!    The image bytes never pass through this service's request body;
//!    the client writes them to the returned destination.
//! 2. `extract` claims the receipt, downloads and prepares the image,
//!    calls the vision model and parses its reply. Success lands on
//!    `review`, any failure on `failed` with the message recorded.
//! 3. `commit` turns a reviewed receipt into an expense in one
//!    transaction.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    BlobStore, Engine, EngineError, ResultEngine, VisionClient, imaging,
    ocr::{self, OcrExtraction},
    ops::{ExpenseDetail, ExpenseDraft},
    receipts::Receipt,
};

/// Upload content types the pipeline accepts, with the stored file
/// extension for each.
const ACCEPTED_CONTENT_TYPES: [(&str, &str); 3] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

/// Outcome of registering an upload: the pending receipt and where
/// the client must write the image bytes.
#[derive(Clone, Debug)]
pub struct RegisteredReceipt {
    pub receipt: Receipt,
    pub write_destination: String,
}

#[derive(Clone)]
pub struct ReceiptPipeline {
    engine: Arc<Engine>,
    blobs: Arc<dyn BlobStore>,
    vision: Arc<dyn VisionClient>,
}

impl ReceiptPipeline {
    pub fn new(
        engine: Arc<Engine>,
        blobs: Arc<dyn BlobStore>,
        vision: Arc<dyn VisionClient>,
    ) -> Self {
        Self {
            engine,
            blobs,
            vision,
        }
    }

    /// Registers an upload: validates the content type, reserves a
    /// unique blob path under the user's prefix and inserts the
    /// `pending` receipt row.
    pub async fn register(
        &self,
        user_id: &str,
        content_type: &str,
    ) -> ResultEngine<RegisteredReceipt> {
        let extension = extension_for(content_type)?;
        let path = format!("{user_id}/{}.{extension}", Uuid::new_v4());

        let write_destination = self.blobs.create_write_slot(&path).await?;
        let receipt = self.engine.create_receipt(user_id, &path).await?;

        tracing::info!(receipt_id = %receipt.id, "registered receipt upload");
        Ok(RegisteredReceipt {
            receipt,
            write_destination,
        })
    }

    /// Runs extraction for a receipt.
    ///
    /// The claim (`begin_extraction`) is a conditional state flip, so
    /// a receipt already processing or completed refuses. After the
    /// claim every failure path, download, decode, vision call or
    /// parse, is recorded on the row as `failed` before the error is
    /// returned. There is no automatic retry.
    pub async fn extract(&self, user_id: &str, receipt_id: Uuid) -> ResultEngine<OcrExtraction> {
        let receipt = self.engine.begin_extraction(user_id, receipt_id).await?;

        match self.run_extraction(&receipt).await {
            Ok(extraction) => {
                self.engine
                    .store_extraction(user_id, receipt_id, &extraction.raw_text, extraction.confidence)
                    .await?;
                Ok(extraction)
            }
            Err(err) => {
                tracing::error!(receipt_id = %receipt_id, error = %err, "extraction failed");
                if let Err(mark_err) = self
                    .engine
                    .fail_extraction(user_id, receipt_id, &err.to_string())
                    .await
                {
                    tracing::error!(
                        receipt_id = %receipt_id,
                        error = %mark_err,
                        "could not mark receipt as failed"
                    );
                }
                Err(err)
            }
        }
    }

    /// Commits a reviewed receipt into an expense. On failure the
    /// receipt stays in `review` and the draft can be resubmitted.
    pub async fn commit(
        &self,
        user_id: &str,
        receipt_id: Uuid,
        draft: &ExpenseDraft,
    ) -> ResultEngine<ExpenseDetail> {
        self.engine.commit_receipt(user_id, receipt_id, draft).await
    }

    async fn run_extraction(&self, receipt: &Receipt) -> ResultEngine<OcrExtraction> {
        let bytes = self.blobs.download(&receipt.image_path).await?;
        let prepared = imaging::prepare(&bytes)?;
        let reply = self
            .vision
            .extract(&prepared, imaging::PREPARED_MIME)
            .await?;
        ocr::parse_extraction(&reply, Utc::now().date_naive())
    }
}

fn extension_for(content_type: &str) -> ResultEngine<&'static str> {
    let normalized = content_type.trim().to_ascii_lowercase();
    ACCEPTED_CONTENT_TYPES
        .iter()
        .find(|(mime, _)| *mime == normalized)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| {
            EngineError::Validation(format!("unsupported image type: {content_type}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_content_types_map_to_extensions() {
        assert_eq!(extension_for("image/jpeg").unwrap(), "jpg");
        assert_eq!(extension_for(" image/PNG ").unwrap(), "png");
        assert_eq!(extension_for("image/webp").unwrap(), "webp");
    }

    #[test]
    fn other_content_types_are_rejected() {
        assert!(matches!(
            extension_for("application/pdf"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            extension_for("image/gif"),
            Err(EngineError::Validation(_))
        ));
    }
}
