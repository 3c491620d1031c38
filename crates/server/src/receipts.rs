//! Receipt API endpoints.
//!
//! Uploads are three round-trips: register the upload, extract once
//! the bytes are in place, then commit the reviewed draft into an
//! expense.

use api_types::{
    expense::{ExpenseDetail, ExpenseNew},
    receipt::{ExtractedItem, Extraction, Receipt, ReceiptRegister, RegisteredReceipt},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::MoneyCents;
use uuid::Uuid;

use crate::{ServerError, expenses, server::ServerState, user};

fn to_api(receipt: engine::Receipt) -> Receipt {
    Receipt {
        id: receipt.id,
        status: receipt.status.as_str().to_string(),
        image_path: receipt.image_path,
        raw_ocr_text: receipt.raw_ocr_text,
        confidence: receipt.confidence,
        error_message: receipt.error_message,
        created_at: receipt.created_at,
        updated_at: receipt.updated_at,
    }
}

fn to_api_extraction(extraction: engine::OcrExtraction) -> Extraction {
    Extraction {
        vendor: extraction.vendor,
        date: extraction.date,
        subtotal_cents: extraction.subtotal.map(MoneyCents::cents),
        tax_cents: extraction.tax.map(MoneyCents::cents),
        tip_cents: extraction.tip.map(MoneyCents::cents),
        total_cents: extraction.total.cents(),
        items: extraction
            .items
            .into_iter()
            .map(|item| ExtractedItem {
                name: item.name,
                quantity: item.quantity,
                unit_price_cents: item.unit_price.cents(),
                total_price_cents: item.total_price.cents(),
            })
            .collect(),
        suggested_category: extraction.suggested_category,
        confidence: extraction.confidence,
    }
}

pub async fn register(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ReceiptRegister>,
) -> Result<(StatusCode, Json<RegisteredReceipt>), ServerError> {
    let registered = state
        .pipeline
        .register(&user.username, &payload.content_type)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisteredReceipt {
            receipt: to_api(registered.receipt),
            write_destination: registered.write_destination,
        }),
    ))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<Receipt>>, ServerError> {
    let receipts = state.engine.list_receipts(&user.username).await?;
    Ok(Json(receipts.into_iter().map(to_api).collect()))
}

pub async fn get_detail(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Receipt>, ServerError> {
    let receipt = state.engine.receipt(&user.username, id).await?;
    Ok(Json(to_api(receipt)))
}

pub async fn extract(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Extraction>, ServerError> {
    let extraction = state.pipeline.extract(&user.username, id).await?;
    Ok(Json(to_api_extraction(extraction)))
}

pub async fn commit(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseDetail>), ServerError> {
    let detail = state
        .pipeline
        .commit(&user.username, id, &expenses::draft_from(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(expenses::to_api_detail(detail))))
}
