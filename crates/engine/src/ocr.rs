//! Parsing of the vision model's extraction output.
//!
//! The model replies with free-form text that should contain one JSON
//! object, often wrapped in markdown code fences. Nothing about the
//! reply can be trusted: fields may be missing, mistyped or out of
//! range, so every one of them is coerced or clamped into a valid
//! value before it can reach any financial arithmetic. Only a reply
//! that contains no parsable JSON object at all is a hard failure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{EngineError, MoneyCents, categories::DEFAULT_CATEGORY_NAMES};

const DEFAULT_VENDOR: &str = "Unknown";
const DEFAULT_CATEGORY: &str = "Other";
const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OcrItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: MoneyCents,
    pub total_price: MoneyCents,
}

/// Validated extraction result.
///
/// Every field holds a usable value; `raw_text` preserves the model's
/// reply verbatim for the review step.
#[derive(Clone, Debug, PartialEq)]
pub struct OcrExtraction {
    pub vendor: String,
    pub date: NaiveDate,
    pub subtotal: Option<MoneyCents>,
    pub tax: Option<MoneyCents>,
    pub tip: Option<MoneyCents>,
    pub total: MoneyCents,
    pub items: Vec<OcrItem>,
    pub suggested_category: String,
    pub confidence: f64,
    pub raw_text: String,
}

/// Strips a leading/trailing markdown code fence (```json ... ```).
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the fence's info string ("json") up to the first newline.
    let rest = match rest.find('\n') {
        Some(at) => &rest[at + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn coerce_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Coerces an optional monetary field. Wrong types, NaN and negative
/// values all collapse to `None`.
fn coerce_optional_money(value: Option<&Value>) -> Option<MoneyCents> {
    value
        .and_then(Value::as_f64)
        .and_then(MoneyCents::from_major_f64)
        .filter(|m| !m.is_negative())
}

fn coerce_date(value: Option<&Value>, today: NaiveDate) -> NaiveDate {
    coerce_string(value)
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
        .unwrap_or(today)
}

fn coerce_item(value: &Value) -> OcrItem {
    let quantity = value
        .get("quantity")
        .and_then(Value::as_f64)
        .filter(|q| q.is_finite() && *q > 0.0)
        .unwrap_or(1.0);

    let price = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_f64)
            .and_then(MoneyCents::from_major_f64)
            .filter(|m| !m.is_negative())
            .unwrap_or(MoneyCents::ZERO)
    };

    OcrItem {
        name: coerce_string(value.get("name")).unwrap_or_default(),
        quantity,
        unit_price: price("unit_price"),
        total_price: price("total_price"),
    }
}

/// Parses the model reply into a validated [`OcrExtraction`].
///
/// `today` substitutes an absent or unparseable date. Returns
/// [`EngineError::Upstream`] when the reply holds no JSON object.
pub fn parse_extraction(raw: &str, today: NaiveDate) -> Result<OcrExtraction, EngineError> {
    let stripped = strip_code_fence(raw);
    let parsed: Value = serde_json::from_str(stripped)
        .map_err(|err| EngineError::Upstream(format!("extraction is not valid JSON: {err}")))?;

    if !parsed.is_object() {
        return Err(EngineError::Upstream(
            "extraction is not a JSON object".to_string(),
        ));
    }

    let suggested_category = coerce_string(parsed.get("suggested_category"))
        .filter(|name| DEFAULT_CATEGORY_NAMES.contains(&name.as_str()))
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let confidence = parsed
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0));

    let total = parsed
        .get("total")
        .and_then(Value::as_f64)
        .and_then(MoneyCents::from_major_f64)
        .filter(|m| !m.is_negative())
        .unwrap_or(MoneyCents::ZERO);

    let items = parsed
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(coerce_item).collect())
        .unwrap_or_default();

    Ok(OcrExtraction {
        vendor: coerce_string(parsed.get("vendor")).unwrap_or_else(|| DEFAULT_VENDOR.to_string()),
        date: coerce_date(parsed.get("date"), today),
        subtotal: coerce_optional_money(parsed.get("subtotal")),
        tax: coerce_optional_money(parsed.get("tax")),
        tip: coerce_optional_money(parsed.get("tip")),
        total,
        items,
        suggested_category,
        confidence,
        raw_text: raw.to_string(),
    })
}
