//! Vision/OCR collaborator.
//!
//! The shipped client talks to an OpenAI-compatible chat completions
//! endpoint with the receipt image inlined as a base64 data URL. The
//! reply is free-form text; [`crate::ocr`] turns it into structured
//! data.

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{Value, json};

use crate::EngineError;

const EXTRACTION_PROMPT: &str = r#"You are a receipt data extraction assistant. Analyze this receipt image and extract the following information in JSON format:

{
  "vendor": "Store/restaurant name",
  "date": "YYYY-MM-DD format",
  "subtotal": number or null,
  "tax": number or null,
  "tip": number or null,
  "total": number (the final total amount),
  "items": [
    {
      "name": "Item description",
      "quantity": number,
      "unit_price": number,
      "total_price": number
    }
  ],
  "suggested_category": "One of: Groceries, Dining, Transportation, Shopping, Utilities, Healthcare, Entertainment, Travel, Education, Other",
  "confidence": number between 0 and 1 indicating how confident you are in the extraction
}

Rules:
- If you can't determine a field, use null
- All monetary values should be numbers (not strings)
- Date must be in YYYY-MM-DD format. If year is unclear, use the current year
- For items, extract as many line items as visible
- quantity defaults to 1 if not specified
- confidence should reflect how clearly the receipt is readable
- suggested_category should be your best guess based on the vendor name and items

Return ONLY the JSON object, no other text."#;

#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Sends the image to the extraction model and returns the raw
    /// reply text. No structured-output guarantee.
    async fn extract(&self, image: &[u8], mime_type: &str) -> Result<String, EngineError>;
}

/// OpenAI-compatible chat completions client.
#[derive(Clone, Debug)]
pub struct HttpVisionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpVisionClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl VisionClient for HttpVisionClient {
    async fn extract(&self, image: &[u8], mime_type: &str) -> Result<String, EngineError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": EXTRACTION_PROMPT},
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:{mime_type};base64,{encoded}"),
                            "detail": "high",
                        },
                    },
                ],
            }],
            "max_tokens": 4096,
            "temperature": 0,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| EngineError::Upstream(format!("vision request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("vision endpoint returned {status}");
            return Err(EngineError::Upstream(format!(
                "vision endpoint returned {status}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| EngineError::Upstream(format!("vision reply unreadable: {err}")))?;

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(EngineError::Upstream(
                "vision reply contained no content".to_string(),
            ));
        }

        Ok(content.to_string())
    }
}
