use serde_json::json;
use tracing::{info, warn};

use super::client::{EnrichError, GeminiClient};
use super::types::{GenerateContentResponse, MedicineInfo};
use crate::translit;

/// Looks up a short description, active ingredient and analogs for a medicine.
///
/// Without a configured client every call fails with `MissingCredential`
/// and nothing is sent over the network.
#[derive(Clone)]
pub struct EnrichmentProxy {
    client: Option<GeminiClient>,
}

impl EnrichmentProxy {
    pub fn new(client: Option<GeminiClient>) -> Self {
        Self { client }
    }

    pub async fn enrich(&self, name: &str) -> Result<MedicineInfo, EnrichError> {
        let client = self.client.as_ref().ok_or(EnrichError::MissingCredential)?;

        let latin = translit::normalize(name);
        info!(name = %latin, "requesting medicine info");

        let response = client
            .generate_structured(&build_prompt(&latin), response_schema())
            .await?;
        extract_info(&response).inspect_err(|e| warn!(error = %e, "unusable Gemini reply"))
    }
}

fn build_prompt(name: &str) -> String {
    format!(
        "Sen farmatsevtika bo'yicha yordamchisan. \"{name}\" nomli dori haqida o'zbek tilida \
         (lotin yozuvida) ma'lumot ber: qisqa_tavsif maydoniga 1-2 gapdan iborat qisqa tavsif, \
         faol_modda maydoniga asosiy faol moddasi, analoglar maydoniga esa 3-5 ta analog dori \
         nomini yoz. Faqat berilgan JSON sxemasiga mos javob qaytar."
    )
}

fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "qisqa_tavsif": {"type": "STRING"},
            "faol_modda": {"type": "STRING"},
            "analoglar": {"type": "ARRAY", "items": {"type": "STRING"}}
        },
        "required": ["qisqa_tavsif", "faol_modda", "analoglar"]
    })
}

/// Parse the JSON text of the first candidate's first part.
fn extract_info(response: &GenerateContentResponse) -> Result<MedicineInfo, EnrichError> {
    let text = response
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.content.as_ref())
        .and_then(|content| content.parts.first())
        .map(|part| part.text.as_str())
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| EnrichError::MalformedResponse("no candidate text".to_string()))?;

    serde_json::from_str(strip_code_fence(text))
        .map_err(|e| EnrichError::MalformedResponse(e.to_string()))
}

/// Models occasionally wrap JSON in a Markdown fence despite the MIME type.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
