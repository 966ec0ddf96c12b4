use std::env;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("GEMINI_API_KEY serverda sozlanmagan.")]
    MissingCredential,

    #[error("Gemini API xatosi ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Gemini javobini o'qib bo'lmadi: {0}")]
    MalformedResponse(String),

    #[error("Gemini API bilan bog'lanib bo'lmadi.")]
    Unreachable(#[source] reqwest::Error),

    #[error("Dori ma'lumotini olishda ichki xatolik yuz berdi.")]
    Internal(String),
}

impl From<reqwest::Error> for EnrichError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            EnrichError::Unreachable(e)
        } else {
            EnrichError::Internal(e.to_string())
        }
    }
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Clone, Debug)]
pub struct GeminiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn from_env(http: Client) -> Result<Self, EnrichError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| EnrichError::MissingCredential)?;
        if api_key.trim().is_empty() {
            return Err(EnrichError::MissingCredential);
        }
        let model = env::var("GEMINI_MODEL")
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            model,
            base_url: API_BASE.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
        }
    }

    /// Send `prompt` and require a JSON reply shaped by `schema`.
    pub async fn generate_structured(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> Result<GenerateContentResponse, EnrichError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
                role: Some("user".to_string()),
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            },
        };

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, "Gemini API unreachable"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Gemini API error");
            return Err(EnrichError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let body: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| EnrichError::MalformedResponse(e.to_string()))?;
        debug!(model = %self.model, "gemini generation complete");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_redacted_in_debug() {
        let client = GeminiClient::with_base_url(Client::new(), "http://localhost");
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("test-key"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
