use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::credentials::redact_credentials;
use crate::errors::TrustLensError;
use super::provider::{build_prompt, trim_to_sentence, NarrativeSummarizer};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiSummarizer {
    client: Client,
    api_key: String,
    model: String,
    max_output_tokens: u32,
}

impl GeminiSummarizer {
    pub fn new(api_key: &str, model: Option<&str>, max_output_tokens: u32) -> Result<Self, TrustLensError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TrustLensError::Internal(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.unwrap_or("gemini-1.5-flash").to_string(),
            max_output_tokens,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": 0.7,
                "topP": 0.9,
                "maxOutputTokens": self.max_output_tokens,
            }
        })
    }
}

/// Pull the generated text out of a `generateContent` response.
fn extract_summary(data: &Value) -> Result<String, TrustLensError> {
    if let Some(error) = data.get("error") {
        return Err(TrustLensError::Summarizer(
            error["message"].as_str().unwrap_or("Unknown").to_string(),
        ));
    }

    let text = data["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .unwrap_or("")
        .trim();
    if text.is_empty() {
        let reason = data["candidates"][0]["finishReason"].as_str().unwrap_or("no candidates");
        return Err(TrustLensError::Summarizer(format!("Empty response ({})", reason)));
    }
    Ok(trim_to_sentence(text))
}

#[async_trait]
impl NarrativeSummarizer for GeminiSummarizer {
    async fn summarize(&self, report: &Value) -> Result<String, TrustLensError> {
        let url = format!("{}/models/{}:generateContent", GEMINI_BASE_URL, self.model);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(&build_prompt(report)))
            .send()
            .await
            .map_err(|e| {
                TrustLensError::Network(redact_credentials(
                    &format!("Gemini request failed: {}", e),
                    &[&self.api_key],
                ))
            })?;

        if resp.status().as_u16() == 429 {
            return Err(TrustLensError::RateLimit("Gemini rate limit".into()));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| TrustLensError::Summarizer(format!("Parse error: {}", e)))?;

        let summary = extract_summary(&data)?;
        debug!(model = %self.model, chars = summary.len(), "Generated narrative summary");
        Ok(summary)
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_caps_output_tokens() {
        let summarizer = GeminiSummarizer::new("key", None, 150).unwrap();
        let body = summarizer.request_body("hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 150);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(summarizer.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_extract_summary_trims_to_sentence() {
        let data = json!({
            "candidates": [{"content": {"parts": [{"text": "The site appears safe. Still, avoid entering passw"}]}, "finishReason": "MAX_TOKENS"}]
        });
        assert_eq!(extract_summary(&data).unwrap(), "The site appears safe.");
    }

    #[test]
    fn test_extract_summary_api_error() {
        let data = json!({"error": {"code": 400, "message": "API key not valid"}});
        let err = extract_summary(&data).unwrap_err();
        assert!(matches!(err, TrustLensError::Summarizer(ref m) if m.contains("API key not valid")));
    }

    #[test]
    fn test_extract_summary_empty_candidates() {
        let data = json!({"candidates": [{"finishReason": "SAFETY"}]});
        let err = extract_summary(&data).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
