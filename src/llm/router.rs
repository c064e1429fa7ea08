use std::sync::Arc;

use tracing::warn;

use crate::config::{resolve_credential, SummarizerConfig};
use crate::errors::TrustLensError;
use super::gemini::GeminiSummarizer;
use super::provider::NarrativeSummarizer;

/// Build the configured summarizer. A missing API key disables summaries
/// rather than failing the evaluation.
pub fn create_summarizer(
    config: &SummarizerConfig,
) -> Result<Option<Arc<dyn NarrativeSummarizer>>, TrustLensError> {
    let api_key = resolve_credential(&config.api_key);
    if api_key.is_empty() {
        warn!(provider = %config.provider, "Summarizer API key not set, narrative summaries disabled");
        return Ok(None);
    }

    match config.provider.as_str() {
        "gemini" => Ok(Some(Arc::new(GeminiSummarizer::new(
            &api_key,
            Some(&config.model),
            config.max_output_tokens,
        )?))),
        other => Err(TrustLensError::Config(format!("Unknown summarizer provider: {}", other))),
    }
}
