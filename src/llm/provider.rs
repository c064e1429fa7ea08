use async_trait::async_trait;
use serde_json::Value;

use crate::errors::TrustLensError;

/// Turns a structured verdict report into a short plain-language recommendation.
#[async_trait]
pub trait NarrativeSummarizer: Send + Sync {
    async fn summarize(&self, report: &Value) -> Result<String, TrustLensError>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;
}

pub fn build_prompt(report: &Value) -> String {
    let report = serde_json::to_string_pretty(report).unwrap_or_else(|_| report.to_string());
    format!(
        "You are a security assistant helping everyday users decide whether a website is safe to visit.\n\n\
         Below is a technical domain security report. Analyze it and give one recommendation: \
         whether the user can browse the site safely or should proceed with caution \
         (for example, avoid logging in, or do not visit).\n\n\
         Avoid technical jargon and keep the tone clear, calm and helpful. \
         Finish every sentence; stay within 150 tokens.\n\n\
         Security Report:\n{}\n",
        report
    )
}

/// Cut `text` back to its last complete sentence. Text without any sentence
/// terminator is returned trimmed but otherwise unchanged.
pub fn trim_to_sentence(text: &str) -> String {
    let text = text.trim();
    let ends_cleanly = text
        .trim_end_matches(['"', '\'', ')', '*'])
        .ends_with(['.', '!', '?']);
    if ends_cleanly {
        return text.to_string();
    }
    match text.rfind(['.', '!', '?']) {
        Some(end) => text[..=end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_embeds_report() {
        let prompt = build_prompt(&json!({"overall": "UNSAFE", "domain": "evil.example"}));
        assert!(prompt.contains("\"overall\": \"UNSAFE\""));
        assert!(prompt.contains("Security Report:"));
    }

    #[test]
    fn test_trim_drops_dangling_fragment() {
        let text = "This site looks safe. You can browse it normally. However, be caref";
        assert_eq!(trim_to_sentence(text), "This site looks safe. You can browse it normally.");
    }

    #[test]
    fn test_trim_keeps_complete_text() {
        assert_eq!(trim_to_sentence("  Avoid logging in!  "), "Avoid logging in!");
        assert_eq!(trim_to_sentence("Do not visit (\"unsafe\")."), "Do not visit (\"unsafe\").");
    }

    #[test]
    fn test_trim_without_terminator() {
        assert_eq!(trim_to_sentence("Proceed with caution"), "Proceed with caution");
    }
}
