pub mod gemini;
pub mod provider;
pub mod router;

pub use gemini::GeminiSummarizer;
pub use provider::NarrativeSummarizer;
pub use router::create_summarizer;
