pub mod types;
pub mod classification;
pub mod retry;

pub use types::TrustLensError;
pub use classification::ErrorClassification;
pub use retry::{with_retry, RetryPolicy};
