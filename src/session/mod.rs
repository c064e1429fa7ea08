pub mod manager;

pub use manager::{EvaluateOptions, EvaluationSession};
