pub mod adapter;
pub mod api;
pub mod cache;

pub use adapter::{ReputationAdapter, ReputationScanner};
pub use api::{AnalysisReport, AnalysisState, ScanApi, VirusTotalApi};
pub use cache::ReputationCache;
