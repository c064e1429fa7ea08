pub mod assess;
pub mod check;
pub mod commands;
pub mod output;

pub use commands::{Cli, Commands};

use std::path::PathBuf;

use crate::config::{parse_config, TrustLensConfig};
use crate::errors::TrustLensError;

/// Load the configuration file if one was given, defaults otherwise.
pub async fn load_config(path: Option<&str>) -> Result<TrustLensConfig, TrustLensError> {
    match path {
        Some(path) => parse_config(&PathBuf::from(path)).await,
        None => Ok(TrustLensConfig::default()),
    }
}
