use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cli::commands::AssessArgs;
use crate::cli::{load_config, output};
use crate::errors::TrustLensError;
use crate::probes::{LiveBackend, ProbeOrchestrator};

pub async fn handle_assess(args: AssessArgs) -> Result<(), TrustLensError> {
    let config = load_config(args.config.as_deref()).await?;
    let domain = args.domain.trim().trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return Err(TrustLensError::InvalidUrl("No domain provided".into()));
    }

    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.probes.timeout());

    let backend = Arc::new(LiveBackend::new(&config.probes)?);
    let orchestrator = ProbeOrchestrator::new(backend, config.probes.clone(), config.scoring.clone());

    info!(domain = %domain, timeout_secs = timeout.as_secs(), "Running probe battery");
    let assessment = orchestrator.assess(&domain, timeout).await;
    output::print_assessment(&assessment, args.json)
}
