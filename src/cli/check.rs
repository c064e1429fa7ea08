use std::time::Duration;

use tracing::info;

use crate::cli::commands::CheckArgs;
use crate::cli::{load_config, output};
use crate::errors::TrustLensError;
use crate::models::TargetUrl;
use crate::session::{EvaluateOptions, EvaluationSession};

pub async fn handle_check(args: CheckArgs) -> Result<(), TrustLensError> {
    // Reject bad input before any collaborator is built.
    let target = TargetUrl::parse(&args.url)?;

    let mut config = load_config(args.config.as_deref()).await?;
    if args.in_memory {
        config.storage.in_memory = true;
    }

    let session = EvaluationSession::from_config(&config)?;
    let mut options = EvaluateOptions::from_config(&config.session);
    if let Some(max_attempts) = args.max_attempts {
        options.max_attempts = max_attempts.max(1);
    }
    if let Some(deadline) = args.deadline {
        options.deadline = Duration::from_secs(deadline);
    }
    options.user_id = args.user_id.clone();

    info!(url = %target.normalized, domain = %target.domain, "Evaluating URL");
    match session.process_url_with(&target.normalized, options).await {
        Ok(verdict) => output::print_verdict(&verdict, args.json),
        Err(e) => {
            if let Some(best_effort) = e.best_effort_verdict() {
                output::print_verdict(best_effort, args.json)?;
            }
            Err(e)
        }
    }
}
