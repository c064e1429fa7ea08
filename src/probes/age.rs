use tracing::debug;

use crate::models::{AgeInfo, AgeSource};
use super::backend::TlsOutcome;
use super::checks::ProbeContext;

/// Share of the per-probe timeout the whole fallback chain may use. The
/// remainder keeps the chain's own "unknown" result ahead of the outer timeout.
const CHAIN_BUDGET: f64 = 0.75;

/// Best-effort domain age: WHOIS, then the live certificate, then CT logs.
/// Each step runs only if the previous one produced nothing.
pub async fn resolve_age(ctx: &ProbeContext<'_>) -> AgeInfo {
    let step_timeout = ctx.timeout.mul_f64(CHAIN_BUDGET) / 3;

    match tokio::time::timeout(step_timeout, ctx.backend.whois_creation_dates(ctx.domain)).await {
        Ok(Ok(dates)) => {
            if let Some(oldest) = dates.into_iter().min() {
                return AgeInfo {
                    days: Some(ctx.days_since(oldest)),
                    source: AgeSource::Whois,
                    is_historical: false,
                };
            }
            debug!(domain = %ctx.domain, "WHOIS returned no creation date");
        }
        Ok(Err(e)) => debug!(domain = %ctx.domain, error = %e, "WHOIS age lookup failed"),
        Err(_) => debug!(domain = %ctx.domain, "WHOIS age lookup timed out"),
    }

    if let Ok(TlsOutcome::Established(info)) = tokio::time::timeout(step_timeout, ctx.tls()).await {
        if let Some(issued) = info.not_before {
            return AgeInfo {
                days: Some(ctx.days_since(issued)),
                source: AgeSource::SslCert,
                is_historical: false,
            };
        }
    }

    match tokio::time::timeout(step_timeout, ctx.backend.ct_entry_dates(ctx.domain)).await {
        Ok(Ok(dates)) => {
            if let Some(oldest) = dates.into_iter().min() {
                return AgeInfo {
                    days: Some(ctx.days_since(oldest)),
                    source: AgeSource::CertTransparency,
                    is_historical: true,
                };
            }
        }
        Ok(Err(e)) => debug!(domain = %ctx.domain, error = %e, "CT log lookup failed"),
        Err(_) => debug!(domain = %ctx.domain, "CT log lookup timed out"),
    }

    AgeInfo::unknown()
}
