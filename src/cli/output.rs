use crate::errors::TrustLensError;
use crate::models::{DomainAssessment, TrustVerdict};

pub fn print_verdict(verdict: &TrustVerdict, json: bool) -> Result<(), TrustLensError> {
    if json {
        println!("{}", serde_json::to_string_pretty(verdict)?);
        return Ok(());
    }
    print!("{}", render_verdict(verdict));
    Ok(())
}

pub fn print_assessment(assessment: &DomainAssessment, json: bool) -> Result<(), TrustLensError> {
    if json {
        println!("{}", serde_json::to_string_pretty(assessment)?);
        return Ok(());
    }
    print!("{}", render_assessment(assessment));
    Ok(())
}

pub fn render_verdict(verdict: &TrustVerdict) -> String {
    let mut out = String::new();
    out.push_str(&format!("URL:        {}\n", verdict.url));
    out.push_str(&format!("Verdict:    {} (attempts: {})\n", verdict.overall, verdict.attempts));
    out.push_str(&format!("            {}\n", verdict.message));

    if let Some(reputation) = &verdict.reputation_verdict {
        let s = &reputation.stats;
        out.push_str(&format!(
            "Reputation: {} - {} (malicious {}, suspicious {}, harmless {}, undetected {})\n",
            reputation.status.as_str(),
            reputation.message,
            s.malicious,
            s.suspicious,
            s.harmless,
            s.undetected
        ));
    }
    if let Some(status) = &verdict.block_status {
        out.push_str(&format!("Block:      {:?}\n", status));
    }
    if let Some(summary) = &verdict.narrative_summary {
        out.push_str(&format!("Summary:    {}\n", summary));
    }
    if !verdict.domain_assessment.findings.is_empty() {
        out.push('\n');
        out.push_str(&render_assessment(&verdict.domain_assessment));
    }
    out
}

pub fn render_assessment(assessment: &DomainAssessment) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Domain:     {} - score {}/100, {}\n",
        assessment.domain,
        assessment.security_score,
        assessment.classification.as_str()
    ));
    out.push_str(&format!("            {}\n", assessment.classification.message()));
    if let Some(ip) = &assessment.resolved_ip {
        out.push_str(&format!("Address:    {}\n", ip));
    }
    match assessment.age_info.days {
        Some(days) => out.push_str(&format!(
            "Age:        {} days ({}{})\n",
            days,
            assessment.age_info.source.label(),
            if assessment.age_info.is_historical { ", historical" } else { "" }
        )),
        None => out.push_str("Age:        unknown\n"),
    }

    let tally = &assessment.risk_tally;
    out.push_str(&format!(
        "Risks:      {} critical, {} high, {} medium, {} low\n",
        tally.critical, tally.high, tally.medium, tally.low
    ));

    for finding in &assessment.findings {
        out.push_str(&format!(
            "  [{:<8}] {}: {}\n",
            finding.risk.as_str().to_uppercase(),
            finding.check,
            finding.status
        ));
        for line in &finding.explanations {
            out.push_str(&format!("             - {}\n", line));
        }
    }
    out
}
