//! Adversarial validation ("debate").
//!
//! Every candidate finding is argued by a defender and ruled on by a judge,
//! each backed by a different model so neither side marks its own work. The
//! state machine is PROPOSED -> {MAINTAINED | DOWNGRADED | DISMISSED}:
//! dismissed findings are removed outright, survivors keep their identity
//! and source quote and only severity, description and remedy may change.
//! The failure direction is fixed throughout — an unreachable judge, a
//! malformed ruling or a panicked task all resolve to maintaining the
//! original finding, never to silently exonerating it.

use serde::Deserialize;

use crate::config::ReviewConfig;
use crate::oracle::GenerationOracle;
use crate::text_util::{strip_code_fence, truncate_at_boundary, DEBATE_EXCERPT};

use super::prompts::{
    build_defense_prompt, build_judgment_prompt, DEFENDER_SYSTEM_PROMPT, JUDGE_SYSTEM_PROMPT,
    NO_DEFENSE_SENTINEL,
};
use super::types::{DebateVerdict, Decision, Defense, Finding, RevisedFinding, Severity};

/// Solicit a counter-argument for one finding.
///
/// The oracle signals "nothing exculpatory" with a reserved sentinel phrase;
/// that phrase, an empty reply and a transport failure all map to
/// `Defense::NoArgument` so downstream control flow never string-matches.
pub fn run_defender(
    oracle: &dyn GenerationOracle,
    finding: &Finding,
    document_text: &str,
    model: &str,
) -> Defense {
    let excerpt = truncate_at_boundary(document_text, DEBATE_EXCERPT);
    let prompt = build_defense_prompt(finding, &excerpt);

    match oracle.generate(DEFENDER_SYSTEM_PROMPT, &prompt, false, model) {
        Ok(Some(reply)) => {
            let reply = reply.trim();
            if reply.is_empty() || reply.contains(NO_DEFENSE_SENTINEL) {
                Defense::NoArgument
            } else {
                Defense::Argument(reply.to_string())
            }
        }
        Ok(None) => Defense::NoArgument,
        Err(e) => {
            tracing::warn!(error = %e, finding = %finding.id, "defender unavailable; finding stands undefended");
            Defense::NoArgument
        }
    }
}

#[derive(Deserialize)]
struct RawRuling {
    decision: Decision,
    #[serde(default)]
    confidence: Option<u32>,
    #[serde(default)]
    ruling: Option<String>,
    #[serde(default)]
    revised: Option<RevisedFinding>,
}

/// Adjudicate a defended finding.
///
/// A dismissal below the confidence gate is demoted to a downgrade to Low
/// severity with the ruling appended to the description. Every failure path
/// returns a plain MAINTAIN verdict.
pub fn run_judge(
    oracle: &dyn GenerationOracle,
    finding: &Finding,
    argument: &str,
    model: &str,
    dismiss_confidence_threshold: u8,
) -> DebateVerdict {
    let prompt = build_judgment_prompt(finding, argument);

    let raw = match oracle.generate(JUDGE_SYSTEM_PROMPT, &prompt, true, model) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::warn!(finding = %finding.id, "judge returned no content; maintaining finding");
            return maintain_verdict();
        }
        Err(e) => {
            tracing::warn!(error = %e, finding = %finding.id, "judge unavailable; maintaining finding");
            return maintain_verdict();
        }
    };

    let ruling: RawRuling = match serde_json::from_str(strip_code_fence(&raw)) {
        Ok(ruling) => ruling,
        Err(e) => {
            tracing::warn!(error = %e, finding = %finding.id, "ruling was not valid JSON; maintaining finding");
            return maintain_verdict();
        }
    };

    let confidence = ruling.confidence.unwrap_or(0).min(100) as u8;
    let mut verdict = DebateVerdict {
        decision: ruling.decision,
        confidence,
        ruling: ruling.ruling,
        revised: ruling.revised,
    };

    if verdict.decision == Decision::Dismiss && confidence < dismiss_confidence_threshold {
        tracing::warn!(
            finding = %finding.id,
            confidence,
            threshold = dismiss_confidence_threshold,
            "dismissal confidence below the gate; demoting to downgrade"
        );
        verdict.decision = Decision::Downgrade;
        verdict.revised = Some(RevisedFinding {
            severity: Some(Severity::Low),
            description: verdict.ruling.as_ref().map(|ruling| {
                format!("{}\n\nRuling note: {ruling}", finding.description)
            }),
            suggested_remedy: None,
        });
    }

    verdict
}

fn maintain_verdict() -> DebateVerdict {
    DebateVerdict {
        decision: Decision::Maintain,
        confidence: 0,
        ruling: None,
        revised: None,
    }
}

/// Run the full two-step debate for one finding.
///
/// Returns `None` when the finding is dismissed. An undefended finding
/// stands as proposed without a judge call.
pub fn contest_finding(
    oracle: &dyn GenerationOracle,
    finding: Finding,
    document_text: &str,
    config: &ReviewConfig,
) -> Option<Finding> {
    let defense = run_defender(oracle, &finding, document_text, &config.defender_model);

    let argument = match &defense {
        Defense::NoArgument => {
            tracing::debug!(finding = %finding.id, "no defence raised; finding stands");
            return Some(finding);
        }
        Defense::Argument(argument) => argument.clone(),
    };

    let verdict = run_judge(
        oracle,
        &finding,
        &argument,
        &config.judge_model,
        config.dismiss_confidence_threshold,
    );

    apply_verdict(finding, argument, verdict)
}

/// Fold a verdict into the finding. Identity and source quote are
/// untouchable; only severity, description and remedy may be replaced.
fn apply_verdict(mut finding: Finding, argument: String, verdict: DebateVerdict) -> Option<Finding> {
    if verdict.decision == Decision::Dismiss {
        tracing::info!(finding = %finding.id, confidence = verdict.confidence, "finding dismissed");
        return None;
    }

    if let Some(revised) = &verdict.revised {
        if let Some(severity) = revised.severity {
            finding.severity = severity;
        }
        if let Some(description) = &revised.description {
            finding.description = description.clone();
        }
        if let Some(remedy) = &revised.suggested_remedy {
            finding.suggested_remedy = remedy.clone();
        }
    }

    finding.defense = Some(argument);
    finding.ruling = verdict.ruling;
    finding.ruling_confidence = Some(verdict.confidence);
    Some(finding)
}

/// Contest every finding concurrently.
///
/// One scoped task per finding; tasks share nothing mutable and results are
/// re-associated by input position, so the surviving order is deterministic
/// regardless of completion order.
pub fn contest_findings(
    oracle: &dyn GenerationOracle,
    findings: Vec<Finding>,
    document_text: &str,
    config: &ReviewConfig,
) -> Vec<Finding> {
    if findings.is_empty() {
        return Vec::new();
    }

    tracing::info!(count = findings.len(), "adversarial validation started");

    let survivors: Vec<Finding> = std::thread::scope(|scope| {
        let handles: Vec<_> = findings
            .iter()
            .map(|finding| {
                scope.spawn(move || contest_finding(oracle, finding.clone(), document_text, config))
            })
            .collect();

        handles
            .into_iter()
            .zip(&findings)
            .filter_map(|(handle, original)| match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::error!(finding = %original.id, "debate task panicked; maintaining the original finding");
                    Some(original.clone())
                }
            })
            .collect()
    });

    tracing::info!(
        contested = findings.len(),
        survived = survivors.len(),
        "adversarial validation finished"
    );
    survivors
}
