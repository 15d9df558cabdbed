//! Systemic-risk radar.
//!
//! A final cross-cutting pass over the validated findings, armed only for
//! configured categories and only when at least one High-severity finding
//! survived the debate. The radar is advisory: any failure or an empty
//! reply simply means no alert.

use crate::config::ReviewConfig;
use crate::oracle::GenerationOracle;
use crate::text_util::strip_code_fence;

use super::prompts::{build_radar_prompt, RADAR_SYSTEM_PROMPT};
use super::types::{Category, Finding, RadarAlert, Severity};

pub fn run_radar(
    oracle: &dyn GenerationOracle,
    category: Category,
    findings: &[Finding],
    config: &ReviewConfig,
) -> Option<RadarAlert> {
    if findings.is_empty() {
        return None;
    }
    if !config.radar_categories.contains(&category) {
        return None;
    }
    if !findings.iter().any(|f| f.severity == Severity::High) {
        return None;
    }

    let prompt = build_radar_prompt(category, findings);
    let raw = match oracle.generate(RADAR_SYSTEM_PROMPT, &prompt, true, &config.base_model) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "radar call failed; no systemic alert");
            return None;
        }
    };

    parse_alert(&raw)
}

fn parse_alert(raw: &str) -> Option<RadarAlert> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(raw)).ok()?;
    if value.is_null() {
        return None;
    }
    if value.as_object().is_some_and(|map| map.is_empty()) {
        return None;
    }

    match serde_json::from_value::<RadarAlert>(value) {
        Ok(alert) => {
            tracing::info!(level = ?alert.level, title = %alert.title, "systemic alert raised");
            Some(alert)
        }
        Err(e) => {
            tracing::warn!(error = %e, "radar reply was not a valid alert");
            None
        }
    }
}
