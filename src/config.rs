//! Central tunables for the review pipeline.
//!
//! Compiled defaults work out of the box; deployments override through
//! environment variables. Model assignments are deliberately asymmetric:
//! the debate pairs a strong instruction-following defender against a
//! reasoning judge so neither side argues against itself.

use std::str::FromStr;

use crate::retrieval::config::RetrievalConfig;
use crate::review::types::Category;

#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Model for screening, guidance selection, query rewriting, extraction
    /// and the radar.
    pub base_model: String,
    /// Model arguing on behalf of the document drafter during debate.
    pub defender_model: String,
    /// Model adjudicating each debate.
    pub judge_model: String,
    /// Minimum Judge confidence (0-100) for a dismissal to stand; weaker
    /// dismissals are demoted to a downgrade.
    pub dismiss_confidence_threshold: u8,
    /// Categories that arm the systemic-risk radar.
    pub radar_categories: Vec<Category>,
    pub retrieval: RetrievalConfig,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            base_model: "deepseek-chat".to_string(),
            defender_model: "qwen3-235b-a22b-instruct".to_string(),
            judge_model: "deepseek-reasoner".to_string(),
            dismiss_confidence_threshold: 85,
            radar_categories: vec![Category::Bidding],
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl ReviewConfig {
    /// Defaults overridden by `FAIRLENS_*` environment variables where set.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_model: env_or("FAIRLENS_BASE_MODEL", defaults.base_model),
            defender_model: env_or("FAIRLENS_DEFENDER_MODEL", defaults.defender_model),
            judge_model: env_or("FAIRLENS_JUDGE_MODEL", defaults.judge_model),
            dismiss_confidence_threshold: env_parse(
                "FAIRLENS_DISMISS_CONFIDENCE",
                defaults.dismiss_confidence_threshold,
            ),
            radar_categories: defaults.radar_categories,
            retrieval: defaults.retrieval,
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
