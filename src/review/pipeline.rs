//! The deliberative review pipeline.
//!
//! Coordinates: screen -> load guidance -> extract -> fold duplicates ->
//! debate -> radar. Stages run sequentially except the debate, which fans
//! out one task per finding. Every collaborator arrives through a trait so
//! the pipeline owns no global state, and both entry points return plain
//! values: all degraded paths have already resolved inside the stages.

use chrono::Utc;

use crate::config::ReviewConfig;
use crate::knowledge::{load_guidance, KnowledgeStore};
use crate::oracle::GenerationOracle;
use crate::retrieval::agent::RetrievalAgent;
use crate::retrieval::store::{Embedder, SimilaritySearch};

use super::classifier::screen_document;
use super::debate::contest_findings;
use super::dedup::dedup_findings;
use super::extractor::extract_findings;
use super::radar::run_radar;
use super::types::{Category, ReviewOutcome, ReviewReport};

pub struct ReviewPipeline<'a> {
    oracle: &'a dyn GenerationOracle,
    embedder: &'a dyn Embedder,
    precedents: &'a dyn SimilaritySearch,
    rules: &'a dyn SimilaritySearch,
    knowledge: &'a dyn KnowledgeStore,
    config: ReviewConfig,
}

impl<'a> ReviewPipeline<'a> {
    pub fn new(
        oracle: &'a dyn GenerationOracle,
        embedder: &'a dyn Embedder,
        precedents: &'a dyn SimilaritySearch,
        rules: &'a dyn SimilaritySearch,
        knowledge: &'a dyn KnowledgeStore,
    ) -> Self {
        Self::with_config(
            oracle,
            embedder,
            precedents,
            rules,
            knowledge,
            ReviewConfig::default(),
        )
    }

    pub fn with_config(
        oracle: &'a dyn GenerationOracle,
        embedder: &'a dyn Embedder,
        precedents: &'a dyn SimilaritySearch,
        rules: &'a dyn SimilaritySearch,
        knowledge: &'a dyn KnowledgeStore,
        config: ReviewConfig,
    ) -> Self {
        Self {
            oracle,
            embedder,
            precedents,
            rules,
            knowledge,
            config,
        }
    }

    /// Scan a pre-classified document: extraction, duplicate folding,
    /// adversarial validation and the radar pass.
    ///
    /// This is the single call the hosting workflow needs; the result is
    /// always well-formed, possibly empty.
    pub fn run(
        &self,
        document_text: &str,
        category: Category,
        guidance_text: &str,
    ) -> ReviewOutcome {
        let agent = RetrievalAgent::new(
            self.config.retrieval.clone(),
            self.oracle,
            self.embedder,
            &self.config.base_model,
        );

        // Step 1: extract candidate findings with retrieval-backed context
        let candidates = extract_findings(
            self.oracle,
            &agent,
            self.precedents,
            self.rules,
            category,
            document_text,
            guidance_text,
            &self.config.base_model,
        );
        if candidates.is_empty() {
            return ReviewOutcome::default();
        }

        // Step 2: fold findings pointing at the same clause
        let candidates = dedup_findings(candidates);

        // Step 3: adversarial validation, one concurrent task per finding
        let findings = contest_findings(self.oracle, candidates, document_text, &self.config);

        // Step 4: systemic-risk radar over the survivors
        let meta_alert = run_radar(self.oracle, category, &findings, &self.config);

        ReviewOutcome {
            findings,
            meta_alert,
        }
    }

    /// Full flow from raw text: screening decides whether review applies,
    /// the knowledge loader assembles guidance, then `run` does the rest.
    pub fn review(&self, document_label: &str, document_text: &str) -> ReviewReport {
        let screening = screen_document(
            self.oracle,
            document_label,
            document_text,
            &self.config.base_model,
        );

        if !screening.needs_review {
            tracing::info!(reason = %screening.reason, "document screened out");
            return ReviewReport {
                screening,
                guidance_used: false,
                outcome: ReviewOutcome::default(),
                reviewed_at: Utc::now(),
            };
        }

        let guidance = load_guidance(
            self.oracle,
            self.knowledge,
            document_text,
            screening.category,
            &self.config.base_model,
        );

        let outcome = self.run(document_text, screening.category, &guidance);

        ReviewReport {
            guidance_used: !guidance.is_empty(),
            screening,
            outcome,
            reviewed_at: Utc::now(),
        }
    }
}
