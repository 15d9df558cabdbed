//! Agentic retrieval: query rewriting, threshold-decay search and fusion.
//!
//! Recall over a small precedent corpus is poor when the query wording is an
//! exact quote from a document under review. The agent compensates three
//! ways: it paraphrases each query into domain-synonym variants, it retries
//! searches at a decaying similarity threshold until enough high-confidence
//! matches accumulate, and it fuses results across variants and fragments
//! keeping the best score seen per document.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::oracle::GenerationOracle;

use super::config::RetrievalConfig;
use super::store::{Embedder, ScoredCandidate, SimilaritySearch};
use super::RetrievalError;

/// Queries shorter than this are searched verbatim, unparaphrased.
const MIN_REWRITE_CHARS: usize = 5;

const REWRITE_SYSTEM_PROMPT: &str = r#"
You are a legal-text retrieval specialist. You rewrite search queries so
that semantically equivalent precedents are found even when their wording
differs.

Rewrite rules:
1. Preserve the core legal concepts (market access, bidding qualification,
   designated supplier, fiscal incentive).
2. Substitute domain synonyms for scope and strength terms:
   - restrict / exclude / prohibit
   - local / municipal / provincial
   - enterprise / operator / bidder
   - require / stipulate / impose as a condition
   - mandatory / advisory
3. Vary word order and voice (active and passive).
4. Restating from the opposite direction is allowed
   ("favour local enterprises" may become "exclude non-local enterprises").

Output: a JSON array of rewritten query strings, nothing else.
Do not include the original query.
"#;

pub struct RetrievalAgent<'a> {
    config: RetrievalConfig,
    oracle: &'a dyn GenerationOracle,
    embedder: &'a dyn Embedder,
    rewrite_model: String,
}

impl<'a> RetrievalAgent<'a> {
    pub fn new(
        config: RetrievalConfig,
        oracle: &'a dyn GenerationOracle,
        embedder: &'a dyn Embedder,
        rewrite_model: &str,
    ) -> Self {
        Self {
            config,
            oracle,
            embedder,
            rewrite_model: rewrite_model.to_string(),
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Paraphrase a query into semantically equivalent variants.
    ///
    /// Returns the original query first, followed by at most `max_rewrites`
    /// paraphrases. Any oracle failure or unparseable reply degrades to the
    /// original query alone — rewriting is recall insurance, never a
    /// hard dependency.
    pub fn rewrite_query(&self, original: &str) -> Vec<String> {
        if original.chars().count() < MIN_REWRITE_CHARS {
            return vec![original.to_string()];
        }

        let user = format!(
            "Produce {} rewrites of this query:\n\n{original}",
            self.config.max_rewrites
        );

        let raw = match self
            .oracle
            .generate(REWRITE_SYSTEM_PROMPT, &user, true, &self.rewrite_model)
        {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::warn!("query rewrite returned no content; searching verbatim");
                return vec![original.to_string()];
            }
            Err(e) => {
                tracing::warn!(error = %e, "query rewrite failed; searching verbatim");
                return vec![original.to_string()];
            }
        };

        let rewrites: Vec<String> =
            match serde_json::from_str(crate::text_util::strip_code_fence(&raw)) {
                Ok(rewrites) => rewrites,
                Err(_) => {
                    tracing::warn!("query rewrite reply was not a JSON array; searching verbatim");
                    return vec![original.to_string()];
                }
            };

        let mut queries = vec![original.to_string()];
        queries.extend(
            rewrites
                .into_iter()
                .filter(|q| !q.trim().is_empty())
                .take(self.config.max_rewrites),
        );

        tracing::debug!(variants = queries.len() - 1, "query rewritten");
        queries
    }

    /// Search one query at a decaying similarity threshold.
    ///
    /// Embeds the query once, then queries the store for up to
    /// `2 * max_results` candidates per iteration, merging max-score-wins
    /// into an accumulator. Stops early once both `min_results` total and
    /// `min_high_quality` high-scoring candidates have accumulated; the
    /// threshold never drops below `floor_threshold`, and the loop never
    /// exceeds `max_iterations`. An unusable embedding degrades to the
    /// store's keyword fallback.
    pub fn iterative_search(
        &self,
        query: &str,
        store: &dyn SimilaritySearch,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        let vector = match self.embedder.embed(query) {
            Ok(vector) if !vector.is_empty() => vector,
            Ok(_) => {
                tracing::warn!("empty query embedding; falling back to keyword lookup");
                return store.keyword_search(query, self.config.max_results);
            }
            Err(e) => {
                tracing::warn!(error = %e, "embedding failed; falling back to keyword lookup");
                return store.keyword_search(query, self.config.max_results);
            }
        };

        let mut accumulated: HashMap<String, ScoredCandidate> = HashMap::new();
        let mut threshold = self.config.initial_threshold;
        let mut iteration = 0;

        while iteration < self.config.max_iterations {
            iteration += 1;
            threshold = threshold.max(self.config.floor_threshold);

            let batch = store.search(&vector, self.config.max_results * 2, threshold)?;
            let batch_size = batch.len();
            merge_max_score(&mut accumulated, batch);

            let total = accumulated.len();
            let high_quality = accumulated
                .values()
                .filter(|c| c.score >= self.config.high_quality_threshold)
                .count();

            tracing::debug!(
                iteration,
                threshold,
                batch_size,
                total,
                high_quality,
                "retrieval iteration"
            );

            if high_quality >= self.config.min_high_quality && total >= self.config.min_results {
                break;
            }
            if threshold <= self.config.floor_threshold {
                break;
            }
            threshold -= self.config.step;
        }

        Ok(rank_and_truncate(accumulated, self.config.max_results))
    }

    /// Run `iterative_search` per query and fuse the results.
    ///
    /// Duplicates across queries collapse to a single entry carrying the
    /// maximum score observed and the query variant that produced it.
    pub fn fusion_search(
        &self,
        queries: &[String],
        store: &dyn SimilaritySearch,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        if queries.is_empty() {
            tracing::warn!("fusion search called with no queries");
            return Ok(Vec::new());
        }

        let mut merged: HashMap<String, ScoredCandidate> = HashMap::new();

        for query in queries {
            let results = self.iterative_search(query, store)?;
            let tagged = results.into_iter().map(|mut candidate| {
                candidate.matched_query = Some(query.clone());
                candidate
            });
            merge_max_score(&mut merged, tagged);
        }

        Ok(rank_and_truncate(merged, self.config.max_results))
    }

    /// Retrieve precedents for a batch of risk-describing fragments.
    ///
    /// Each fragment is independently rewritten and fusion-searched; all
    /// results merge into one global accumulator tagged with the fragment
    /// that contributed the winning score. An empty fragment list returns
    /// empty with zero remote calls.
    pub fn batch_retrieval_for_risks(
        &self,
        fragments: &[String],
        store: &dyn SimilaritySearch,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        if fragments.is_empty() {
            return Ok(Vec::new());
        }

        let mut global: HashMap<String, ScoredCandidate> = HashMap::new();

        for fragment in fragments {
            let queries = self.rewrite_query(fragment);
            let results = self.fusion_search(&queries, store)?;
            let contributed = results.len();

            let tagged = results.into_iter().map(|mut candidate| {
                candidate.source_fragment = Some(fragment.clone());
                candidate
            });
            merge_max_score(&mut global, tagged);

            tracing::debug!(contributed, accumulated = global.len(), "fragment retrieved");
        }

        let final_results = rank_and_truncate(global, self.config.max_results);

        let high_quality = final_results
            .iter()
            .filter(|c| c.score >= self.config.high_quality_threshold)
            .count();
        if high_quality < self.config.min_high_quality {
            tracing::warn!(
                high_quality,
                wanted = self.config.min_high_quality,
                "batch retrieval finished below the high-quality target"
            );
        }

        Ok(final_results)
    }
}

/// Merge candidates into the accumulator, keeping the maximum score seen
/// per document id (tags travel with the winning candidate).
fn merge_max_score(
    accumulator: &mut HashMap<String, ScoredCandidate>,
    incoming: impl IntoIterator<Item = ScoredCandidate>,
) {
    for candidate in incoming {
        match accumulator.get(&candidate.doc.id) {
            Some(existing) if existing.score >= candidate.score => {}
            _ => {
                accumulator.insert(candidate.doc.id.clone(), candidate);
            }
        }
    }
}

fn rank_and_truncate(
    accumulator: HashMap<String, ScoredCandidate>,
    max_results: usize,
) -> Vec<ScoredCandidate> {
    let mut results: Vec<ScoredCandidate> = accumulator.into_values().collect();
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    results.truncate(max_results);
    results
}
