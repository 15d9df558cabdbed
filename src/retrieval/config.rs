/// Knobs for the agentic retrieval loop. Immutable once constructed.
///
/// The loop starts strict and relaxes: each iteration lowers the similarity
/// threshold by `step` (never below `floor_threshold`) until enough results
/// have accumulated or `max_iterations` is spent.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Similarity threshold for the first iteration.
    pub initial_threshold: f32,
    /// Hard lower bound the threshold never decays past.
    pub floor_threshold: f32,
    /// Per-iteration threshold decrement.
    pub step: f32,
    /// Upper bound on search iterations per query.
    pub max_iterations: u32,
    /// Accumulated-result count needed to stop early.
    pub min_results: usize,
    /// Score at or above which a candidate counts as high quality.
    pub high_quality_threshold: f32,
    /// High-quality count needed to stop early.
    pub min_high_quality: usize,
    /// Paraphrase variants requested per query, excluding the original.
    pub max_rewrites: usize,
    /// Final result-list cap after fusion.
    pub max_results: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            initial_threshold: 0.65,
            floor_threshold: 0.35,
            step: 0.15,
            max_iterations: 3,
            min_results: 3,
            high_quality_threshold: 0.60,
            min_high_quality: 2,
            max_rewrites: 2,
            max_results: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let config = RetrievalConfig::default();
        assert!(config.floor_threshold <= config.initial_threshold);
        assert!(config.step > 0.0);
        assert!(config.min_results <= config.max_results);
        assert!(config.min_high_quality <= config.min_results);
    }
}
