use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::RetrievalError;

/// One document in a similarity-searchable corpus.
///
/// `tag`, `outcome` and `detail` are populated for precedent corpora
/// (violation type, enforcement outcome, key violating element) and left
/// empty for rule corpora.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDoc {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// A candidate with its similarity score.
///
/// `matched_query` records the query variant that produced the best score
/// during fusion; `source_fragment` records the document fragment that drove
/// the retrieval during batch runs.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub doc: CandidateDoc,
    pub score: f32,
    pub matched_query: Option<String>,
    pub source_fragment: Option<String>,
}

/// Text-to-vector embedding capability, called once per unique query string.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// External vector-similarity search capability.
///
/// `keyword_search` is the degraded path taken when no usable embedding
/// exists for a query — a substring lookup that keeps retrieval alive with
/// zero-scored hits instead of crashing the caller.
pub trait SimilaritySearch: Send + Sync {
    fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError>;

    fn keyword_search(&self, query: &str, top_k: usize)
        -> Result<Vec<ScoredCandidate>, RetrievalError>;
}

/// In-memory similarity store backed by cosine distance.
///
/// Real deployments plug a vector database behind the same trait; this store
/// serves small corpora and the test-suite.
pub struct InMemorySimilarityStore {
    entries: Vec<StoredDoc>,
}

struct StoredDoc {
    doc: CandidateDoc,
    embedding: Vec<f32>,
}

impl InMemorySimilarityStore {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn add(&mut self, doc: CandidateDoc, embedding: Vec<f32>) {
        self.entries.push(StoredDoc { doc, embedding });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemorySimilarityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilaritySearch for InMemorySimilarityStore {
    fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        let mut scored: Vec<ScoredCandidate> = self
            .entries
            .iter()
            .map(|entry| ScoredCandidate {
                doc: entry.doc.clone(),
                score: cosine_similarity(query_vector, &entry.embedding),
                matched_query: None,
                source_fragment: None,
            })
            .filter(|candidate| candidate.score >= min_score)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    fn keyword_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        let needle = query.to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|entry| {
                entry.doc.title.to_lowercase().contains(&needle)
                    || entry.doc.body.to_lowercase().contains(&needle)
                    || entry
                        .doc
                        .tag
                        .as_deref()
                        .is_some_and(|tag| tag.to_lowercase().contains(&needle))
            })
            .take(top_k)
            .map(|entry| ScoredCandidate {
                doc: entry.doc.clone(),
                score: 0.0,
                matched_query: None,
                source_fragment: None,
            })
            .collect())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str) -> CandidateDoc {
        CandidateDoc {
            id: id.to_string(),
            title: title.to_string(),
            body: format!("{title} body"),
            tag: None,
            outcome: None,
            detail: None,
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!((sim - 1.0).abs() < 0.01);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 0.01);
    }

    #[test]
    fn cosine_mismatched_dimensions() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn search_ranks_and_filters() {
        let mut store = InMemorySimilarityStore::new();
        store.add(doc("a", "close match"), vec![1.0, 0.0, 0.0]);
        store.add(doc("b", "middling match"), vec![0.7, 0.714, 0.0]);
        store.add(doc("c", "far match"), vec![0.0, 1.0, 0.0]);

        let results = store.search(&[1.0, 0.0, 0.0], 10, 0.5).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].doc.id, "a");
        assert_eq!(results[1].doc.id, "b");
    }

    #[test]
    fn search_respects_top_k() {
        let mut store = InMemorySimilarityStore::new();
        for i in 0..5 {
            store.add(doc(&format!("d{i}"), "entry"), vec![1.0, 0.0]);
        }
        let results = store.search(&[1.0, 0.0], 3, 0.0).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn keyword_search_matches_title_and_body() {
        let mut store = InMemorySimilarityStore::new();
        store.add(doc("a", "Local registration requirement"), vec![1.0]);
        store.add(doc("b", "Unrelated notice"), vec![1.0]);

        let results = store.keyword_search("registration", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc.id, "a");
        assert_eq!(results[0].score, 0.0);
    }
}
