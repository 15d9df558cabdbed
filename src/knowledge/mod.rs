pub mod loader;

pub use loader::load_guidance;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::review::types::Category;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("corpus store query failed: {0}")]
    Store(String),
}

/// One document in the reference corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDoc {
    pub id: u64,
    pub title: String,
    pub body: String,
}

/// Lightweight listing shown to the oracle during selection — titles only,
/// so selection cost stays independent of fragment-body length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: u64,
    pub title: String,
}

/// External knowledge-corpus capability: one primary ruleset per category
/// plus a bounded collection of short expert Q&A fragments.
pub trait KnowledgeStore: Send + Sync {
    fn fetch_primary(&self, category: Category) -> Result<Option<CorpusDoc>, KnowledgeError>;

    fn list_index(&self) -> Result<Vec<IndexEntry>, KnowledgeError>;

    fn fetch_by_ids(&self, ids: &[u64]) -> Result<Vec<CorpusDoc>, KnowledgeError>;
}

/// In-memory corpus store for small deployments and tests.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    primary: HashMap<Category, CorpusDoc>,
    fragments: Vec<CorpusDoc>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_primary(&mut self, category: Category, doc: CorpusDoc) {
        self.primary.insert(category, doc);
    }

    pub fn add_fragment(&mut self, doc: CorpusDoc) {
        self.fragments.push(doc);
    }
}

impl KnowledgeStore for InMemoryKnowledgeStore {
    fn fetch_primary(&self, category: Category) -> Result<Option<CorpusDoc>, KnowledgeError> {
        Ok(self.primary.get(&category).cloned())
    }

    fn list_index(&self) -> Result<Vec<IndexEntry>, KnowledgeError> {
        Ok(self
            .fragments
            .iter()
            .map(|doc| IndexEntry {
                id: doc.id,
                title: doc.title.clone(),
            })
            .collect())
    }

    fn fetch_by_ids(&self, ids: &[u64]) -> Result<Vec<CorpusDoc>, KnowledgeError> {
        Ok(self
            .fragments
            .iter()
            .filter(|doc| ids.contains(&doc.id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_round_trip() {
        let mut store = InMemoryKnowledgeStore::new();
        store.set_primary(
            Category::Bidding,
            CorpusDoc {
                id: 1,
                title: "Bidding review ruleset".into(),
                body: "rules".into(),
            },
        );
        store.add_fragment(CorpusDoc {
            id: 10,
            title: "May a tender require local registration?".into(),
            body: "No — that excludes non-local bidders.".into(),
        });

        let primary = store.fetch_primary(Category::Bidding).unwrap().unwrap();
        assert_eq!(primary.id, 1);
        assert!(store.fetch_primary(Category::Policy).unwrap().is_none());

        let index = store.list_index().unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].id, 10);

        let fetched = store.fetch_by_ids(&[10, 99]).unwrap();
        assert_eq!(fetched.len(), 1);
    }
}
