pub mod agent;
pub mod config;
pub mod store;

pub use agent::RetrievalAgent;
pub use config::RetrievalConfig;
pub use store::{CandidateDoc, Embedder, InMemorySimilarityStore, ScoredCandidate, SimilaritySearch};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("embedding generation failed: {0}")]
    Embedding(String),

    #[error("similarity store query failed: {0}")]
    Store(String),
}
