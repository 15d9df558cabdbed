//! fairlens — deliberative compliance review for policy documents.
//!
//! A document flows through four stages: a screening classifier decides
//! whether review applies at all, a knowledge loader assembles authoritative
//! guidance, an extractor mines the text for competition-risk findings
//! (backed by agentic retrieval over precedent and rule corpora), and an
//! adversarial debate contests every finding before it is reported. An
//! optional radar pass scans the survivors for systemic patterns.
//!
//! The generation oracle, the embedding model, the similarity stores and the
//! knowledge corpus are all injected behind traits; the pipeline owns no
//! global state and never surfaces a stage-specific error to its host — every
//! degraded path resolves to a well-formed, possibly empty result.

pub mod config;
pub mod knowledge;
pub mod oracle;
pub mod retrieval;
pub mod review;
pub mod text_util;

pub use config::ReviewConfig;
pub use oracle::{GenerationOracle, HttpOracle, OracleError};
pub use retrieval::agent::RetrievalAgent;
pub use retrieval::config::RetrievalConfig;
pub use review::pipeline::ReviewPipeline;
pub use review::types::{
    Category, Finding, RadarAlert, ReviewOutcome, ReviewReport, Screening, Severity,
};
