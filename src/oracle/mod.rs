pub mod client;
pub mod embedding;
pub mod mock;

pub use client::HttpOracle;
pub use embedding::HttpEmbedder;
pub use mock::MockOracle;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle endpoint unreachable: {0}")]
    Connection(String),

    #[error("oracle request timed out after {0}s")]
    Timeout(u64),

    #[error("oracle returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("oracle response could not be read: {0}")]
    ResponseParsing(String),

    #[error("missing configuration: {0}")]
    Configuration(String),
}

/// External text-generation capability.
///
/// One call, at most once — no retry or backoff is layered on top. The
/// oracle may legitimately return `Ok(None)` (the provider produced an empty
/// choice); callers asking for structured output must re-validate the text
/// themselves, the flag is only a hint to the provider.
pub trait GenerationOracle: Send + Sync {
    fn generate(
        &self,
        system: &str,
        user: &str,
        json_mode: bool,
        model: &str,
    ) -> Result<Option<String>, OracleError>;
}
