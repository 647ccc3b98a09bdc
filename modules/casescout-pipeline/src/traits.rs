use anyhow::Result;
use async_trait::async_trait;

/// Black-box semantic oracle (an LLM or embedding service behind an API).
/// The pipeline must keep working, with reduced precision, when the oracle
/// is absent or erroring; callers log and fall back to pattern-only
/// behavior.
#[async_trait]
pub trait SemanticValidator: Send + Sync {
    /// Calibrated belief in [0, 1] that `text` is a genuine usage prompt.
    async fn score(&self, text: &str) -> Result<f32>;

    /// Semantic similarity in [0, 1] between two prompts.
    async fn similarity(&self, a: &str, b: &str) -> Result<f32>;
}
