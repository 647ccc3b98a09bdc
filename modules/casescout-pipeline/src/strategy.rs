//! Extraction strategies. Each wraps one extractor family and carries its
//! own timeout and acceptance threshold; the chain tries them cheapest
//! first.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use casescout_common::SourceItem;
use casescout_extract::{
    candidate_confidence, extract_generic, extract_structured, normalize_text, refined_confidence,
    CandidateCase,
};

use crate::traits::SemanticValidator;

/// One extraction algorithm in the fallback chain.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Wall-clock budget for a single attempt. Exceeding it fails the
    /// attempt, never the chain.
    fn timeout(&self) -> Duration;

    /// Confidence at or above which the chain accepts without trying
    /// further strategies.
    fn threshold(&self) -> f32;

    async fn extract(&self, content: &str, item: &SourceItem) -> Result<Vec<CandidateCase>>;

    /// Strategy-specific belief that one produced candidate is genuine.
    async fn case_confidence(&self, case: &CandidateCase) -> f32;
}

/// Format-detection extractor: precise on section-structured documents,
/// useless elsewhere. Cheapest, so it runs first.
pub struct StructuredStrategy;

#[async_trait]
impl ExtractionStrategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn threshold(&self) -> f32 {
        0.6
    }

    async fn extract(&self, content: &str, _item: &SourceItem) -> Result<Vec<CandidateCase>> {
        Ok(extract_structured(&normalize_text(content)))
    }

    async fn case_confidence(&self, case: &CandidateCase) -> f32 {
        candidate_confidence(case.lead_prompt(), &case.effects, &case.images)
    }
}

/// Broad-pattern extractor over the whole document. Lower precision,
/// higher acceptance bar.
pub struct GenericStrategy;

#[async_trait]
impl ExtractionStrategy for GenericStrategy {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn threshold(&self) -> f32 {
        0.7
    }

    async fn extract(&self, content: &str, item: &SourceItem) -> Result<Vec<CandidateCase>> {
        Ok(extract_generic(content, &item.title))
    }

    async fn case_confidence(&self, case: &CandidateCase) -> f32 {
        refined_confidence(case.lead_prompt(), &case.effects, &case.images)
    }
}

/// Generic extraction re-scored by the semantic oracle. Registered only
/// when a validator is configured; most expensive, tried last.
pub struct ValidatedStrategy {
    validator: Arc<dyn SemanticValidator>,
}

impl ValidatedStrategy {
    pub fn new(validator: Arc<dyn SemanticValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl ExtractionStrategy for ValidatedStrategy {
    fn name(&self) -> &'static str {
        "validated"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(15)
    }

    fn threshold(&self) -> f32 {
        0.8
    }

    async fn extract(&self, content: &str, item: &SourceItem) -> Result<Vec<CandidateCase>> {
        Ok(extract_generic(content, &item.title))
    }

    async fn case_confidence(&self, case: &CandidateCase) -> f32 {
        match self.validator.score(case.lead_prompt()).await {
            Ok(score) => score.clamp(0.0, 1.0),
            Err(e) => {
                warn!(error = %e, "validator score failed, using heuristic confidence");
                refined_confidence(case.lead_prompt(), &case.effects, &case.images)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockValidator;

    fn item(url: &str) -> SourceItem {
        SourceItem::new("A figurine thread", url, "")
    }

    #[tokio::test]
    async fn structured_strategy_parses_sectioned_documents() {
        let content = "Case 1: Figurine maker\n```yaml\nCreate a 3D figurine of the uploaded photo\n```\n";
        let cases = StructuredStrategy
            .extract(content, &item("https://github.com/a/b"))
            .await
            .unwrap();
        assert_eq!(cases.len(), 1);
        let confidence = StructuredStrategy.case_confidence(&cases[0]).await;
        assert!(confidence >= StructuredStrategy.threshold());
    }

    #[tokio::test]
    async fn generic_strategy_handles_prose() {
        let content = "Prompt: ```\nTransform the portrait photo into a vintage oil painting\n```";
        let cases = GenericStrategy
            .extract(content, &item("https://blog.example.com/p"))
            .await
            .unwrap();
        assert_eq!(cases.len(), 1);
    }

    #[tokio::test]
    async fn validated_strategy_uses_oracle_score() {
        let validator = Arc::new(
            MockValidator::new().on_score("Create a 3D figurine of the uploaded photo", 0.95),
        );
        let strategy = ValidatedStrategy::new(validator);
        let content = "Prompt: ```\nCreate a 3D figurine of the uploaded photo\n```";
        let cases = strategy.extract(content, &item("https://x.test")).await.unwrap();
        let confidence = strategy.case_confidence(&cases[0]).await;
        assert!((confidence - 0.95).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn validated_strategy_degrades_when_oracle_errors() {
        let strategy = ValidatedStrategy::new(Arc::new(MockValidator::failing()));
        let case = CandidateCase {
            title: "t".into(),
            prompts: vec!["Create a 3D figurine of the uploaded photo".into()],
            effects: vec![],
            images: vec![],
        };
        let confidence = strategy.case_confidence(&case).await;
        // Falls back to the pattern heuristic instead of erroring.
        assert!(confidence > 0.0);
    }
}
