// Test mocks for the extraction pipeline.
//
// Two mocks matching the two trait boundaries:
// - MockValidator (SemanticValidator) — HashMap-based text→score oracle
// - FakeStrategy (ExtractionStrategy) — scripted per-attempt behavior
//
// Plus helpers for constructing SourceItem, CandidateCase, and CaseRecord.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use casescout_common::{CaseRecord, SourceItem, SourceKind};
use casescout_extract::{categorize, CandidateCase};

use crate::strategy::ExtractionStrategy;
use crate::traits::SemanticValidator;

// ---------------------------------------------------------------------------
// MockValidator
// ---------------------------------------------------------------------------

/// HashMap-based semantic oracle. Unregistered texts get the default
/// score; unregistered pairs get similarity 0.0. `failing()` errors on
/// every call.
pub struct MockValidator {
    scores: HashMap<String, f32>,
    similarities: HashMap<(String, String), f32>,
    default_score: f32,
    fail: bool,
}

impl MockValidator {
    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
            similarities: HashMap::new(),
            default_score: 0.5,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_default_score(mut self, score: f32) -> Self {
        self.default_score = score;
        self
    }

    pub fn on_score(mut self, text: &str, score: f32) -> Self {
        self.scores.insert(text.to_string(), score);
        self
    }

    /// Registers the pair symmetrically.
    pub fn on_similarity(mut self, a: &str, b: &str, similarity: f32) -> Self {
        self.similarities
            .insert((a.to_string(), b.to_string()), similarity);
        self.similarities
            .insert((b.to_string(), a.to_string()), similarity);
        self
    }
}

impl Default for MockValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SemanticValidator for MockValidator {
    async fn score(&self, text: &str) -> Result<f32> {
        if self.fail {
            bail!("MockValidator: scripted failure");
        }
        Ok(self.scores.get(text).copied().unwrap_or(self.default_score))
    }

    async fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        if self.fail {
            bail!("MockValidator: scripted failure");
        }
        Ok(self
            .similarities
            .get(&(a.to_string(), b.to_string()))
            .copied()
            .unwrap_or(0.0))
    }
}

// ---------------------------------------------------------------------------
// FakeStrategy
// ---------------------------------------------------------------------------

pub enum FakeBehavior {
    Produce(Vec<CandidateCase>),
    Fail(&'static str),
    /// Sleeps far past its own timeout.
    Hang,
}

pub struct FakeStrategy {
    name: &'static str,
    timeout: Duration,
    threshold: f32,
    behavior: FakeBehavior,
    score: f32,
    delay: Duration,
}

impl FakeStrategy {
    pub fn producing(
        name: &'static str,
        threshold: f32,
        score: f32,
        cases: Vec<CandidateCase>,
    ) -> Self {
        Self {
            name,
            timeout: Duration::from_secs(1),
            threshold,
            behavior: FakeBehavior::Produce(cases),
            score,
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long inside `extract` before responding. Must stay under
    /// the strategy's own timeout to complete.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(name: &'static str, message: &'static str) -> Self {
        Self {
            name,
            timeout: Duration::from_secs(1),
            threshold: 0.5,
            behavior: FakeBehavior::Fail(message),
            score: 0.0,
            delay: Duration::ZERO,
        }
    }

    pub fn hanging(name: &'static str) -> Self {
        Self {
            name,
            timeout: Duration::from_millis(50),
            threshold: 0.5,
            behavior: FakeBehavior::Hang,
            score: 0.0,
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl ExtractionStrategy for FakeStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }

    async fn extract(&self, _content: &str, _item: &SourceItem) -> Result<Vec<CandidateCase>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behavior {
            FakeBehavior::Produce(cases) => Ok(cases.clone()),
            FakeBehavior::Fail(message) => bail!("{message}"),
            FakeBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn case_confidence(&self, _case: &CandidateCase) -> f32 {
        self.score
    }
}

/// Opt-in log output for tests: `RUST_LOG=debug cargo test -- --nocapture`.
#[cfg(test)]
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------------------

pub fn sample_item(url: &str) -> SourceItem {
    SourceItem::new("Sample source", url, "some body text")
}

pub fn candidate(title: &str, prompt: &str) -> CandidateCase {
    CandidateCase {
        title: title.to_string(),
        prompts: vec![prompt.to_string()],
        effects: Vec::new(),
        images: Vec::new(),
    }
}

pub fn record(title: &str, prompt: &str, url: &str) -> CaseRecord {
    let prompts = vec![prompt.to_string()];
    CaseRecord {
        id: Uuid::new_v4(),
        title: title.to_string(),
        category: categorize(title, "", &prompts),
        prompts,
        effects: Vec::new(),
        images: Vec::new(),
        source_url: url.to_string(),
        source: SourceKind::Web,
        extracted_at: Utc::now(),
        confidence: 0.7,
    }
}
