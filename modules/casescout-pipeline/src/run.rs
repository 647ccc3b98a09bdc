//! The batch runner: cache gate, strategy chain, dedup, merge, persist.
//! Collaborators are injected once at construction; the runner holds no
//! global state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use casescout_common::{CaseRecord, CaseScoutError, Config, SourceItem};

use crate::cache::IncrementalCache;
use crate::chain::StrategyChain;
use crate::dedup::{dedupe_by_key, DedupConfig, DedupEngine};
use crate::output::CaseSet;
use crate::stats::RunStats;
use crate::traits::SemanticValidator;

pub const DEFAULT_BATCH_CONCURRENCY: usize = 3;
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

pub struct Pipeline {
    chain: Arc<StrategyChain>,
    dedup: DedupEngine,
    cache: IncrementalCache,
    output_path: PathBuf,
    batch_concurrency: usize,
    pacing: Duration,
}

impl Pipeline {
    pub fn new(
        chain: Arc<StrategyChain>,
        dedup: DedupEngine,
        cache: IncrementalCache,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            chain,
            dedup,
            cache,
            output_path: output_path.into(),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            pacing: DEFAULT_PACING,
        }
    }

    /// Assemble a pipeline from environment variables.
    pub fn from_env(
        validator: Option<Arc<dyn SemanticValidator>>,
    ) -> Result<Self, CaseScoutError> {
        Self::from_config(&Config::from_env(), validator)
    }

    /// Assemble a pipeline from configuration. The validator, when present
    /// and enabled by the config, feeds both the chain and the dedup engine.
    pub fn from_config(
        config: &Config,
        validator: Option<Arc<dyn SemanticValidator>>,
    ) -> Result<Self, CaseScoutError> {
        let validator = validator.filter(|_| config.semantic_validation_enabled());
        let chain = Arc::new(StrategyChain::standard(validator.clone()));
        let dedup = DedupEngine::new(
            DedupConfig {
                similarity_threshold: config.similarity_threshold,
                ..DedupConfig::default()
            },
            validator,
        );
        let cache = IncrementalCache::open(config.cache_path.clone())?;
        Ok(
            Self::new(chain, dedup, cache, config.output_path.clone())
                .with_concurrency(config.batch_concurrency),
        )
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency.max(1);
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Process one batch of sources end to end. A source yielding nothing
    /// is not an error; it only shows up in the stats.
    pub async fn run(&mut self, items: &[SourceItem]) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let existing = CaseSet::load(&self.output_path)?;
        let existing_total = existing.as_ref().map(|set| set.cases.len()).unwrap_or(0);
        let observed_counts = count_by_url(existing.as_ref());

        // Cache gate: only changed or unseen sources reach the chain.
        let mut to_process: Vec<SourceItem> = Vec::new();
        for item in items {
            let observed = observed_counts.get(item.url.as_str()).copied().unwrap_or(0);
            let decision = self
                .cache
                .should_process(&item.url, &item.description, observed);
            if decision.process {
                debug!(url = %item.url, reason = ?decision.reason, "processing source");
                to_process.push(item.clone());
            } else {
                debug!(url = %item.url, "unchanged, skipping");
                stats.sources_skipped += 1;
            }
        }

        let outcomes = self
            .chain
            .extract_batch(&to_process, self.batch_concurrency, self.pacing)
            .await;

        let mut extracted: Vec<CaseRecord> = Vec::new();
        for outcome in &outcomes {
            stats.record_outcome(outcome);
            extracted.extend(outcome.cases.iter().cloned());
        }

        let (deduped, prompt_duplicates) = self.dedup.dedupe(extracted).await;
        let before_key_dedup = deduped.len();
        let deduped = dedupe_by_key(deduped);
        stats.cases_deduplicated =
            prompt_duplicates + (before_key_dedup - deduped.len()) as u32;

        let mut merged = CaseSet::merge(existing, deduped);
        merged.sort_records();
        stats.cases_stored = (merged.cases.len() - existing_total) as u32;
        merged.save(&self.output_path)?;

        // The cache remembers how many cases each source contributes to
        // the persisted set, so an identical rerun reads as unchanged.
        let stored_counts = count_by_url(Some(&merged));
        for item in &to_process {
            let count = stored_counts.get(item.url.as_str()).copied().unwrap_or(0);
            self.cache.update(&item.url, &item.description, count);
        }
        self.cache.save()?;

        info!("{stats}");
        Ok(stats)
    }

    pub fn cache(&self) -> &IncrementalCache {
        &self.cache
    }
}

fn count_by_url(set: Option<&CaseSet>) -> HashMap<&str, u32> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    if let Some(set) = set {
        for case in &set.cases {
            *counts.entry(case.source_url.as_str()).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ProcessReason;
    use crate::dedup::DedupConfig;
    use crate::testing::MockValidator;
    use tempfile::TempDir;

    fn pipeline_in(dir: &TempDir) -> Pipeline {
        let chain = Arc::new(StrategyChain::standard(None));
        let dedup = DedupEngine::new(DedupConfig::default(), None);
        let cache = IncrementalCache::open(dir.path().join("cache.json")).unwrap();
        Pipeline::new(chain, dedup, cache, dir.path().join("cases.json"))
            .with_pacing(Duration::ZERO)
    }

    fn figurine_item() -> SourceItem {
        SourceItem::new(
            "Awesome cases",
            "https://github.com/acme/cases",
            "Case 1: Figurine maker\n```yaml\nCreate a 3D figurine of the uploaded photo\n```\n",
        )
    }

    #[tokio::test]
    async fn second_run_on_unchanged_input_is_all_skips() {
        crate::testing::init_test_logging();
        let dir = TempDir::new().unwrap();
        let items = vec![figurine_item()];

        let first = {
            let mut pipeline = pipeline_in(&dir);
            pipeline.run(&items).await.unwrap()
        };
        assert_eq!(first.sources_processed, 1);
        assert_eq!(first.cases_stored, 1);

        // Fresh pipeline over the same persisted cache and case set.
        let mut pipeline = pipeline_in(&dir);
        let second = pipeline.run(&items).await.unwrap();
        assert_eq!(second.sources_processed, 0);
        assert_eq!(second.sources_skipped, 1);
        assert_eq!(second.cases_stored, 0);

        let set = CaseSet::load(&dir.path().join("cases.json")).unwrap().unwrap();
        assert_eq!(set.total, 1);
    }

    #[tokio::test]
    async fn truncated_prompt_across_sources_is_merged_away() {
        let dir = TempDir::new().unwrap();
        let items = vec![
            SourceItem::new(
                "Long",
                "https://x.test/long",
                "Prompt: ```\nCreate a 3D figurine of the uploaded photo on a collector stand\n```",
            ),
            SourceItem::new(
                "Short",
                "https://x.test/short",
                "Prompt: ```\nCreate a 3D figurine of the upl\n```",
            ),
        ];
        let mut pipeline = pipeline_in(&dir);
        let stats = pipeline.run(&items).await.unwrap();
        assert_eq!(stats.cases_deduplicated, 1);

        let set = CaseSet::load(&dir.path().join("cases.json")).unwrap().unwrap();
        assert_eq!(set.total, 1);
        assert!(set.cases[0].prompts[0].ends_with("collector stand"));
    }

    #[tokio::test]
    async fn empty_yield_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let items = vec![SourceItem::new(
            "Nothing here",
            "https://x.test/empty",
            "just prose with no instructions at all",
        )];
        let mut pipeline = pipeline_in(&dir);
        let stats = pipeline.run(&items).await.unwrap();
        assert_eq!(stats.sources_processed, 1);
        assert_eq!(stats.cases_extracted, 0);
        assert_eq!(stats.sources_failed, 0);
    }

    #[tokio::test]
    async fn from_config_wires_paths_and_concurrency() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = Pipeline::from_config(&config_in(&dir, ""), None)
            .unwrap()
            .with_pacing(Duration::ZERO);
        let stats = pipeline.run(&[figurine_item()]).await.unwrap();
        assert_eq!(stats.cases_stored, 1);
        assert!(dir.path().join("cases.json").exists());
        assert!(dir.path().join("cache.json").exists());
    }

    fn config_in(dir: &TempDir, validator_api_key: &str) -> Config {
        Config {
            validator_api_key: validator_api_key.to_string(),
            batch_concurrency: 2,
            similarity_threshold: 0.8,
            cache_path: dir.path().join("cache.json").to_string_lossy().into_owned(),
            output_path: dir.path().join("cases.json").to_string_lossy().into_owned(),
        }
    }

    #[test]
    fn empty_validator_key_disables_semantic_strategies() {
        let dir = TempDir::new().unwrap();
        let oracle: Arc<dyn crate::traits::SemanticValidator> = Arc::new(MockValidator::new());

        let gated = Pipeline::from_config(&config_in(&dir, ""), Some(oracle.clone())).unwrap();
        assert_eq!(gated.chain.len(), 2);

        let enabled = Pipeline::from_config(&config_in(&dir, "k-123"), Some(oracle)).unwrap();
        assert_eq!(enabled.chain.len(), 3);
    }

    // The only test in this binary that touches process env.
    #[tokio::test]
    async fn from_env_builds_a_working_pipeline() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("CACHE_PATH", dir.path().join("cache.json"));
        std::env::set_var("OUTPUT_PATH", dir.path().join("cases.json"));
        std::env::remove_var("VALIDATOR_API_KEY");

        let mut pipeline = Pipeline::from_env(None).unwrap().with_pacing(Duration::ZERO);
        let stats = pipeline.run(&[figurine_item()]).await.unwrap();
        assert_eq!(stats.cases_stored, 1);
        assert!(dir.path().join("cases.json").exists());

        std::env::remove_var("CACHE_PATH");
        std::env::remove_var("OUTPUT_PATH");
    }

    #[tokio::test]
    async fn changed_count_triggers_reprocess() {
        let dir = TempDir::new().unwrap();
        let items = vec![figurine_item()];
        let mut pipeline = pipeline_in(&dir);
        pipeline.run(&items).await.unwrap();

        // Same text, different observed count: the gate must reopen.
        let mut pipeline = pipeline_in(&dir);
        let item = figurine_item();
        let decision = pipeline.cache.should_process(&item.url, &item.description, 7);
        assert!(decision.process);
        assert_eq!(decision.reason, ProcessReason::Changed);
    }
}
