//! The strategy chain: tries strategies in priority order under per-attempt
//! timeouts, short-circuits when a strategy clears its own threshold, and
//! otherwise falls back to the best completed attempt. A source for which
//! every strategy fails yields an empty outcome, never an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use casescout_common::{CaseRecord, SourceItem};
use casescout_extract::{categorize, CandidateCase};

use crate::strategy::{
    ExtractionStrategy, GenericStrategy, StructuredStrategy, ValidatedStrategy,
};
use crate::traits::SemanticValidator;

/// Per-source progression through the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Pending,
    Trying(usize),
    Accepted,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure,
    Timeout,
}

/// One (source, strategy) pairing. Transient: lives only within a single
/// pipeline run, retained on the outcome for diagnostics.
#[derive(Debug, Clone)]
pub struct ExtractionAttempt {
    pub strategy: &'static str,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: AttemptOutcome,
    pub cases: Vec<CandidateCase>,
    pub case_scores: Vec<f32>,
    pub confidence: f32,
}

/// What one source produced after the full chain ran.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub cases: Vec<CaseRecord>,
    pub strategy: Option<&'static str>,
    pub confidence: f32,
    pub fallback_used: bool,
    pub state: ChainState,
    /// The attempt whose cases were selected; stats fold its timing in.
    pub selected: Option<ExtractionAttempt>,
    /// Completed attempts that were not selected.
    pub alternatives: Vec<ExtractionAttempt>,
    pub errors: Vec<(&'static str, String)>,
}

impl ExtractionOutcome {
    fn empty(errors: Vec<(&'static str, String)>, alternatives: Vec<ExtractionAttempt>) -> Self {
        Self {
            cases: Vec::new(),
            strategy: None,
            confidence: 0.0,
            fallback_used: false,
            state: ChainState::Exhausted,
            selected: None,
            alternatives,
            errors,
        }
    }
}

pub struct StrategyChain {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// The built-in priority order: structured, generic, and (only when an
    /// oracle is configured) validated.
    pub fn standard(validator: Option<Arc<dyn SemanticValidator>>) -> Self {
        let mut strategies: Vec<Arc<dyn ExtractionStrategy>> =
            vec![Arc::new(StructuredStrategy), Arc::new(GenericStrategy)];
        if let Some(validator) = validator {
            strategies.push(Arc::new(ValidatedStrategy::new(validator)));
        }
        Self::new(strategies)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run the chain for one source. Strategies run strictly sequentially;
    /// a timeout or error on one attempt only advances the chain.
    pub async fn extract_intelligently(
        &self,
        content: &str,
        item: &SourceItem,
    ) -> ExtractionOutcome {
        let mut attempts: Vec<ExtractionAttempt> = Vec::new();
        let mut errors: Vec<(&'static str, String)> = Vec::new();
        let mut state = ChainState::Pending;
        debug!(url = %item.url, strategies = self.strategies.len(), state = ?state, "chain start");

        for (index, strategy) in self.strategies.iter().enumerate() {
            state = ChainState::Trying(index);
            debug!(url = %item.url, strategy = strategy.name(), state = ?state, "trying strategy");

            let started_at = Utc::now();
            let start = Instant::now();
            let attempt_result =
                tokio::time::timeout(strategy.timeout(), strategy.extract(content, item)).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match attempt_result {
                Err(_) => {
                    warn!(url = %item.url, strategy = strategy.name(), "strategy timed out");
                    errors.push((strategy.name(), "timed out".to_string()));
                    attempts.push(ExtractionAttempt {
                        strategy: strategy.name(),
                        started_at,
                        duration_ms,
                        outcome: AttemptOutcome::Timeout,
                        cases: Vec::new(),
                        case_scores: Vec::new(),
                        confidence: 0.0,
                    });
                }
                Ok(Err(e)) => {
                    warn!(url = %item.url, strategy = strategy.name(), error = %e, "strategy failed");
                    errors.push((strategy.name(), e.to_string()));
                    attempts.push(ExtractionAttempt {
                        strategy: strategy.name(),
                        started_at,
                        duration_ms,
                        outcome: AttemptOutcome::Failure,
                        cases: Vec::new(),
                        case_scores: Vec::new(),
                        confidence: 0.0,
                    });
                }
                Ok(Ok(cases)) => {
                    let mut case_scores = Vec::with_capacity(cases.len());
                    for case in &cases {
                        case_scores.push(strategy.case_confidence(case).await);
                    }
                    let confidence = case_scores.iter().copied().fold(0.0_f32, f32::max);
                    let attempt = ExtractionAttempt {
                        strategy: strategy.name(),
                        started_at,
                        duration_ms,
                        outcome: AttemptOutcome::Success,
                        cases,
                        case_scores,
                        confidence,
                    };

                    if !attempt.cases.is_empty() && confidence >= strategy.threshold() {
                        let records = mint_records(&attempt, item);
                        info!(
                            url = %item.url,
                            strategy = attempt.strategy,
                            cases = records.len(),
                            confidence,
                            "strategy accepted"
                        );
                        return ExtractionOutcome {
                            cases: records,
                            strategy: Some(attempt.strategy),
                            confidence,
                            fallback_used: false,
                            state: ChainState::Accepted,
                            selected: Some(attempt),
                            alternatives: attempts,
                            errors,
                        };
                    }
                    attempts.push(attempt);
                }
            }
        }
        state = ChainState::Exhausted;

        // No strategy cleared its threshold: the best completed attempt
        // with any cases wins.
        let best_index = attempts
            .iter()
            .enumerate()
            .filter(|(_, a)| a.outcome == AttemptOutcome::Success && !a.cases.is_empty())
            .max_by(|(_, a), (_, b)| a.confidence.total_cmp(&b.confidence))
            .map(|(i, _)| i);

        match best_index {
            Some(i) => {
                let attempt = attempts.remove(i);
                let records = mint_records(&attempt, item);
                info!(
                    url = %item.url,
                    strategy = attempt.strategy,
                    cases = records.len(),
                    confidence = attempt.confidence,
                    "falling back to best attempt"
                );
                ExtractionOutcome {
                    cases: records,
                    strategy: Some(attempt.strategy),
                    confidence: attempt.confidence,
                    fallback_used: true,
                    state,
                    selected: Some(attempt),
                    alternatives: attempts,
                    errors,
                }
            }
            None => {
                debug!(url = %item.url, "no strategy produced cases");
                ExtractionOutcome::empty(errors, attempts)
            }
        }
    }

    /// Batch variant: at most `concurrency` extractions in flight, a fixed
    /// pacing delay between chunks, per-item isolation of failures.
    /// Outcomes come back in input order.
    pub async fn extract_batch(
        &self,
        items: &[SourceItem],
        concurrency: usize,
        pacing: Duration,
    ) -> Vec<ExtractionOutcome> {
        let concurrency = concurrency.max(1);
        let mut indexed: Vec<(usize, ExtractionOutcome)> = Vec::with_capacity(items.len());

        for (chunk_index, chunk) in items.chunks(concurrency).enumerate() {
            if chunk_index > 0 && !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
            let base = chunk_index * concurrency;
            let results: Vec<(usize, ExtractionOutcome)> =
                stream::iter(chunk.iter().enumerate().map(|(offset, item)| {
                    let index = base + offset;
                    async move {
                        (
                            index,
                            self.extract_intelligently(&item.description, item).await,
                        )
                    }
                }))
                .buffer_unordered(concurrency)
                .collect()
                .await;
            indexed.extend(results);
        }

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

/// Turn a selected attempt's candidates into records. Ids, categories, and
/// timestamps are assigned here and nowhere else.
fn mint_records(attempt: &ExtractionAttempt, item: &SourceItem) -> Vec<CaseRecord> {
    attempt
        .cases
        .iter()
        .zip(attempt.case_scores.iter())
        .filter(|(case, _)| !case.prompts.is_empty())
        .map(|(case, score)| CaseRecord {
            id: Uuid::new_v4(),
            title: case.title.clone(),
            category: categorize(&case.title, &case.effects.join(" "), &case.prompts),
            prompts: case.prompts.clone(),
            effects: case.effects.clone(),
            images: case.images.clone(),
            source_url: item.url.clone(),
            source: item.source,
            extracted_at: Utc::now(),
            confidence: *score,
        })
        .collect()
}
