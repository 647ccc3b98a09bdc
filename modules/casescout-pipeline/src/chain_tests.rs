use std::sync::Arc;
use std::time::Duration;

use casescout_common::CaseCategory;

use crate::chain::{AttemptOutcome, ChainState, StrategyChain};
use crate::stats::RunStats;
use crate::strategy::ExtractionStrategy;
use crate::testing::{candidate, sample_item, FakeStrategy, MockValidator};

fn chain_of(strategies: Vec<FakeStrategy>) -> StrategyChain {
    StrategyChain::new(
        strategies
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn ExtractionStrategy>)
            .collect(),
    )
}

fn figurine_candidate() -> FakeStrategy {
    FakeStrategy::producing(
        "fast",
        0.6,
        0.9,
        vec![candidate(
            "Figurine maker",
            "Create a 3D figurine of the uploaded photo",
        )],
    )
}

#[tokio::test]
async fn first_strategy_over_threshold_short_circuits() {
    let chain = chain_of(vec![
        figurine_candidate(),
        FakeStrategy::failing("never", "should not run"),
    ]);
    let outcome = chain
        .extract_intelligently("text", &sample_item("https://x.test/a"))
        .await;

    assert_eq!(outcome.strategy, Some("fast"));
    assert_eq!(outcome.state, ChainState::Accepted);
    assert!(!outcome.fallback_used);
    assert_eq!(outcome.cases.len(), 1);
    // The second strategy never ran.
    assert!(outcome.errors.is_empty());
    assert!(outcome.alternatives.is_empty());
}

#[tokio::test]
async fn timeout_falls_through_to_next_strategy() {
    let chain = chain_of(vec![
        FakeStrategy::hanging("slow"),
        FakeStrategy::producing(
            "backup",
            0.9,
            0.5,
            vec![candidate("B", "Turn the photo into a sticker sheet")],
        ),
    ]);
    let outcome = chain
        .extract_intelligently("text", &sample_item("https://x.test/a"))
        .await;

    // Backup never cleared its threshold, so its result arrives as a
    // lower-confidence fallback rather than nothing at all.
    assert_eq!(outcome.strategy, Some("backup"));
    assert!(outcome.fallback_used);
    assert_eq!(outcome.cases.len(), 1);
    assert_eq!(outcome.errors, vec![("slow", "timed out".to_string())]);
    let timed_out = outcome
        .alternatives
        .iter()
        .find(|a| a.strategy == "slow")
        .unwrap();
    assert_eq!(timed_out.outcome, AttemptOutcome::Timeout);
}

#[tokio::test]
async fn timeout_then_acceptance_is_not_a_fallback() {
    let chain = chain_of(vec![FakeStrategy::hanging("slow"), figurine_candidate()]);
    let outcome = chain
        .extract_intelligently("text", &sample_item("https://x.test/a"))
        .await;

    assert_eq!(outcome.strategy, Some("fast"));
    assert_eq!(outcome.state, ChainState::Accepted);
    assert!(!outcome.fallback_used);
    assert_eq!(outcome.errors.len(), 1);
}

#[tokio::test]
async fn exhausted_chain_yields_empty_outcome() {
    let chain = chain_of(vec![
        FakeStrategy::failing("a", "boom"),
        FakeStrategy::failing("b", "bust"),
    ]);
    let outcome = chain
        .extract_intelligently("text", &sample_item("https://x.test/a"))
        .await;

    assert!(outcome.cases.is_empty());
    assert_eq!(outcome.strategy, None);
    assert_eq!(outcome.state, ChainState::Exhausted);
    assert_eq!(outcome.confidence, 0.0);
    assert_eq!(outcome.errors.len(), 2);
    assert_eq!(outcome.alternatives.len(), 2);
}

#[tokio::test]
async fn best_completed_attempt_wins_on_fallback() {
    let chain = chain_of(vec![
        FakeStrategy::producing(
            "low",
            0.95,
            0.4,
            vec![candidate("Low", "Create a sketch of the scene please")],
        ),
        FakeStrategy::producing(
            "high",
            0.95,
            0.6,
            vec![candidate("High", "Create a 3D figurine of the uploaded photo")],
        ),
    ]);
    let outcome = chain
        .extract_intelligently("text", &sample_item("https://x.test/a"))
        .await;

    assert_eq!(outcome.strategy, Some("high"));
    assert!(outcome.fallback_used);
    assert!((outcome.confidence - 0.6).abs() < f32::EPSILON);
    assert_eq!(outcome.cases[0].title, "High");
    // The losing attempt is retained for diagnostics.
    assert!(outcome.alternatives.iter().any(|a| a.strategy == "low"));
}

#[tokio::test]
async fn accepted_attempt_duration_is_recorded() {
    let chain = chain_of(vec![
        figurine_candidate().with_delay(Duration::from_millis(120))
    ]);
    let outcome = chain
        .extract_intelligently("text", &sample_item("https://x.test/a"))
        .await;
    assert_eq!(outcome.state, ChainState::Accepted);

    let mut stats = RunStats::default();
    stats.record_outcome(&outcome);
    let fast = stats.by_strategy["fast"];
    assert_eq!(fast.successes, 1);
    assert!(fast.total_ms >= 100, "total_ms = {}", fast.total_ms);
}

#[test]
fn validated_strategy_registers_only_with_an_oracle() {
    assert_eq!(StrategyChain::standard(None).len(), 2);
    let chain = StrategyChain::standard(Some(Arc::new(MockValidator::new())));
    assert_eq!(chain.len(), 3);
}

#[tokio::test]
async fn fenced_figurine_prompt_becomes_figurine_record() {
    let chain = StrategyChain::standard(None);
    let item = sample_item("https://x.test/thread");
    let outcome = chain
        .extract_intelligently(
            "Prompt: ```\nCreate a 3D figurine of the uploaded photo\n```",
            &item,
        )
        .await;

    assert_eq!(outcome.cases.len(), 1);
    let record = &outcome.cases[0];
    assert_eq!(record.prompts, vec!["Create a 3D figurine of the uploaded photo"]);
    assert_eq!(record.category, CaseCategory::Figurine);
    assert_eq!(record.source_url, "https://x.test/thread");
    assert!(record.confidence > 0.0);
}

#[tokio::test]
async fn batch_outcomes_come_back_in_input_order() {
    let chain = StrategyChain::standard(None);
    let items = vec![
        sample_item("https://x.test/1"),
        sample_item("https://x.test/2"),
        sample_item("https://x.test/3"),
    ];
    let outcomes = chain.extract_batch(&items, 2, Duration::ZERO).await;
    assert_eq!(outcomes.len(), 3);
}
