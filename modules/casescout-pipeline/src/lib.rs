//! Adaptive extraction pipeline: strategy chain with per-attempt timeouts
//! and confidence thresholds, layered deduplication, incremental cache,
//! batch runner, and the persisted case-set document.

pub mod cache;
pub mod chain;
pub mod dedup;
pub mod output;
pub mod run;
pub mod stats;
pub mod strategy;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

#[cfg(test)]
mod chain_tests;

pub use cache::{CacheDecision, IncrementalCache, ProcessReason};
pub use chain::{ChainState, ExtractionOutcome, StrategyChain};
pub use dedup::DedupEngine;
pub use output::CaseSet;
pub use run::Pipeline;
pub use stats::RunStats;
pub use strategy::ExtractionStrategy;
pub use traits::SemanticValidator;
