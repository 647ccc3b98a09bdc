use std::collections::BTreeMap;

use crate::chain::{AttemptOutcome, ExtractionAttempt, ExtractionOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct StrategyStats {
    pub successes: u32,
    pub failures: u32,
    pub timeouts: u32,
    pub total_ms: u64,
}

/// Stats from one pipeline run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub sources_processed: u32,
    pub sources_skipped: u32,
    pub sources_failed: u32,
    pub cases_extracted: u32,
    pub cases_deduplicated: u32,
    pub cases_stored: u32,
    pub fallback_used: u32,
    pub by_strategy: BTreeMap<&'static str, StrategyStats>,
}

impl RunStats {
    pub fn record_attempt(&mut self, attempt: &ExtractionAttempt) {
        let entry = self.by_strategy.entry(attempt.strategy).or_default();
        entry.total_ms += attempt.duration_ms;
        match attempt.outcome {
            AttemptOutcome::Success => entry.successes += 1,
            AttemptOutcome::Failure => entry.failures += 1,
            AttemptOutcome::Timeout => entry.timeouts += 1,
        }
    }

    /// Fold one source's outcome in: attempt counters, fallback counter,
    /// and whether the source produced anything at all. Selected and
    /// unselected attempts go through the same per-strategy accounting.
    pub fn record_outcome(&mut self, outcome: &ExtractionOutcome) {
        self.sources_processed += 1;
        for attempt in &outcome.alternatives {
            self.record_attempt(attempt);
        }
        if let Some(attempt) = &outcome.selected {
            self.record_attempt(attempt);
        }
        if outcome.fallback_used {
            self.fallback_used += 1;
        }
        if outcome.cases.is_empty() && !outcome.errors.is_empty() {
            self.sources_failed += 1;
        }
        self.cases_extracted += outcome.cases.len() as u32;
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Case Scout Run Complete ===")?;
        writeln!(f, "Sources processed: {}", self.sources_processed)?;
        writeln!(f, "Sources skipped:   {}", self.sources_skipped)?;
        writeln!(f, "Sources failed:    {}", self.sources_failed)?;
        writeln!(f, "Cases extracted:   {}", self.cases_extracted)?;
        writeln!(f, "Cases deduped:     {}", self.cases_deduplicated)?;
        writeln!(f, "Cases stored:      {}", self.cases_stored)?;
        writeln!(f, "Fallbacks used:    {}", self.fallback_used)?;
        if !self.by_strategy.is_empty() {
            writeln!(f, "\nBy strategy:")?;
            for (name, stats) in &self.by_strategy {
                writeln!(
                    f,
                    "  {name:<12} ok {} / fail {} / timeout {} ({} ms)",
                    stats.successes, stats.failures, stats.timeouts, stats.total_ms
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainState;
    use crate::testing::record;
    use chrono::Utc;

    fn attempt(strategy: &'static str, outcome: AttemptOutcome, ms: u64) -> ExtractionAttempt {
        ExtractionAttempt {
            strategy,
            started_at: Utc::now(),
            duration_ms: ms,
            outcome,
            cases: Vec::new(),
            case_scores: Vec::new(),
            confidence: 0.0,
        }
    }

    #[test]
    fn attempts_accumulate_per_strategy() {
        let mut stats = RunStats::default();
        stats.record_attempt(&attempt("structured", AttemptOutcome::Timeout, 5000));
        stats.record_attempt(&attempt("generic", AttemptOutcome::Success, 12));
        stats.record_attempt(&attempt("generic", AttemptOutcome::Failure, 7));

        let generic = stats.by_strategy["generic"];
        assert_eq!(generic.successes, 1);
        assert_eq!(generic.failures, 1);
        assert_eq!(generic.total_ms, 19);
        assert_eq!(stats.by_strategy["structured"].timeouts, 1);
    }

    #[test]
    fn selected_attempt_timing_reaches_strategy_table() {
        let mut stats = RunStats::default();
        let outcome = ExtractionOutcome {
            cases: vec![record(
                "A",
                "Create a 3D figurine of the uploaded photo",
                "https://x.test/1",
            )],
            strategy: Some("structured"),
            confidence: 0.9,
            fallback_used: false,
            state: ChainState::Accepted,
            selected: Some(attempt("structured", AttemptOutcome::Success, 120)),
            alternatives: vec![attempt("generic", AttemptOutcome::Timeout, 50)],
            errors: Vec::new(),
        };
        stats.record_outcome(&outcome);

        let structured = stats.by_strategy["structured"];
        assert_eq!(structured.successes, 1);
        assert_eq!(structured.total_ms, 120);
        assert_eq!(stats.by_strategy["generic"].timeouts, 1);
        assert_eq!(stats.cases_extracted, 1);
    }

    #[test]
    fn display_renders_strategy_table() {
        let mut stats = RunStats::default();
        stats.record_attempt(&attempt("structured", AttemptOutcome::Success, 3));
        let rendered = stats.to_string();
        assert!(rendered.contains("By strategy:"));
        assert!(rendered.contains("structured"));
    }
}
