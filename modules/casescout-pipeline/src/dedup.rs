//! Layered deduplication for accepted records.
//!
//! Layer 1: exact match on the normalized leading prompt — first wins.
//! Layer 2: truncation match (prefix relation with a length gap) — the
//!          longer prompt wins, replacing the shorter in place.
//! Layer 3: semantic match via the optional oracle — applied only after
//!          the free layers pass, skipped when the oracle is absent.
//!
//! Plus a record-level composite key for cross-batch case dedup.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use casescout_common::CaseRecord;
use casescout_extract::{clean_title, is_truncated_pair, normalize_prompt};

use crate::traits::SemanticValidator;

#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    /// Minimum normalized-length gap for a truncation verdict.
    pub truncation_gap: usize,
    /// Oracle similarity above which a record is a semantic duplicate.
    pub similarity_threshold: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            truncation_gap: 10,
            similarity_threshold: 0.8,
        }
    }
}

pub struct DedupEngine {
    config: DedupConfig,
    validator: Option<Arc<dyn SemanticValidator>>,
}

impl DedupEngine {
    pub fn new(config: DedupConfig, validator: Option<Arc<dyn SemanticValidator>>) -> Self {
        Self { config, validator }
    }

    /// Prompt-level dedup. Order-preserving and single-pass: a later
    /// duplicate never displaces an earlier record, except the explicit
    /// truncation upgrade which replaces in place (slot kept).
    /// Returns the survivors and the duplicate count.
    pub async fn dedupe(&self, records: Vec<CaseRecord>) -> (Vec<CaseRecord>, u32) {
        let mut accepted: Vec<CaseRecord> = Vec::new();
        let mut duplicates = 0u32;

        'records: for record in records {
            let lead = normalize_prompt(record.lead_prompt());

            for existing in accepted.iter_mut() {
                let existing_lead = normalize_prompt(existing.lead_prompt());
                if existing_lead == lead {
                    duplicates += 1;
                    continue 'records;
                }
                if is_truncated_pair(
                    record.lead_prompt(),
                    existing.lead_prompt(),
                    self.config.truncation_gap,
                ) {
                    if lead.chars().count() > existing_lead.chars().count() {
                        info!(title = %record.title, "truncation dedup: longer prompt replaces shorter");
                        *existing = record;
                    }
                    duplicates += 1;
                    continue 'records;
                }
            }

            if self.is_semantic_duplicate(&record, &accepted).await {
                duplicates += 1;
                continue 'records;
            }

            accepted.push(record);
        }

        (accepted, duplicates)
    }

    /// Oracle-backed similarity check against already-accepted leading
    /// prompts. Absent or erroring oracle means "not a duplicate".
    async fn is_semantic_duplicate(&self, record: &CaseRecord, accepted: &[CaseRecord]) -> bool {
        let Some(validator) = &self.validator else {
            return false;
        };
        for existing in accepted {
            match validator
                .similarity(record.lead_prompt(), existing.lead_prompt())
                .await
            {
                Ok(similarity) if similarity > self.config.similarity_threshold => {
                    info!(
                        title = %record.title,
                        similarity,
                        "semantic dedup: near-duplicate discarded"
                    );
                    return true;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "similarity check failed, keeping record");
                    return false;
                }
            }
        }
        false
    }
}

/// Composite identity of a case across batches and runs: cleaned title,
/// normalized source path, and the first 60 chars of the normalized
/// leading prompt.
pub fn record_key(record: &CaseRecord) -> String {
    let title = clean_title(&record.title).to_lowercase();
    let path = normalize_source_path(&record.source_url);
    let prompt: String = normalize_prompt(record.lead_prompt())
        .chars()
        .take(60)
        .collect();
    format!("{title}|{path}|{prompt}")
}

fn normalize_source_path(url: &str) -> String {
    url.trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_lowercase()
}

/// Record-level dedup by composite key, first occurrence wins.
pub fn dedupe_by_key(records: Vec<CaseRecord>) -> Vec<CaseRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record_key(record)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, MockValidator};

    fn engine(validator: Option<Arc<dyn SemanticValidator>>) -> DedupEngine {
        DedupEngine::new(DedupConfig::default(), validator)
    }

    #[tokio::test]
    async fn exact_duplicates_keep_first() {
        let a = record("A", "Create a 3D figurine of the uploaded photo", "https://x.test/1");
        let b = record("B", "create a 3d   figurine of the uploaded photo", "https://x.test/2");
        let (kept, duplicates) = engine(None).dedupe(vec![a, b]).await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "A");
        assert_eq!(duplicates, 1);
    }

    #[tokio::test]
    async fn truncation_upgrade_replaces_in_place() {
        let short = record("short", "Create a 3D figuri", "https://x.test/1");
        let other = record("other", "Turn the photo into a sticker sheet please", "https://x.test/2");
        let long = record(
            "long",
            "Create a 3D figurine of the uploaded photo",
            "https://x.test/3",
        );
        let (kept, duplicates) = engine(None).dedupe(vec![short, other, long]).await;
        assert_eq!(duplicates, 1);
        assert_eq!(kept.len(), 2);
        // Slot order preserved: the longer prompt sits where the shorter was.
        assert_eq!(kept[0].title, "long");
        assert_eq!(kept[1].title, "other");
    }

    #[tokio::test]
    async fn longer_first_then_truncated_is_dropped() {
        let long = record(
            "long",
            "Create a 3D figurine of the uploaded photo",
            "https://x.test/1",
        );
        let short = record("short", "Create a 3D figuri", "https://x.test/2");
        let (kept, duplicates) = engine(None).dedupe(vec![long, short]).await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "long");
        assert_eq!(duplicates, 1);
    }

    #[tokio::test]
    async fn semantic_layer_discards_near_duplicates() {
        let a = record("A", "Create a 3D figurine of the uploaded photo", "https://x.test/1");
        let b = record("B", "Make a tiny collectible statue from my picture", "https://x.test/2");
        let validator = MockValidator::new().on_similarity(
            "Make a tiny collectible statue from my picture",
            "Create a 3D figurine of the uploaded photo",
            0.92,
        );
        let (kept, duplicates) = engine(Some(Arc::new(validator))).dedupe(vec![a, b]).await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "A");
        assert_eq!(duplicates, 1);
    }

    #[tokio::test]
    async fn erroring_oracle_degrades_to_keeping_records() {
        let a = record("A", "Create a 3D figurine of the uploaded photo", "https://x.test/1");
        let b = record("B", "Make a tiny collectible statue from my picture", "https://x.test/2");
        let (kept, duplicates) = engine(Some(Arc::new(MockValidator::failing())))
            .dedupe(vec![a, b])
            .await;
        assert_eq!(kept.len(), 2);
        assert_eq!(duplicates, 0);
    }

    #[tokio::test]
    async fn dedup_soundness_no_pair_survives() {
        let records = vec![
            record("A", "Create a 3D figurine of the uploaded photo", "https://x.test/1"),
            record("B", "Create a 3D figurine of the uploaded", "https://x.test/2"),
            record("C", "Create a 3D figurine of the uploaded photo", "https://x.test/3"),
            record("D", "Turn the photo into a sticker sheet please", "https://x.test/4"),
        ];
        let (kept, _) = engine(None).dedupe(records).await;
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                let a = kept[i].lead_prompt();
                let b = kept[j].lead_prompt();
                assert_ne!(normalize_prompt(a), normalize_prompt(b));
                assert!(!is_truncated_pair(a, b, 10));
            }
        }
    }

    #[test]
    fn record_key_ignores_scheme_and_suffix_markers() {
        let a = record(
            "Case 1: Outfit swap (2)",
            "Replace the outfit with a tailored navy suit",
            "https://github.com/a/b/",
        );
        let b = record(
            "Case 1: Outfit swap (Duplicate)",
            "Replace the outfit with a tailored navy suit",
            "http://github.com/a/b",
        );
        assert_eq!(record_key(&a), record_key(&b));
    }

    #[test]
    fn key_dedup_keeps_first_occurrence() {
        let a = record("T", "Create a 3D figurine of the uploaded photo", "https://x.test/1");
        let mut b = a.clone();
        b.title = "T".to_string();
        let kept = dedupe_by_key(vec![a, b]);
        assert_eq!(kept.len(), 1);
    }
}
