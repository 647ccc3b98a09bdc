//! The persisted case-set document, with merge semantics across runs and
//! batch reclassification of uncategorized records.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use casescout_common::{CaseCategory, CaseRecord, CaseScoutError};
use casescout_extract::categorize;

use crate::cache::write_atomic;
use crate::dedup::record_key;

pub const CASE_SET_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSet {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub total: u32,
    pub categories: Vec<String>,
    pub cases: Vec<CaseRecord>,
}

impl CaseSet {
    pub fn from_records(cases: Vec<CaseRecord>) -> Self {
        let categories = distinct_categories(&cases);
        Self {
            version: CASE_SET_VERSION,
            generated_at: Utc::now(),
            total: cases.len() as u32,
            categories,
            cases,
        }
    }

    /// Merge new records into an existing set by composite record key.
    /// Existing entries are kept as-is; only unseen keys are appended, so
    /// repeated runs over unchanged input leave the set stable.
    pub fn merge(existing: Option<CaseSet>, new_records: Vec<CaseRecord>) -> CaseSet {
        let mut cases = existing.map(|set| set.cases).unwrap_or_default();
        let mut seen: std::collections::HashSet<String> =
            cases.iter().map(record_key).collect();
        let mut appended = 0usize;
        for record in new_records {
            if seen.insert(record_key(&record)) {
                cases.push(record);
                appended += 1;
            }
        }
        if appended > 0 {
            info!(appended, total = cases.len(), "case set merged");
        }
        CaseSet::from_records(cases)
    }

    /// Deterministic output order regardless of batch completion order.
    pub fn sort_records(&mut self) {
        self.cases
            .sort_by(|a, b| (&a.title, &a.source_url).cmp(&(&b.title, &b.source_url)));
    }

    /// Re-run the categorizer over `Other`-labelled records. Idempotent;
    /// returns how many records changed category.
    pub fn reclassify_other(&mut self) -> usize {
        let mut changed = 0;
        for case in &mut self.cases {
            if case.category != CaseCategory::Other {
                continue;
            }
            let category = categorize(&case.title, &case.effects.join(" "), &case.prompts);
            if category != CaseCategory::Other {
                case.category = category;
                changed += 1;
            }
        }
        if changed > 0 {
            self.categories = distinct_categories(&self.cases);
            info!(changed, "reclassified uncategorized cases");
        }
        changed
    }

    pub fn load(path: &Path) -> Result<Option<CaseSet>, CaseScoutError> {
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CaseScoutError::Output(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CaseScoutError::Output(e.to_string())),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CaseScoutError> {
        write_atomic(path, self)
    }
}

fn distinct_categories(cases: &[CaseRecord]) -> Vec<String> {
    let mut categories: Vec<String> = cases
        .iter()
        .map(|c| c.category.to_string())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    categories.sort();
    categories
}
