//! Incremental processing cache: a persisted url → fingerprint map that
//! decides whether a source needs reprocessing, plus run bookkeeping
//! persisted beside it. Single writer; mutated only between batches.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use casescout_common::CaseScoutError;
use casescout_extract::normalize_text;

/// Default entry ceiling before the oldest half is evicted.
pub const DEFAULT_MAX_ENTRIES: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content_hash: String,
    pub case_count: u32,
    pub last_processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_pages: u32,
    pub processed_pages: u32,
    pub skipped_pages: u32,
    /// Extraction calls avoided thanks to unchanged content.
    pub saved_api: u32,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessReason {
    New,
    Changed,
    Unchanged,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheDecision {
    pub process: bool,
    pub reason: ProcessReason,
}

pub struct IncrementalCache {
    path: PathBuf,
    stats_path: PathBuf,
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
    max_entries: usize,
}

impl IncrementalCache {
    /// Load the cache from `path` (stats live in a sibling file derived
    /// from it). A missing cache file is an empty cache; an unparseable
    /// one is surfaced as `CacheCorrupt` and needs an operator reset.
    /// A corrupt stats file only resets bookkeeping.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CaseScoutError> {
        let path = path.into();
        let stats_path = path.with_extension("stats.json");

        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                CaseScoutError::CacheCorrupt(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(CaseScoutError::Cache(e.to_string())),
        };

        let stats = match fs::read_to_string(&stats_path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %stats_path.display(), error = %e, "stats file unreadable, resetting");
                CacheStats::default()
            }),
            Err(_) => CacheStats::default(),
        };

        Ok(Self {
            path,
            stats_path,
            entries,
            stats,
            max_entries: DEFAULT_MAX_ENTRIES,
        })
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// md5 digest of the normalized content, hex-encoded.
    pub fn fingerprint(content: &str) -> String {
        format!("{:x}", md5::compute(normalize_text(content)))
    }

    /// Advisory decision: does this source need the extraction chain?
    /// Never performs extraction itself.
    pub fn should_process(
        &mut self,
        url: &str,
        content: &str,
        observed_case_count: u32,
    ) -> CacheDecision {
        self.stats.total_pages += 1;
        match self.entries.get(url) {
            None => {
                self.stats.processed_pages += 1;
                CacheDecision {
                    process: true,
                    reason: ProcessReason::New,
                }
            }
            Some(entry) => {
                let hash = Self::fingerprint(content);
                if hash != entry.content_hash || observed_case_count != entry.case_count {
                    self.stats.processed_pages += 1;
                    CacheDecision {
                        process: true,
                        reason: ProcessReason::Changed,
                    }
                } else {
                    self.stats.skipped_pages += 1;
                    self.stats.saved_api += 1;
                    CacheDecision {
                        process: false,
                        reason: ProcessReason::Unchanged,
                    }
                }
            }
        }
    }

    /// Record a processing result. Hash and count are set together; a
    /// reader never observes one updated without the other.
    pub fn update(&mut self, url: &str, content: &str, case_count: u32) {
        self.entries.insert(
            url.to_string(),
            CacheEntry {
                content_hash: Self::fingerprint(content),
                case_count,
                last_processed_at: Utc::now(),
            },
        );
        self.evict_if_over_ceiling();
    }

    /// One-pass eviction of the oldest half by last-processed time.
    fn evict_if_over_ceiling(&mut self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        let mut by_age: Vec<(String, DateTime<Utc>)> = self
            .entries
            .iter()
            .map(|(url, entry)| (url.clone(), entry.last_processed_at))
            .collect();
        by_age.sort_by_key(|(_, at)| *at);
        let to_drop = self.entries.len() / 2;
        for (url, _) in by_age.into_iter().take(to_drop) {
            self.entries.remove(&url);
        }
        info!(dropped = to_drop, remaining = self.entries.len(), "cache ceiling eviction");
    }

    /// Drop entries last processed more than `max_age` ago.
    pub fn evict_older_than(&mut self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_processed_at >= cutoff);
        let dropped = before - self.entries.len();
        if dropped > 0 {
            info!(dropped, "cache age eviction");
        }
        dropped
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::default();
    }

    /// Persist cache and stats. Write-temp-then-rename, so a crash
    /// mid-write never corrupts previously saved entries.
    pub fn save(&mut self) -> Result<(), CaseScoutError> {
        self.stats.last_update = Some(Utc::now());
        write_atomic(&self.path, &self.entries)?;
        write_atomic(&self.stats_path, &self.stats)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn entry(&self, url: &str) -> Option<&CacheEntry> {
        self.entries.get(url)
    }
}

pub(crate) fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CaseScoutError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CaseScoutError::Cache(e.to_string()))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CaseScoutError::Cache(e.to_string()))?;
        }
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|e| CaseScoutError::Cache(e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| CaseScoutError::Cache(e.to_string()))?;
    Ok(())
}
