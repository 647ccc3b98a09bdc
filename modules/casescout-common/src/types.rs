use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Category taxonomy ---

/// Closed category taxonomy for usage cases. Ordering of the categorizer's
/// rule table is significant; this enum only names the labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaseCategory {
    Figurine,
    Clothing,
    Scene,
    Style,
    Character,
    Composition,
    Enhancement,
    Design,
    Education,
    Business,
    Technical,
    Artistic,
    #[default]
    Other,
}

impl std::fmt::Display for CaseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseCategory::Figurine => write!(f, "figurine"),
            CaseCategory::Clothing => write!(f, "clothing"),
            CaseCategory::Scene => write!(f, "scene"),
            CaseCategory::Style => write!(f, "style"),
            CaseCategory::Character => write!(f, "character"),
            CaseCategory::Composition => write!(f, "composition"),
            CaseCategory::Enhancement => write!(f, "enhancement"),
            CaseCategory::Design => write!(f, "design"),
            CaseCategory::Education => write!(f, "education"),
            CaseCategory::Business => write!(f, "business"),
            CaseCategory::Technical => write!(f, "technical"),
            CaseCategory::Artistic => write!(f, "artistic"),
            CaseCategory::Other => write!(f, "other"),
        }
    }
}

impl CaseCategory {
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "figurine" => Self::Figurine,
            "clothing" => Self::Clothing,
            "scene" => Self::Scene,
            "style" => Self::Style,
            "character" => Self::Character,
            "composition" => Self::Composition,
            "enhancement" => Self::Enhancement,
            "design" => Self::Design,
            "education" => Self::Education,
            "business" => Self::Business,
            "technical" => Self::Technical,
            "artistic" => Self::Artistic,
            _ => Self::Other,
        }
    }
}

// --- Source origin ---

/// Origin system a source item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Github,
    #[default]
    Web,
    Search,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Github => write!(f, "github"),
            SourceKind::Web => write!(f, "web"),
            SourceKind::Search => write!(f, "search"),
        }
    }
}

impl SourceKind {
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "github" => Self::Github,
            "search" => Self::Search,
            _ => Self::Web,
        }
    }

    /// Infer the origin system from a URL.
    pub fn from_url(url: &str) -> Self {
        if url.contains("github.com") || url.contains("githubusercontent.com") {
            Self::Github
        } else {
            Self::Web
        }
    }
}

// --- Acquisition boundary ---

/// One item handed over by source acquisition (repository search, web search,
/// page fetch). The pipeline only ever reads `description` as raw text; the
/// rest is carried metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    pub title: String,
    pub url: String,
    /// Raw body text: README content, article text, or a search snippet.
    pub description: String,
    /// Acquisition-reported document type, e.g. "readme" or "article".
    pub doc_type: Option<String>,
    pub source: SourceKind,
    pub stars: Option<u32>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SourceItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>, description: impl Into<String>) -> Self {
        let url = url.into();
        let source = SourceKind::from_url(&url);
        Self {
            title: title.into(),
            url,
            description: description.into(),
            doc_type: None,
            source,
            stars: None,
            updated_at: None,
        }
    }

    /// True when the body should be parsed as a repository README.
    pub fn is_readme(&self) -> bool {
        self.doc_type.as_deref() == Some("readme")
            || self.source == SourceKind::Github
            || self.title.contains("README")
    }
}

// --- Case record ---

/// A structured usage case. Immutable after acceptance except for batch
/// category reassignment and validator confidence adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: Uuid,
    pub title: String,
    pub category: CaseCategory,
    /// Extracted instruction strings. Non-empty for an accepted record.
    pub prompts: Vec<String>,
    /// Free-text outcome descriptions. May be empty.
    pub effects: Vec<String>,
    /// Absolute image URLs. May be empty.
    pub images: Vec<String>,
    pub source_url: String,
    pub source: SourceKind,
    pub extracted_at: DateTime<Utc>,
    /// Calibrated belief in [0, 1] that this is a genuine, well-formed case.
    pub confidence: f32,
}

impl CaseRecord {
    /// Leading prompt, the anchor for prompt-level deduplication.
    pub fn lead_prompt(&self) -> &str {
        self.prompts.first().map(String::as_str).unwrap_or("")
    }
}
