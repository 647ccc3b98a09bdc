use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::text::normalize_text;

/// Extractor output before a record is minted. Prompts are plain strings;
/// the "string or structured block" ambiguity of raw sources is resolved
/// here, at the extractor boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCase {
    pub title: String,
    pub prompts: Vec<String>,
    pub effects: Vec<String>,
    pub images: Vec<String>,
}

impl CandidateCase {
    pub fn lead_prompt(&self) -> &str {
        self.prompts.first().map(String::as_str).unwrap_or("")
    }
}

/// Operative verbs a genuine instruction contains.
pub const ACTION_TERMS: &[&str] = &[
    "create", "make", "turn", "transform", "generate", "edit", "change", "convert", "craft",
];

/// Subjects/targets an instruction operates on.
pub const TARGET_TERMS: &[&str] = &[
    "figurine", "character", "scene", "style", "clothing", "outfit", "person", "image", "photo",
    "picture", "3d", "model", "portrait", "background", "sticker", "painting",
];

const MIN_PROMPT_LEN: usize = 20;
const MAX_PROMPT_LEN: usize = 2000;

// Known false-positive shapes: bare identifiers, function calls, camelCase
// tokens, boilerplate lead-ins, bare URLs.
static BLOCKLIST: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^(?:generatecontent|generatetext|model|function|api|code|example|test|demo|sample)$",
        r"^[a-z_]+\(",
        r"^[A-Z][a-z]+[A-Z]",
        r"(?i)^(?:click|view|more|author|source|tag|category|date|time)\b",
        r"(?i)^(?:https?://|www\.)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TECHNICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:built on|using|technology|api|function|typescript|react|javascript)\b")
        .unwrap()
});
static MODEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:gemini-2|generate-002|imagen|flash|preview)").unwrap());

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

/// Two-sided precision check: a candidate prompt must be of plausible
/// length, not blocklisted, and name both an action and a target.
pub fn is_valid_prompt(prompt: &str) -> bool {
    let cleaned = normalize_text(prompt);
    let len = cleaned.chars().count();
    if !(MIN_PROMPT_LEN..=MAX_PROMPT_LEN).contains(&len) {
        return false;
    }
    if BLOCKLIST.iter().any(|re| re.is_match(&cleaned)) {
        return false;
    }
    let lower = cleaned.to_lowercase();
    if TECHNICAL.is_match(&lower) || MODEL_ID.is_match(&lower) {
        return false;
    }
    contains_any(&lower, ACTION_TERMS) && contains_any(&lower, TARGET_TERMS)
}

/// Base confidence heuristic. Monotone in the number of satisfied checks:
/// a candidate passing more of them never scores lower than one passing
/// fewer.
pub fn candidate_confidence(prompt: &str, effects: &[String], images: &[String]) -> f32 {
    let mut confidence: f32 = 0.3;
    if is_valid_prompt(prompt) {
        confidence += 0.3;
    }
    if !effects.is_empty() {
        confidence += 0.2;
    }
    if !images.is_empty() {
        confidence += 0.2;
    }
    let len = prompt.chars().count();
    if len > 50 {
        confidence += 0.05;
    }
    if len > 100 {
        confidence += 0.05;
    }
    confidence.min(1.0)
}

/// Richer heuristic used when a candidate survived full pattern extraction;
/// starts higher and rewards descriptive length and corroborating evidence.
pub fn refined_confidence(prompt: &str, effects: &[String], images: &[String]) -> f32 {
    let mut confidence: f32 = 0.5;
    let len = prompt.chars().count();
    if len > 50 {
        confidence += 0.2;
    }
    if len > 100 {
        confidence += 0.1;
    }
    if !effects.is_empty() {
        confidence += 0.1;
    }
    if effects.len() > 1 {
        confidence += 0.1;
    }
    if !images.is_empty() {
        confidence += 0.1;
    }
    confidence.min(1.0)
}
