//! Format-specific extractors for the section-structured README styles
//! seen in the wild. Detection checks literal markers in a fixed priority
//! order; the matching extractor parses sections and scopes prompts,
//! effects, and images to their own section.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::candidate::CandidateCase;
use crate::patterns::{extract_effects, extract_images};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    /// `### 例 1:` style numbered example headers.
    NumberedExamples,
    /// `Case 1:` labelled case headers.
    LabeledCases,
    /// `1️⃣` digit-emoji section headers.
    EmojiSections,
}

/// Probe for format markers in priority order. More specific markers win;
/// first match dispatches.
pub fn detect_format(text: &str) -> Option<DocFormat> {
    if text.contains("### 例 1:") || text.contains("### 例 2:") {
        Some(DocFormat::NumberedExamples)
    } else if text.contains("Case 1:") || text.contains("Case 2:") {
        Some(DocFormat::LabeledCases)
    } else if text.contains("1️⃣") || text.contains("2️⃣") {
        Some(DocFormat::EmojiSections)
    } else {
        None
    }
}

/// Run the extractor for whichever format the text matches. Unrecognized
/// or malformed input yields an empty list.
pub fn extract_structured(text: &str) -> Vec<CandidateCase> {
    match detect_format(text) {
        Some(DocFormat::NumberedExamples) => extract_numbered_examples(text),
        Some(DocFormat::LabeledCases) => extract_labeled_cases(text),
        Some(DocFormat::EmojiSections) => extract_emoji_sections(text),
        None => Vec::new(),
    }
}

/// Tracks section titles already emitted for one source; repeats get a
/// " (2)", " (3)" suffix instead of being dropped.
struct TitleRegistry {
    seen: HashMap<String, usize>,
}

impl TitleRegistry {
    fn new() -> Self {
        Self { seen: HashMap::new() }
    }

    fn assign(&mut self, title: &str) -> String {
        let count = self.seen.entry(title.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            title.to_string()
        } else {
            format!("{title} ({count})")
        }
    }
}

/// Slice `text` into sections starting at each match of `header`.
fn split_sections<'a>(text: &'a str, header: &Regex) -> Vec<&'a str> {
    let starts: Vec<usize> = header.find_iter(text).map(|m| m.start()).collect();
    let mut sections = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        sections.push(&text[start..end]);
    }
    sections
}

fn prompt_long_enough(block: &str) -> bool {
    block.chars().count() > 20
}

static NUMBERED_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^### 例 \d+:").unwrap());
static NUMBERED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^### (例 \d+:[^\n]*)").unwrap());
static NUMBERED_AUTHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"（by[^）]*）").unwrap());
static ANY_FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\s*([^`]+?)\s*```").unwrap());

fn extract_numbered_examples(text: &str) -> Vec<CandidateCase> {
    let mut cases = Vec::new();
    let mut titles = TitleRegistry::new();
    for section in split_sections(text, &NUMBERED_HEADER) {
        let Some(caps) = NUMBERED_TITLE.captures(section) else {
            continue;
        };
        let raw_title = NUMBERED_AUTHOR.replace_all(&caps[1], "");
        let raw_title = raw_title.trim();
        for block in ANY_FENCED.captures_iter(section) {
            let prompt = block[1].trim().to_string();
            // Input/output transcripts inside fences are not prompts.
            if !prompt_long_enough(&prompt) || prompt.contains("输入:") || prompt.contains("输出:") {
                continue;
            }
            cases.push(CandidateCase {
                title: titles.assign(raw_title),
                prompts: vec![prompt],
                effects: extract_effects(section),
                images: extract_images(section),
            });
        }
    }
    cases
}

static LABELED_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Case \d+:").unwrap());
static LABELED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Case \d+:[^(\n]+)").unwrap());
static YAML_FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```yaml\s*([^`]+?)\s*```").unwrap());

fn extract_labeled_cases(text: &str) -> Vec<CandidateCase> {
    let mut cases = Vec::new();
    let mut titles = TitleRegistry::new();
    for section in split_sections(text, &LABELED_HEADER) {
        let Some(caps) = LABELED_TITLE.captures(section) else {
            continue;
        };
        let raw_title = caps[1].trim().to_string();
        for block in YAML_FENCED.captures_iter(section) {
            let prompt = block[1].trim().to_string();
            if !prompt_long_enough(&prompt) {
                continue;
            }
            cases.push(CandidateCase {
                title: titles.assign(&raw_title),
                prompts: vec![prompt],
                effects: extract_effects(section),
                images: extract_images(section),
            });
        }
    }
    cases
}

static EMOJI_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\u{FE0F}\u{20E3}").unwrap());
static EMOJI_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\u{FE0F}\u{20E3}[^：:\n]+)").unwrap());
static LABELED_PROMPT_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)prompt[：:]\s*```\s*([^`]+?)\s*```").unwrap());

fn extract_emoji_sections(text: &str) -> Vec<CandidateCase> {
    let mut cases = Vec::new();
    let mut titles = TitleRegistry::new();
    for section in split_sections(text, &EMOJI_HEADER) {
        let Some(caps) = EMOJI_TITLE.captures(section) else {
            continue;
        };
        let raw_title = caps[1].trim().to_string();
        for block in LABELED_PROMPT_FENCE.captures_iter(section) {
            let prompt = block[1].trim().to_string();
            if !prompt_long_enough(&prompt) {
                continue;
            }
            cases.push(CandidateCase {
                title: titles.assign(&raw_title),
                prompts: vec![prompt],
                effects: extract_effects(section),
                images: extract_images(section),
            });
        }
    }
    cases
}
