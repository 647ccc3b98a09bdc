//! Ordered pattern rule tables. Priority is encoded in table order, not in
//! control flow; each rule carries a name so it can be unit tested on its
//! own.

use regex::Regex;
use std::sync::LazyLock;

pub struct NamedRule {
    pub name: &'static str,
    pub regex: Regex,
}

fn rule(name: &'static str, pattern: &str) -> NamedRule {
    NamedRule {
        name,
        regex: Regex::new(pattern).unwrap(),
    }
}

/// Prompt rules, highest precision first.
pub static PROMPT_RULES: LazyLock<Vec<NamedRule>> = LazyLock::new(|| {
    vec![
        rule(
            "fenced_after_label",
            r#"(?is)prompt[：:]\s*```[a-z]*\s*([^`]+?)\s*```"#,
        ),
        rule(
            "bold_label",
            r"(?is)\*\*prompt[：:]\*\*\s*(.+?)(?:\*\*|\n\n|$)",
        ),
        rule("label_line", r"(?im)^prompt[：:]\s*(.+)$"),
        rule("labeled_quoted", r#"(?i)prompt[：:]\s*["']([^"']{20,})["']"#),
        rule(
            "example_quoted",
            r#"(?i)example[：:]\s*["']([^"']{30,})["']"#,
        ),
        rule(
            "quoted_instruction",
            r#"(?i)"([^"]{10,}(?:create|make|turn|transform|generate|edit|change|convert)[^"]{10,})""#,
        ),
        rule(
            "action_sentence",
            r"(?i)\b((?:create|craft|transform|turn|make|generate)\b[^.!?\n]{30,200}[.!?])",
        ),
    ]
});

/// Fenced literal blocks, tried by the generic extractor after the labelled
/// rules.
pub static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:yaml|json|text|prompt)?\s*([^`]+?)\s*```").unwrap());

/// Effect rules, scoped by callers to one structural section.
pub static EFFECT_RULES: LazyLock<Vec<NamedRule>> = LazyLock::new(|| {
    vec![
        rule(
            "labeled_effect",
            r"(?im)^(?:effect|result|output|description)[：:]\s*(.+)$",
        ),
        rule(
            "inline_effect",
            r"(?i)\b(?:effect|result)[：:]\s*([^.!?\n]{5,200})",
        ),
        rule("into_phrase", r"(?i)\b(into\s[^.!?\n]{10,60})"),
    ]
});

static MD_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\(([^)\s]+)\)").unwrap());
static HTML_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).unwrap());
static BARE_IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhttps?://[^\s<>"')]+\.(?:jpg|jpeg|png|gif|webp)\b"#).unwrap()
});

/// Raw-content base for relative `images/` paths in the GitHub corpus this
/// pipeline was built against.
pub const GITHUB_RAW_IMAGE_BASE: &str =
    "https://raw.githubusercontent.com/PicoTrex/Awesome-Nano-Banana-images/main/";

/// Rewrite a raw image reference to an absolute URL, or discard it.
/// Relative paths under `images/` resolve against the known raw base; any
/// other relative path is dropped.
pub fn resolve_image_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url.to_string())
    } else if url.starts_with("images/") {
        Some(format!("{GITHUB_RAW_IMAGE_BASE}{url}"))
    } else {
        None
    }
}

/// Apply every prompt rule in order, returning (rule name, capture) pairs.
/// Callers validate and dedup; this function only matches.
pub fn prompt_captures(text: &str) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    for rule in PROMPT_RULES.iter() {
        for caps in rule.regex.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                out.push((rule.name, m.as_str().trim().to_string()));
            }
        }
    }
    out
}

/// Effect descriptions found in `text`, order-preserving, length-bounded.
pub fn extract_effects(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for rule in EFFECT_RULES.iter() {
        for caps in rule.regex.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                let effect = m.as_str().trim().to_string();
                let len = effect.chars().count();
                if len > 5 && len < 200 && !out.contains(&effect) {
                    out.push(effect);
                }
            }
        }
    }
    out
}

/// Absolute image URLs found in `text`, order-preserving, deduplicated.
pub fn extract_images(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |raw: &str| {
        if let Some(url) = resolve_image_url(raw) {
            if !out.contains(&url) {
                out.push(url);
            }
        }
    };
    for caps in MD_IMAGE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            push(m.as_str());
        }
    }
    for caps in HTML_IMAGE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            push(m.as_str());
        }
    }
    for m in BARE_IMAGE_URL.find_iter(text) {
        push(m.as_str());
    }
    out
}
