use regex::Regex;
use std::sync::LazyLock;

static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \u{3000}]+").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Normalize raw source text before any extractor sees it: unify line
/// endings, turn NBSP/tab into plain spaces, collapse space runs, squeeze
/// 3+ blank lines down to one, trim.
pub fn normalize_text(text: &str) -> String {
    let text = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{00A0}', " ")
        .replace('\t', " ");
    let text = SPACE_RUN.replace_all(&text, " ");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

static LEADING_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^```[^\n]*\n").unwrap());
static TRAILING_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n?```\s*$").unwrap());
static EDGE_TICKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^`+|`+$").unwrap());
static WS_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Canonical comparison form of a prompt: fence markers and stray backticks
/// stripped, whitespace collapsed, lowercased. Used for dedup comparisons
/// only, never stored in place of the original text.
pub fn normalize_prompt(text: &str) -> String {
    let s = LEADING_FENCE.replace(text, "");
    let s = TRAILING_FENCE.replace(&s, "");
    let s = EDGE_TICKS.replace_all(&s, "");
    let s = WS_RUN.replace_all(&s, " ");
    s.trim().to_lowercase()
}

/// True when one prompt is a truncated re-extraction of the other: the
/// normalized forms stand in a prefix relation and differ in length by at
/// least `min_gap` chars. The gap requirement keeps near-identical short
/// strings from being flagged.
pub fn is_truncated_pair(a: &str, b: &str, min_gap: usize) -> bool {
    let na = normalize_prompt(a);
    let nb = normalize_prompt(b);
    let la = na.chars().count();
    let lb = nb.chars().count();
    if la.abs_diff(lb) < min_gap {
        return false;
    }
    na.starts_with(&nb) || nb.starts_with(&na)
}

static ENUM_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[①②③④⑤⑥⑦⑧⑨⑩\s]*(?:\d+\u{FE0F}\u{20E3}\s*)*").unwrap());
static LABEL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:例\s*\d+[:：]\s*|case\s*\d+[:：]\s*|案例\s*\d+[:：]\s*)").unwrap());
static DUP_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\((?:duplicate|\d+)\)\s*$").unwrap());
static IMAGE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*image[^a-z]*$").unwrap());
static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*$").unwrap());
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Strip enumeration prefixes, duplicate markers, trailing image fragments,
/// and HTML tags (including unterminated ones) from a section title.
pub fn clean_title(title: &str) -> String {
    let s = ENUM_PREFIX.replace(title, "");
    let s = LABEL_PREFIX.replace(&s, "");
    let s = DUP_SUFFIX.replace(&s, "");
    let s = IMAGE_SUFFIX.replace(&s, "");
    let s = OPEN_TAG.replace(&s, "");
    let s = HTML_TAG.replace_all(&s, "");
    let s = WS_RUN.replace_all(&s, " ");
    s.trim().to_string()
}
